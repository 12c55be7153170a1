//! Credential store adapters.

// std
use std::{collections::HashMap, future::Future};
// crates.io
#[cfg(feature = "redis")] use redis::AsyncCommands;
use tokio::sync::RwLock;
// self
use crate::{_prelude::*, credential::CredentialRecord};

/// Read/write/clear access to a single named credential slot.
///
/// The store is the only state shared between callers; the manager holds no credential copy in
/// process memory. Backend failures surface as [`Error::Store`] so callers can tell them apart
/// from remote-issuer failures.
pub trait CredentialStore: Send + Sync {
	/// Read the record stored under `key`, if any.
	fn read(&self, key: &str) -> impl Future<Output = Result<Option<CredentialRecord>>> + Send;

	/// Write `record` under `key`, unconditionally overwriting any previous value.
	fn write(
		&self,
		key: &str,
		record: CredentialRecord,
	) -> impl Future<Output = Result<()>> + Send;

	/// Remove the record stored under `key`.
	fn clear(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// In-process store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
	slots: RwLock<HashMap<String, CredentialRecord>>,
}
impl MemoryStore {
	/// Create an empty store.
	pub fn new() -> Self {
		Self::default()
	}
}
impl CredentialStore for MemoryStore {
	async fn read(&self, key: &str) -> Result<Option<CredentialRecord>> {
		Ok(self.slots.read().await.get(key).cloned())
	}

	async fn write(&self, key: &str, record: CredentialRecord) -> Result<()> {
		self.slots.write().await.insert(key.to_owned(), record);

		Ok(())
	}

	async fn clear(&self, key: &str) -> Result<()> {
		self.slots.write().await.remove(key);

		Ok(())
	}
}

#[cfg(feature = "redis")]
/// Redis-backed store sharing the credential slot across processes.
#[derive(Clone, Debug)]
pub struct RedisStore {
	client: redis::Client,
	namespace: Arc<str>,
}
#[cfg(feature = "redis")]
impl RedisStore {
	/// Create a store using the default `credential-cache` key namespace.
	pub fn new(client: redis::Client) -> Self {
		Self { client, namespace: Arc::from("credential-cache") }
	}

	/// Adjust the key namespace.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Arc::from(namespace.into());

		self
	}

	fn key(&self, key: &str) -> String {
		format!("{}:{key}", self.namespace)
	}
}
#[cfg(feature = "redis")]
impl CredentialStore for RedisStore {
	async fn read(&self, key: &str) -> Result<Option<CredentialRecord>> {
		let mut conn =
			self.client.get_multiplexed_async_connection().await.map_err(store_error)?;
		let value: Option<String> = conn.get(self.key(key)).await.map_err(store_error)?;

		match value {
			Some(json) => {
				let record = serde_json::from_str(&json)
					.map_err(|_| Error::MalformedCredential { field: "record" })?;

				Ok(Some(record))
			},
			None => Ok(None),
		}
	}

	async fn write(&self, key: &str, record: CredentialRecord) -> Result<()> {
		let payload = serde_json::to_string(&record).map_err(|err| Error::Store(err.to_string()))?;
		let mut conn =
			self.client.get_multiplexed_async_connection().await.map_err(store_error)?;

		conn.set::<_, _, ()>(self.key(key), payload).await.map_err(store_error)
	}

	async fn clear(&self, key: &str) -> Result<()> {
		let mut conn =
			self.client.get_multiplexed_async_connection().await.map_err(store_error)?;

		conn.del::<_, ()>(self.key(key)).await.map_err(store_error)
	}
}

#[cfg(feature = "redis")]
fn store_error(err: redis::RedisError) -> Error {
	Error::Store(err.to_string())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record(token: &str) -> CredentialRecord {
		CredentialRecord {
			token: token.into(),
			refresh_token: format!("{token}-refresh"),
			issued_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn read_returns_none_for_missing_slot() {
		let store = MemoryStore::new();

		assert_eq!(store.read("credentials").await.expect("read"), None);
	}

	#[tokio::test]
	async fn write_then_read_round_trips() {
		let store = MemoryStore::new();
		let record = record("T1");

		store.write("credentials", record.clone()).await.expect("write");

		assert_eq!(store.read("credentials").await.expect("read"), Some(record));
	}

	#[tokio::test]
	async fn second_write_wins() {
		let store = MemoryStore::new();

		store.write("credentials", record("T1")).await.expect("write");
		store.write("credentials", record("T2")).await.expect("write");

		let stored = store.read("credentials").await.expect("read").expect("record");

		assert_eq!(stored.token, "T2");
	}

	#[tokio::test]
	async fn clear_removes_the_slot() {
		let store = MemoryStore::new();

		store.write("credentials", record("T1")).await.expect("write");
		store.clear("credentials").await.expect("clear");

		assert_eq!(store.read("credentials").await.expect("read"), None);
	}
}
