//! Cache-aside orchestration over the credential slot.

// crates.io
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
// self
use crate::{
	_prelude::*,
	config::ManagerConfig,
	credential::{Credential, CredentialRecord},
	issuer::IssuerClient,
	metrics::{self, ManagerMetrics, ManagerMetricsSnapshot},
	store::CredentialStore,
};

/// Coordinates credential lookup, remote issuance, refresh, and persistence.
///
/// Clones share the same store handle and single-flight guard, so concurrent callers observing
/// the same expired credential collapse into one remote call. Expiry is evaluated lazily on each
/// lookup; no background timers exist.
#[derive(Debug)]
pub struct CredentialManager<S> {
	config: Arc<ManagerConfig>,
	issuer: IssuerClient,
	store: Arc<S>,
	single_flight: Arc<Mutex<()>>,
	metrics: Arc<ManagerMetrics>,
}
impl<S> CredentialManager<S>
where
	S: CredentialStore,
{
	/// Build a manager with the default reqwest client.
	pub fn new(config: ManagerConfig, store: S) -> Result<Self> {
		config.validate()?;

		let config = Arc::new(config);
		let issuer = IssuerClient::new(config.clone())?;

		Ok(Self::with_parts(config, issuer, store))
	}

	/// Build a manager using the supplied HTTP client (primarily for tests).
	pub fn with_client(config: ManagerConfig, store: S, client: reqwest::Client) -> Result<Self> {
		config.validate()?;

		let config = Arc::new(config);
		let issuer = IssuerClient::with_client(config.clone(), client);

		Ok(Self::with_parts(config, issuer, store))
	}

	fn with_parts(config: Arc<ManagerConfig>, issuer: IssuerClient, store: S) -> Self {
		Self {
			config,
			issuer,
			store: Arc::new(store),
			single_flight: Arc::new(Mutex::new(())),
			metrics: ManagerMetrics::new(),
		}
	}

	/// Access the injected credential store.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// Access the per-manager metrics accumulator.
	pub fn metrics(&self) -> Arc<ManagerMetrics> {
		self.metrics.clone()
	}

	/// Return a token that was valid at the instant of the validity check.
	///
	/// Expired or absent credentials are replaced through the remote issuer before returning.
	/// Validity is not re-checked after return; callers needing strict freshness at the point of
	/// use must re-validate themselves.
	#[tracing::instrument(skip(self), fields(slot = %self.config.slot_key))]
	pub async fn token(&self) -> Result<String> {
		let (credential, issued) = self.load_or_issue().await?;

		// An initial issuance already accounted for this lookup.
		if issued {
			return Ok(credential.token().to_owned());
		}
		if credential.is_valid(Utc::now(), self.config.ttl) {
			self.observe_hit();

			return Ok(credential.token().to_owned());
		}

		tracing::debug!(issued_at = %credential.issued_at(), "cached credential expired; refreshing");

		let _guard = self.single_flight.lock().await;

		// Another caller may have refreshed while we waited on the guard. Prefer the re-read
		// record either way: after a rotation its refresh token is the one the issuer still
		// honors.
		let current = match self.read_slot().await? {
			Some(record) => {
				let current = Credential::from(record);

				if current.is_valid(Utc::now(), self.config.ttl) {
					self.observe_hit();

					return Ok(current.token().to_owned());
				}

				current
			},
			None => credential,
		};

		self.observe_miss();

		let refreshed = self.refresh_credentials(current.refresh_token()).await?;

		self.save_credentials(&refreshed).await?;

		Ok(refreshed.token().to_owned())
	}

	/// Load the cached credential, issuing a brand-new one when the slot is empty.
	///
	/// No validity check happens here; an expired credential is returned as stored so callers
	/// that want the raw slot value can still reach it. The slot is populated as a side effect
	/// when it was empty.
	pub async fn saved_credentials(&self) -> Result<Credential> {
		let (credential, _) = self.load_or_issue().await?;

		Ok(credential)
	}

	/// Exchange the supplied refresh token for a brand-new credential.
	///
	/// Never persists the result; persistence is the caller's explicit, separate step. On any
	/// failure the slot is left untouched and [`Error::RemoteUnavailable`] propagates, so a
	/// stale-but-cached credential is never erased by a failed refresh.
	#[tracing::instrument(skip_all, fields(slot = %self.config.slot_key))]
	pub async fn refresh_credentials(&self, refresh_token: &str) -> Result<Credential> {
		let started = Instant::now();

		match self.issuer.refresh(refresh_token).await {
			Ok(credential) => {
				self.observe_refresh_success(started.elapsed());

				Ok(credential)
			},
			Err(err) => {
				self.observe_refresh_error();

				Err(err)
			},
		}
	}

	/// Persist the credential to the slot, unconditionally overwriting any previous value.
	pub async fn save_credentials(&self, credential: &Credential) -> Result<()> {
		self.store.write(&self.config.slot_key, CredentialRecord::from(credential)).await
	}

	/// Clear the slot so the next lookup performs a fresh issuance.
	#[tracing::instrument(skip(self), fields(slot = %self.config.slot_key))]
	pub async fn invalidate(&self) -> Result<()> {
		self.store.clear(&self.config.slot_key).await
	}

	/// Capture the current lifecycle state of the cached credential for status reporting.
	pub async fn status(&self) -> Result<CredentialStatus> {
		let now = Utc::now();
		let record = self.read_slot().await?;
		let metrics = self.metrics.snapshot();
		let (state, issued_at, expires_at) = match record {
			None => (CredentialState::Absent, None, None),
			Some(record) => {
				let credential = Credential::from(record);
				let state = if credential.is_valid(now, self.config.ttl) {
					CredentialState::Valid
				} else {
					CredentialState::Expired
				};
				let expires_at = TimeDelta::from_std(self.config.ttl)
					.ok()
					.and_then(|ttl| credential.issued_at().checked_add_signed(ttl));

				(state, Some(credential.issued_at()), expires_at)
			},
		};

		Ok(CredentialStatus {
			slot_key: self.config.slot_key.clone(),
			state,
			issued_at,
			expires_at,
			metrics,
		})
	}

	/// Load the slot, falling back to initial issuance; the flag reports whether this call
	/// issued (and thereby already recorded the lookup).
	#[tracing::instrument(skip(self), fields(slot = %self.config.slot_key))]
	async fn load_or_issue(&self) -> Result<(Credential, bool)> {
		if let Some(record) = self.read_slot().await? {
			return Ok((Credential::from(record), false));
		}

		tracing::debug!("credential slot empty; performing initial issuance");

		let _guard = self.single_flight.lock().await;

		// Another caller may have issued while we waited on the guard.
		if let Some(record) = self.read_slot().await? {
			return Ok((Credential::from(record), false));
		}

		let credential = self.issuer.issue().await?;

		self.save_credentials(&credential).await?;
		self.observe_issue();

		Ok((credential, true))
	}

	async fn read_slot(&self) -> Result<Option<CredentialRecord>> {
		self.store.read(&self.config.slot_key).await
	}

	fn observe_hit(&self) {
		metrics::record_lookup_hit(&self.config.slot_key);

		self.metrics.record_hit();
	}

	fn observe_issue(&self) {
		metrics::record_lookup_issue(&self.config.slot_key);

		self.metrics.record_issue();
	}

	fn observe_miss(&self) {
		metrics::record_lookup_miss(&self.config.slot_key);

		self.metrics.record_miss();
	}

	fn observe_refresh_success(&self, duration: Duration) {
		metrics::record_refresh_success(&self.config.slot_key, duration);

		self.metrics.record_refresh_success(duration);
	}

	fn observe_refresh_error(&self) {
		metrics::record_refresh_error(&self.config.slot_key);

		self.metrics.record_refresh_error();
	}
}
impl<S> Clone for CredentialManager<S> {
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			issuer: self.issuer.clone(),
			store: self.store.clone(),
			single_flight: self.single_flight.clone(),
			metrics: self.metrics.clone(),
		}
	}
}

/// Lifecycle states of the cached credential slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CredentialState {
	/// No credential is stored in the slot.
	Absent,
	/// The stored credential is within its validity window.
	Valid,
	/// The stored credential has outlived the configured TTL.
	Expired,
}

/// Status projection for the credential slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialStatus {
	/// Slot key the manager operates on.
	pub slot_key: String,
	/// Lifecycle state at capture time.
	pub state: CredentialState,
	/// Issuance timestamp of the stored credential, if any.
	pub issued_at: Option<DateTime<Utc>>,
	/// Expiry timestamp of the stored credential, if any.
	pub expires_at: Option<DateTime<Utc>>,
	/// Telemetry counters captured at the same instant.
	pub metrics: ManagerMetricsSnapshot,
}
