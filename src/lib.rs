//! Async cache-aside credential manager with remote token refresh, single-flight guarding, and
//! pluggable credential stores.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod credential;
pub mod issuer;
pub mod manager;
pub mod metrics;
pub mod store;

mod config;
mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, TimeDelta, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}
#[cfg(test)]
mod _test {
	use tracing_subscriber as _;
	use wiremock as _;
}

pub use crate::{
	config::ManagerConfig,
	credential::{Credential, CredentialRecord},
	error::{Error, Result},
	manager::{CredentialManager, CredentialState, CredentialStatus},
	store::{CredentialStore, MemoryStore},
};
