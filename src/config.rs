//! Manager configuration and validation.

// crates.io
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::_prelude::*;

/// Default validity window applied to issued credentials.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
/// Default timeout bounding each remote call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default store slot key.
pub const DEFAULT_SLOT_KEY: &str = "credentials";

/// Configuration consumed by a [`CredentialManager`](crate::CredentialManager).
///
/// Endpoint URLs, the static issuance credentials, and the TTL are all supplied here at
/// construction time; the manager never reads configuration sources itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagerConfig {
	/// URL of the initial token issuance endpoint.
	pub token_url: Url,
	/// URL of the token refresh endpoint.
	pub refresh_url: Url,
	/// Static username submitted on initial issuance.
	pub username: String,
	/// Static password submitted on initial issuance.
	pub password: String,
	/// Validity window for issued credentials.
	#[serde(default = "default_ttl")]
	pub ttl: Duration,
	/// Timeout bounding each remote call; a timed-out call surfaces as remote unavailability.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: Duration,
	/// Store slot key under which the credential is persisted.
	#[serde(default = "default_slot_key")]
	pub slot_key: String,
	/// Whether HTTPS is required for the issuer endpoints.
	#[serde(default = "default_true")]
	pub require_https: bool,
}
impl ManagerConfig {
	/// Construct a configuration with default cache settings.
	pub fn new(
		token_url: impl AsRef<str>,
		refresh_url: impl AsRef<str>,
		username: impl Into<String>,
		password: impl Into<String>,
	) -> Result<Self> {
		let token_url = Url::parse(token_url.as_ref())?;
		let refresh_url = Url::parse(refresh_url.as_ref())?;

		Ok(Self {
			token_url,
			refresh_url,
			username: username.into(),
			password: password.into(),
			ttl: DEFAULT_TTL,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			slot_key: DEFAULT_SLOT_KEY.into(),
			require_https: true,
		})
	}

	/// Set HTTPS requirement to the desired value.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Override the credential validity window.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Override the per-request timeout.
	pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
		self.request_timeout = request_timeout;

		self
	}

	/// Override the store slot key.
	pub fn with_slot_key(mut self, slot_key: impl Into<String>) -> Self {
		self.slot_key = slot_key.into();

		self
	}

	/// Validate the configuration against the documented constraints.
	pub fn validate(&self) -> Result<()> {
		if self.username.is_empty() {
			return Err(Error::Validation {
				field: "username",
				reason: "Must not be empty.".into(),
			});
		}
		if self.slot_key.is_empty() {
			return Err(Error::Validation {
				field: "slot_key",
				reason: "Must not be empty.".into(),
			});
		}
		if self.ttl < Duration::from_secs(1) {
			return Err(Error::Validation {
				field: "ttl",
				reason: "Must be at least 1 second.".into(),
			});
		}
		if self.request_timeout < Duration::from_millis(100) {
			return Err(Error::Validation {
				field: "request_timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}

		validate_endpoint(&self.token_url, "token_url", self.require_https)?;
		validate_endpoint(&self.refresh_url, "refresh_url", self.require_https)?;

		Ok(())
	}
}

fn validate_endpoint(url: &Url, field: &'static str, require_https: bool) -> Result<()> {
	if url.host_str().is_none() {
		return Err(Error::Validation { field, reason: "Must include a host component.".into() });
	}
	if require_https && url.scheme() != "https" {
		return Err(Error::Validation {
			field,
			reason: "HTTPS is required for issuer endpoints.".into(),
		});
	}

	Ok(())
}

fn default_ttl() -> Duration {
	DEFAULT_TTL
}

fn default_request_timeout() -> Duration {
	DEFAULT_REQUEST_TIMEOUT
}

fn default_slot_key() -> String {
	DEFAULT_SLOT_KEY.into()
}

fn default_true() -> bool {
	true
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn make_config() -> ManagerConfig {
		ManagerConfig::new(
			"https://auth.example.com/token",
			"https://auth.example.com/refresh",
			"studio",
			"secret",
		)
		.expect("config")
	}

	#[test]
	fn defaults_pass_validation() {
		assert!(make_config().validate().is_ok());
	}

	#[test]
	fn rejects_empty_username() {
		let mut config = make_config();

		config.username.clear();

		assert!(matches!(
			config.validate(),
			Err(Error::Validation { field: "username", .. })
		));
	}

	#[test]
	fn rejects_plain_http_when_https_required() {
		let mut config = make_config();

		config.refresh_url = Url::parse("http://auth.example.com/refresh").expect("url");

		assert!(matches!(
			config.validate(),
			Err(Error::Validation { field: "refresh_url", .. })
		));
	}

	#[test]
	fn allows_plain_http_when_disabled() {
		let mut config = make_config().with_require_https(false);

		config.token_url = Url::parse("http://127.0.0.1:9000/token").expect("url");
		config.refresh_url = Url::parse("http://127.0.0.1:9000/refresh").expect("url");

		assert!(config.validate().is_ok());
	}

	#[test]
	fn rejects_sub_second_ttl() {
		let config = make_config().with_ttl(Duration::from_millis(250));

		assert!(matches!(config.validate(), Err(Error::Validation { field: "ttl", .. })));
	}

	#[test]
	fn deserializes_with_defaults() {
		let config: ManagerConfig = serde_json::from_str(
			r#"{
				"token_url": "https://auth.example.com/token",
				"refresh_url": "https://auth.example.com/refresh",
				"username": "studio",
				"password": "secret"
			}"#,
		)
		.expect("config");

		assert_eq!(config.ttl, DEFAULT_TTL);
		assert_eq!(config.slot_key, DEFAULT_SLOT_KEY);
		assert!(config.require_https);
	}
}
