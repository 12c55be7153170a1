//! Credential value object and its serialized slot form.

// crates.io
use serde::{Deserialize, Serialize};
use serde_json::Value;
// self
use crate::_prelude::*;

/// One issued authentication grant: bearer token, refresh token, and issuance time.
///
/// A credential is immutable once constructed and always fully populated; refresh produces a
/// brand-new value rather than mutating the old one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
	token: String,
	refresh_token: String,
	issued_at: DateTime<Utc>,
}
impl Credential {
	/// Construct a credential from its three fields.
	pub fn new(
		token: impl Into<String>,
		refresh_token: impl Into<String>,
		issued_at: DateTime<Utc>,
	) -> Self {
		Self { token: token.into(), refresh_token: refresh_token.into(), issued_at }
	}

	/// Bearer token presented to downstream services.
	pub fn token(&self) -> &str {
		&self.token
	}

	/// Refresh token used to obtain a new bearer token without re-submitting credentials.
	pub fn refresh_token(&self) -> &str {
		&self.refresh_token
	}

	/// Timestamp at which this credential was obtained or refreshed.
	pub fn issued_at(&self) -> DateTime<Utc> {
		self.issued_at
	}

	/// Whether the credential is still within its validity window at `now`.
	///
	/// Pure projection of `issued_at` and the supplied clock. The boundary is exclusive: a
	/// credential aged exactly `ttl` is already expired.
	pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
		let Ok(ttl) = TimeDelta::from_std(ttl) else {
			return false;
		};

		now.signed_duration_since(self.issued_at) < ttl
	}

	/// Build a credential from a loosely-typed issuer response body.
	///
	/// Extra fields (role or user metadata) are ignored; missing required fields surface as
	/// [`Error::MalformedCredential`].
	pub(crate) fn from_issuer_body(body: &Value, issued_at: DateTime<Utc>) -> Result<Self> {
		Ok(Self {
			token: required_field(body, "token")?,
			refresh_token: required_field(body, "refresh_token")?,
			issued_at,
		})
	}
}
impl From<CredentialRecord> for Credential {
	fn from(record: CredentialRecord) -> Self {
		Self {
			token: record.token,
			refresh_token: record.refresh_token,
			issued_at: record.issued_at,
		}
	}
}
impl From<&Credential> for CredentialRecord {
	fn from(credential: &Credential) -> Self {
		Self {
			token: credential.token.clone(),
			refresh_token: credential.refresh_token.clone(),
			issued_at: credential.issued_at,
		}
	}
}

/// Serialized form of a credential as held in the store slot.
///
/// Round-trips losslessly through [`serde_json`]; the timestamp keeps its exact instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
	/// Bearer token string.
	pub token: String,
	/// Refresh token string.
	pub refresh_token: String,
	/// Issuance timestamp.
	pub issued_at: DateTime<Utc>,
}

fn required_field(body: &Value, field: &'static str) -> Result<String> {
	body.get(field)
		.and_then(Value::as_str)
		.map(str::to_owned)
		.ok_or(Error::MalformedCredential { field })
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	const TTL: Duration = Duration::from_secs(3_600);

	fn sample(issued_at: DateTime<Utc>) -> Credential {
		Credential::new("token", "refresh", issued_at)
	}

	#[test]
	fn validity_boundary_is_exclusive_at_ttl() {
		let issued_at = Utc::now();
		let credential = sample(issued_at);
		let just_inside = issued_at + TimeDelta::seconds(3_599);
		let at_ttl = issued_at + TimeDelta::seconds(3_600);

		assert!(credential.is_valid(just_inside, TTL));
		assert!(!credential.is_valid(at_ttl, TTL));
	}

	#[test]
	fn credential_issued_in_the_future_counts_as_valid() {
		let issued_at = Utc::now();
		let credential = sample(issued_at);

		assert!(credential.is_valid(issued_at - TimeDelta::seconds(5), TTL));
	}

	#[test]
	fn record_round_trips_through_json() {
		let record = CredentialRecord {
			token: "T1".into(),
			refresh_token: "R1".into(),
			issued_at: Utc::now(),
		};
		let json = serde_json::to_string(&record).expect("serialize");
		let restored: CredentialRecord = serde_json::from_str(&json).expect("deserialize");

		assert_eq!(record, restored);
	}

	#[test]
	fn issuer_body_ignores_extra_fields() {
		let body = json!({
			"token": "T1",
			"refresh_token": "R1",
			"data": { "roles": ["ROLE_API"], "user": { "id": 9 } }
		});
		let issued_at = Utc::now();
		let credential = Credential::from_issuer_body(&body, issued_at).expect("credential");

		assert_eq!(credential.token(), "T1");
		assert_eq!(credential.refresh_token(), "R1");
		assert_eq!(credential.issued_at(), issued_at);
	}

	#[test]
	fn issuer_body_missing_field_is_malformed() {
		let body = json!({ "token": "T1" });
		let err = Credential::from_issuer_body(&body, Utc::now()).unwrap_err();

		assert!(matches!(err, Error::MalformedCredential { field: "refresh_token" }));
	}
}
