//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the credential cache crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[error(
		"The authentication service cannot be reached right now. Try again in a moment or contact support."
	)]
	RemoteUnavailable,
	#[error("Credential data is malformed: missing or invalid '{field}'.")]
	MalformedCredential { field: &'static str },
	#[error("Credential store error: {0}")]
	Store(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
