//! HTTP client for the remote token issuer.

// crates.io
use reqwest::Client;
use serde_json::Value;
use url::Url;
// self
use crate::{_prelude::*, config::ManagerConfig, credential::Credential};

/// Client for the two remote authentication calls: initial issuance and refresh.
///
/// Every transport or protocol failure (connection error, timeout, non-success status, or a body
/// that is not JSON) maps to the single [`Error::RemoteUnavailable`] signal with a stable
/// user-facing message; the underlying cause is logged, never returned to the caller.
#[derive(Clone, Debug)]
pub struct IssuerClient {
	client: Client,
	config: Arc<ManagerConfig>,
}
impl IssuerClient {
	/// Build an issuer client with the default reqwest client.
	pub fn new(config: Arc<ManagerConfig>) -> Result<Self> {
		let client = Client::builder()
			.user_agent(format!("credential-cache/{}", env!("CARGO_PKG_VERSION")))
			.connect_timeout(Duration::from_secs(5))
			.build()?;

		Ok(Self { client, config })
	}

	/// Build an issuer client using the supplied HTTP client (primarily for tests).
	pub fn with_client(config: Arc<ManagerConfig>, client: Client) -> Self {
		Self { client, config }
	}

	/// Obtain a brand-new credential with the configured username and password.
	pub async fn issue(&self) -> Result<Credential> {
		let form = [
			("_username", self.config.username.as_str()),
			("_password", self.config.password.as_str()),
		];
		let body = self.post_form(&self.config.token_url, &form, "issue").await?;

		Credential::from_issuer_body(&body, Utc::now())
	}

	/// Exchange a refresh token for a new credential.
	pub async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
		let form = [("refresh_token", refresh_token)];
		let body = self.post_form(&self.config.refresh_url, &form, "refresh").await?;

		Credential::from_issuer_body(&body, Utc::now())
	}

	async fn post_form(
		&self,
		url: &Url,
		form: &[(&str, &str)],
		operation: &'static str,
	) -> Result<Value> {
		let start = Instant::now();
		let response = self
			.client
			.post(url.clone())
			.timeout(self.config.request_timeout)
			.form(form)
			.send()
			.await
			.map_err(|err| remote_unavailable(operation, url, &err))?;
		let status = response.status();

		if !status.is_success() {
			let body = response.text().await.ok();

			tracing::error!(
				operation,
				%url,
				%status,
				body = ?body,
				"issuer returned a non-success status"
			);

			return Err(Error::RemoteUnavailable);
		}

		let bytes =
			response.bytes().await.map_err(|err| remote_unavailable(operation, url, &err))?;
		let body: Value = serde_json::from_slice(&bytes).map_err(|err| {
			tracing::error!(operation, %url, error = %err, "issuer response body is not valid JSON");

			Error::RemoteUnavailable
		})?;

		tracing::debug!(operation, %status, elapsed = ?start.elapsed(), "issuer call complete");

		Ok(body)
	}
}

fn remote_unavailable(operation: &'static str, url: &Url, err: &reqwest::Error) -> Error {
	tracing::error!(operation, %url, error = %err, "failed to reach the token issuer");

	Error::RemoteUnavailable
}
