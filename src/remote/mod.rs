//! HTTP lookups against the repository host.
//!
//! Two read-only requests are made, neither of which clones anything:
//! - [`manifest::RemoteVersionResolver`] fetches the manifest of a reference
//!   from the host's raw-content endpoint and extracts its `version`
//! - [`release::ReleaseTagBinder`] asks the releases API for the latest
//!   release and publishes its tag through the readiness gate
//!
//! Both share the client setup and the status classification in this module:
//! a 404 is [`UpdateError::NotFoundOrPrivate`] (private repositories answer
//! 404 to unauthenticated requests), any other failure status or transport
//! error is [`UpdateError::Request`], and an unusable body is
//! [`UpdateError::Parse`].

pub mod manifest;
pub mod release;

pub use manifest::{RemoteVersionResolver, read_local_version};
pub use release::ReleaseTagBinder;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::core::UpdateError;
use crate::git::display_url;

/// User agent sent with every request; the GitHub API rejects requests without one.
pub const USER_AGENT: &str = concat!("git-autoupdate/", env!("CARGO_PKG_VERSION"));

/// Builds the shared HTTP client.
///
/// # Errors
///
/// Returns [`UpdateError::Config`] if the TLS backend cannot be initialized.
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client, UpdateError> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| UpdateError::config(format!("Failed to build HTTP client: {e}")))
}

/// GETs `url` and deserializes the JSON body.
///
/// `token` is sent as `Authorization: token <token>`. `what` names the
/// document in parse errors.
pub(crate) async fn get_json<T>(
    client: &reqwest::Client,
    url: &str,
    token: Option<&str>,
    what: &str,
) -> Result<T, UpdateError>
where
    T: DeserializeOwned,
{
    let shown = display_url(url);
    debug!("GET {shown}");

    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
    }

    let response = request.send().await.map_err(|e| UpdateError::Request {
        url: shown.clone(),
        reason: e.without_url().to_string(),
    })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(UpdateError::NotFoundOrPrivate {
            url: shown,
        });
    }
    if !status.is_success() {
        return Err(UpdateError::Request {
            url: shown,
            reason: format!("unexpected status {status}"),
        });
    }

    let body = response.text().await.map_err(|e| UpdateError::Request {
        url: shown.clone(),
        reason: format!("failed to read body: {}", e.without_url()),
    })?;

    serde_json::from_str(&body).map_err(|e| UpdateError::Parse {
        what: what.to_string(),
        reason: e.to_string(),
    })
}
