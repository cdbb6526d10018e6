//! Latest-release lookup.

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{get_json, http_client};
use crate::config::{Token, UpdaterConfig};
use crate::core::UpdateError;
use crate::git::{RepositoryUrl, display_url};
use crate::update::readiness::ReadinessGate;

/// Releases API root for github.com.
pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// Resolves the latest published release of a repository into its tag.
///
/// Only github.com repositories are supported, unless `api_base_url` points
/// at a compatible API (GitHub Enterprise). The request is
/// `GET {api}/repos/{owner}/{repo}/releases/latest`.
#[derive(Debug, Clone)]
pub struct ReleaseTagBinder {
    client: reqwest::Client,
    repository: String,
    api_base_url: Option<String>,
    token: Option<Token>,
}

impl ReleaseTagBinder {
    /// Binder for the repository named in `config`.
    pub fn from_config(config: &UpdaterConfig) -> Result<Self, UpdateError> {
        Ok(Self {
            client: http_client(config.request_timeout())?,
            repository: config.repository.clone(),
            api_base_url: config.api_base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// URL of the latest-release endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::UnsupportedHost`] for repositories that are not
    /// on github.com when no API root is configured, or that cannot be parsed.
    pub fn latest_release_url(&self) -> Result<String, UpdateError> {
        let unsupported = || UpdateError::UnsupportedHost {
            repository: display_url(&self.repository),
        };
        let repo = RepositoryUrl::parse(&self.repository).map_err(|_| unsupported())?;

        let base = match &self.api_base_url {
            Some(base) => base.trim_end_matches('/'),
            None if repo.is_github() => GITHUB_API_BASE_URL,
            None => return Err(unsupported()),
        };
        Ok(format!("{base}/repos/{}/{}/releases/latest", repo.owner, repo.name))
    }

    /// Tag name of the latest release.
    ///
    /// # Errors
    ///
    /// [`UpdateError::UnsupportedHost`] as for [`Self::latest_release_url`],
    /// otherwise the request taxonomy of [`crate::remote`]. An empty tag is a
    /// [`UpdateError::Parse`].
    pub async fn latest_tag(&self) -> Result<String, UpdateError> {
        let url = self.latest_release_url()?;
        let token = self.token.as_ref().map(Token::expose).filter(|t| !t.is_empty());
        let release: LatestRelease = get_json(&self.client, &url, token, "latest release").await?;

        let tag = release.tag_name.trim();
        if tag.is_empty() {
            return Err(UpdateError::Parse {
                what: "latest release".to_string(),
                reason: "empty `tag_name`".to_string(),
            });
        }
        Ok(tag.to_string())
    }

    /// Close `gate` and resolve the tag on a background task.
    ///
    /// The gate opens with `Resolved(tag)` on success and `Failed(error)`
    /// otherwise. Must be called from within a tokio runtime.
    pub fn spawn(self, gate: ReadinessGate) -> JoinHandle<()> {
        gate.mark_pending();
        debug!("Resolving latest release of {}", display_url(&self.repository));

        tokio::spawn(async move {
            match self.latest_tag().await {
                Ok(tag) => {
                    info!("Tracking latest release {tag}");
                    gate.resolve(tag);
                }
                Err(e) => {
                    warn!("Latest release could not be resolved: {e}");
                    gate.fail(e);
                }
            }
        })
    }
}
