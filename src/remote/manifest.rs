//! Version lookup from local and remote manifests.

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use super::{get_json, http_client};
use crate::config::{Token, UpdaterConfig};
use crate::core::UpdateError;
use crate::git::RepositoryUrl;
use crate::utils::fs::read_json_file;

/// Raw-content root for repositories on github.com.
pub const GITHUB_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Resolves the version declared by a branch or tag without cloning it.
///
/// The manifest is fetched from the host's raw-content endpoint:
/// - github.com: `https://raw.githubusercontent.com/{owner}/{repo}/{ref}/{manifest}`
/// - with `raw_base_url` configured: `{raw_base_url}/{owner}/{repo}/{ref}/{manifest}`
/// - any other host: `{repository}/{ref}/{manifest}`
#[derive(Debug, Clone)]
pub struct RemoteVersionResolver {
    client: reqwest::Client,
    repository: String,
    raw_base_url: Option<String>,
    manifest_file: String,
    token: Option<Token>,
}

impl RemoteVersionResolver {
    /// Resolver for the repository and manifest named in `config`.
    pub fn from_config(config: &UpdaterConfig) -> Result<Self, UpdateError> {
        Ok(Self {
            client: http_client(config.request_timeout())?,
            repository: config.repository.clone(),
            raw_base_url: config.raw_base_url.clone(),
            manifest_file: config.manifest_file.clone(),
            token: config.token.clone(),
        })
    }

    /// URL of the manifest at `reference`.
    #[must_use]
    pub fn manifest_url(&self, reference: &str) -> String {
        let file = self.manifest_file.trim_start_matches('/');
        let parsed = RepositoryUrl::parse(&self.repository).ok();

        match (&self.raw_base_url, parsed) {
            (Some(base), Some(repo)) => format!(
                "{}/{}/{}/{reference}/{file}",
                base.trim_end_matches('/'),
                repo.owner,
                repo.name
            ),
            (None, Some(repo)) if repo.is_github() => {
                format!("{GITHUB_RAW_BASE_URL}/{}/{}/{reference}/{file}", repo.owner, repo.name)
            }
            _ => {
                let base = self.repository.trim_end_matches('/');
                let base = base.strip_suffix(".git").unwrap_or(base);
                format!("{base}/{reference}/{file}")
            }
        }
    }

    /// Version declared by the manifest at `reference`.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::NotFoundOrPrivate`] when the host answers 404
    /// - [`UpdateError::Request`] for transport errors and other statuses
    /// - [`UpdateError::Parse`] when the body is not JSON or has no string `version`
    pub async fn remote_version(&self, reference: &str) -> Result<String, UpdateError> {
        let url = self.manifest_url(reference);
        let token = self.token.as_ref().map(Token::expose).filter(|t| !t.is_empty());
        let manifest: Value = get_json(&self.client, &url, token, "remote manifest").await?;

        let version = version_field(&manifest).ok_or_else(|| UpdateError::Parse {
            what: "remote manifest".to_string(),
            reason: "missing string `version` field".to_string(),
        })?;
        debug!("Remote version at '{reference}': {version}");
        Ok(version)
    }
}

/// Version declared by the local manifest at `path`.
///
/// # Errors
///
/// Returns [`UpdateError::LocalRead`] when the file is missing, is not JSON,
/// or has no string `version` field.
pub fn read_local_version(path: &Path) -> Result<String, UpdateError> {
    let local_read = |reason: String| UpdateError::LocalRead {
        path: path.display().to_string(),
        reason,
    };

    let manifest: Value = read_json_file(path).map_err(|e| local_read(format!("{e:#}")))?;
    version_field(&manifest).ok_or_else(|| local_read("missing string `version` field".to_string()))
}

fn version_field(manifest: &Value) -> Option<String> {
    manifest.get("version").and_then(Value::as_str).map(str::to_string)
}
