use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use super::LoggerConfig;
use crate::core::UpdateError;
use crate::utils::platform::resolve_path;

/// Branch used when none is configured.
pub const DEFAULT_BRANCH: &str = "master";

/// Manifest file read locally and fetched remotely.
pub const DEFAULT_MANIFEST_FILE: &str = "package.json";

/// Dependency install command run after the update is copied in.
pub const DEFAULT_INSTALL_COMMAND: &str = "npm install";

/// Environment marker that refuses updates against a development checkout.
pub const DEVELOPMENT_ENV: &str = "GIT_AUTOUPDATE_DEVELOPMENT";

const DEFAULT_POST_COMMAND_GRACE_MS: u64 = 1000;

/// Repository access token.
///
/// Serialized as a plain string, but never printed by `Debug` so that the
/// configuration can be logged safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wrap a token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token, for building request headers and clone URLs.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Settings for one updatable application.
///
/// `repository` and `temp_location` are mandatory; [`UpdaterConfig::validate`]
/// rejects a configuration without them before any network or filesystem
/// work happens. Every other field has a default.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::config::UpdaterConfig;
///
/// let config = UpdaterConfig::new("https://github.com/owner/app", "/tmp/app-updates")
///     .with_branch("main")
///     .with_ignore_files(["config.json"])
///     .with_execute_on_complete("systemctl restart app");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Repository URL, e.g. `https://github.com/owner/app`.
    #[serde(default)]
    pub repository: String,

    /// Branch or tag whose manifest defines "latest".
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Access token for private repositories.
    #[serde(default)]
    pub token: Option<Token>,

    /// Resolve the latest published release and use its tag instead of `branch`.
    #[serde(default)]
    pub from_releases: bool,

    /// Root of the clone and backup workspace.
    #[serde(default)]
    pub temp_location: PathBuf,

    /// Paths, relative to the repository root, that are never installed.
    #[serde(default)]
    pub ignore_files: Vec<String>,

    /// Command launched detached once the update is installed.
    #[serde(default)]
    pub execute_on_complete: Option<String>,

    /// Exit the current process after a successful update.
    #[serde(default)]
    pub exit_on_complete: bool,

    /// Logger settings applied when the updater is constructed.
    #[serde(default)]
    pub log: Option<LoggerConfig>,

    /// Installed application root. Defaults to the current directory.
    #[serde(default)]
    pub app_dir: Option<PathBuf>,

    /// Manifest file name carrying the `version` field.
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Dependency install command. `None` or an empty string skips the stage.
    #[serde(default = "default_install_command")]
    pub install_command: Option<String>,

    /// Fail the install stage when an ignore path is missing from the update.
    #[serde(default)]
    pub strict_ignore_files: bool,

    /// Marks the application directory as a development checkout; updates are refused.
    #[serde(default)]
    pub development_checkout: bool,

    /// Timeout for each HTTP request, in seconds.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Timeout for the git clone, in seconds.
    #[serde(default)]
    pub clone_timeout_secs: Option<u64>,

    /// Timeout for the dependency install command, in seconds.
    #[serde(default)]
    pub install_timeout_secs: Option<u64>,

    /// How long `auto_update` waits for release resolution, in milliseconds.
    #[serde(default)]
    pub ready_timeout_ms: Option<u64>,

    /// Delay granted to the completion command before returning.
    #[serde(default = "default_post_command_grace_ms")]
    pub post_command_grace_ms: u64,

    /// Releases API root. Defaults to `https://api.github.com`.
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Raw content root. Defaults to `https://raw.githubusercontent.com` for GitHub.
    #[serde(default)]
    pub raw_base_url: Option<String>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_manifest_file() -> String {
    DEFAULT_MANIFEST_FILE.to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_install_command() -> Option<String> {
    Some(DEFAULT_INSTALL_COMMAND.to_string())
}

const fn default_post_command_grace_ms() -> u64 {
    DEFAULT_POST_COMMAND_GRACE_MS
}

impl UpdaterConfig {
    /// Configuration with the two mandatory settings and defaults for the rest.
    pub fn new(repository: impl Into<String>, temp_location: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            branch: default_branch(),
            temp_location: temp_location.into(),
            manifest_file: default_manifest_file(),
            install_command: default_install_command(),
            post_command_grace_ms: default_post_command_grace_ms(),
            ..Self::default()
        }
    }

    /// Set the branch or tag to track.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Set the repository access token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(Token::new(token));
        self
    }

    /// Track the latest published release instead of a branch.
    #[must_use]
    pub const fn from_releases(mut self, enabled: bool) -> Self {
        self.from_releases = enabled;
        self
    }

    /// Set the paths that are never installed from the update.
    #[must_use]
    pub fn with_ignore_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Set the command launched after a successful update.
    #[must_use]
    pub fn with_execute_on_complete(mut self, command: impl Into<String>) -> Self {
        self.execute_on_complete = Some(command.into());
        self
    }

    /// Exit the process after a successful update.
    #[must_use]
    pub const fn exit_on_complete(mut self, enabled: bool) -> Self {
        self.exit_on_complete = enabled;
        self
    }

    /// Set the logger configuration applied at construction.
    #[must_use]
    pub fn with_log(mut self, log: LoggerConfig) -> Self {
        self.log = Some(log);
        self
    }

    /// Set the installed application root.
    #[must_use]
    pub fn with_app_dir(mut self, app_dir: impl Into<PathBuf>) -> Self {
        self.app_dir = Some(app_dir.into());
        self
    }

    /// Set the manifest file name.
    #[must_use]
    pub fn with_manifest_file(mut self, manifest_file: impl Into<String>) -> Self {
        self.manifest_file = manifest_file.into();
        self
    }

    /// Set or clear the dependency install command.
    #[must_use]
    pub fn with_install_command(mut self, command: Option<&str>) -> Self {
        self.install_command = command.map(str::to_string);
        self
    }

    /// Make missing ignore paths fatal.
    #[must_use]
    pub const fn strict_ignore_files(mut self, strict: bool) -> Self {
        self.strict_ignore_files = strict;
        self
    }

    /// Set the releases API root.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the raw content root.
    #[must_use]
    pub fn with_raw_base_url(mut self, url: impl Into<String>) -> Self {
        self.raw_base_url = Some(url.into());
        self
    }

    /// Set the grace period granted to the completion command.
    #[must_use]
    pub const fn with_post_command_grace(mut self, grace: Duration) -> Self {
        self.post_command_grace_ms = grace.as_millis() as u64;
        self
    }

    /// Bound the wait for release resolution in `auto_update`.
    #[must_use]
    pub const fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Check the configuration without touching the network or the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Config`] when:
    /// - `repository` or `temp_location` is empty
    /// - `branch` is empty
    /// - the application is marked as a development checkout, either by
    ///   `development_checkout` or the `GIT_AUTOUPDATE_DEVELOPMENT` environment variable
    /// - `temp_location` cannot be expanded
    /// - `temp_location` lies inside the application directory
    pub fn validate(&self) -> Result<(), UpdateError> {
        if self.repository.trim().is_empty() {
            return Err(UpdateError::config("`repository` is required"));
        }
        if self.temp_location.as_os_str().is_empty() {
            return Err(UpdateError::config("`temp_location` is required"));
        }
        if self.branch.trim().is_empty() {
            return Err(UpdateError::config("`branch` must not be empty"));
        }
        if self.is_development_checkout() {
            return Err(UpdateError::config(format!(
                "refusing to update a development checkout (unset {DEVELOPMENT_ENV} or `development_checkout`)"
            )));
        }

        let temp = absolute(&self.resolved_temp_location()?);
        let app = absolute(&self.app_dir());
        if temp.starts_with(&app) {
            return Err(UpdateError::config(format!(
                "`temp_location` ({}) must not be inside the application directory ({})",
                temp.display(),
                app.display()
            )));
        }

        Ok(())
    }

    /// Whether updates are refused because this is a development checkout.
    #[must_use]
    pub fn is_development_checkout(&self) -> bool {
        self.development_checkout
            || std::env::var(DEVELOPMENT_ENV)
                .is_ok_and(|value| matches!(value.trim(), "1" | "true" | "yes"))
    }

    /// `temp_location` with `~/` and environment variables expanded.
    pub fn resolved_temp_location(&self) -> Result<PathBuf, UpdateError> {
        resolve_path(&self.temp_location.to_string_lossy())
            .map_err(|e| UpdateError::config(format!("invalid `temp_location`: {e:#}")))
    }

    /// The installed application root.
    #[must_use]
    pub fn app_dir(&self) -> PathBuf {
        self.app_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Path of the local manifest.
    #[must_use]
    pub fn local_manifest_path(&self) -> PathBuf {
        self.app_dir().join(&self.manifest_file)
    }

    /// The dependency install command, if the stage is enabled.
    #[must_use]
    pub fn install_command(&self) -> Option<&str> {
        self.install_command.as_deref().map(str::trim).filter(|cmd| !cmd.is_empty())
    }

    /// The completion command, if one is configured.
    #[must_use]
    pub fn completion_command(&self) -> Option<&str> {
        self.execute_on_complete.as_deref().map(str::trim).filter(|cmd| !cmd.is_empty())
    }

    /// Raw token value, if configured.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(Token::expose).filter(|t| !t.is_empty())
    }

    pub(crate) fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub(crate) fn clone_timeout(&self) -> Option<Duration> {
        self.clone_timeout_secs.map(Duration::from_secs)
    }

    pub(crate) fn install_timeout(&self) -> Option<Duration> {
        self.install_timeout_secs.map(Duration::from_secs)
    }

    pub(crate) fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) const fn post_command_grace(&self) -> Duration {
        Duration::from_millis(self.post_command_grace_ms)
    }

    /// Load a configuration from a TOML file.
    ///
    /// The result is not validated; the updater constructor does that.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this structure.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read updater config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse updater config from {}", path.display()))
    }

    /// Default configuration file location.
    ///
    /// - **Linux**: `~/.config/git-autoupdate/config.toml`
    /// - **macOS**: `~/Library/Application Support/git-autoupdate/config.toml`
    /// - **Windows**: `%APPDATA%\git-autoupdate\config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?;
        Ok(config_dir.join("git-autoupdate").join("config.toml"))
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn valid_config(temp: &TempDir) -> UpdaterConfig {
        UpdaterConfig::new("https://github.com/owner/app", temp.path().join("updates"))
            .with_app_dir(temp.path().join("app"))
    }

    #[test]
    fn test_defaults() {
        let config = UpdaterConfig::new("https://github.com/owner/app", "/tmp/updates");
        assert_eq!(config.branch, "master");
        assert_eq!(config.manifest_file, "package.json");
        assert_eq!(config.install_command(), Some("npm install"));
        assert_eq!(config.post_command_grace_ms, 1000);
        assert!(!config.from_releases);
        assert!(!config.exit_on_complete);
        assert!(config.ignore_files.is_empty());
    }

    #[test]
    #[serial]
    fn test_validate_ok() {
        let temp = TempDir::new().unwrap();
        assert!(valid_config(&temp).validate().is_ok());
    }

    #[test]
    fn test_missing_repository() {
        let config = UpdaterConfig {
            temp_location: PathBuf::from("/tmp/updates"),
            ..UpdaterConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("repository"));
    }

    #[test]
    fn test_missing_temp_location() {
        let config = UpdaterConfig {
            repository: "https://github.com/owner/app".to_string(),
            branch: "master".to_string(),
            ..UpdaterConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temp_location"));
    }

    #[test]
    #[serial]
    fn test_temp_inside_app_dir_rejected() {
        let temp = TempDir::new().unwrap();
        let config = UpdaterConfig::new("https://github.com/owner/app", temp.path().join("app/tmp"))
            .with_app_dir(temp.path().join("app"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must not be inside"));
    }

    #[test]
    #[serial]
    fn test_development_checkout_flag() {
        let temp = TempDir::new().unwrap();
        let mut config = valid_config(&temp);
        config.development_checkout = true;
        assert!(config.validate().unwrap_err().to_string().contains("development checkout"));
    }

    #[test]
    #[serial]
    fn test_development_checkout_env() {
        let temp = TempDir::new().unwrap();
        unsafe {
            std::env::set_var(DEVELOPMENT_ENV, "1");
        }
        let result = valid_config(&temp).validate();
        unsafe {
            std::env::remove_var(DEVELOPMENT_ENV);
        }
        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let config = UpdaterConfig::new("https://github.com/owner/app", "/tmp/x")
            .with_token("ghp_secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("Token(***)"));
        assert_eq!(config.token(), Some("ghp_secret"));
    }

    #[test]
    fn test_empty_commands_are_disabled() {
        let mut config = UpdaterConfig::new("https://github.com/owner/app", "/tmp/x");
        config.install_command = Some("  ".to_string());
        config.execute_on_complete = Some(String::new());
        assert_eq!(config.install_command(), None);
        assert_eq!(config.completion_command(), None);

        let config = config.with_install_command(None);
        assert_eq!(config.install_command(), None);
    }

    #[test]
    fn test_sub_second_ready_timeout() {
        let config = UpdaterConfig::new("https://github.com/owner/app", "/tmp/x")
            .with_ready_timeout(Duration::from_millis(900));
        assert_eq!(config.ready_timeout_ms, Some(900));
        assert_eq!(config.ready_timeout(), Some(Duration::from_millis(900)));
    }

    #[tokio::test]
    async fn test_load_from_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
repository = "https://github.com/owner/app"
temp_location = "/tmp/app-updates"
from_releases = true
ignore_files = ["config.json"]
token = "abc"

[log]
level = "debug"
"#,
        )
        .await
        .unwrap();

        let config = UpdaterConfig::load_from(&path).await.unwrap();
        assert_eq!(config.repository, "https://github.com/owner/app");
        assert_eq!(config.branch, "master");
        assert!(config.from_releases);
        assert_eq!(config.ignore_files, vec!["config.json".to_string()]);
        assert_eq!(config.token(), Some("abc"));
        assert_eq!(config.install_command(), Some("npm install"));
        assert_eq!(config.log.unwrap().level, "debug");
    }

    #[tokio::test]
    async fn test_load_from_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "repository = [").await.unwrap();

        let err = UpdaterConfig::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse updater config"));
    }
}
