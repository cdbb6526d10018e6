//! Command-line interface for git-autoupdate.
//!
//! The binary is a thin host around [`crate::update::AutoUpdater`] for
//! applications that prefer to shell out instead of linking the library.
//!
//! ```bash
//! git-autoupdate                      # update if the remote version differs
//! git-autoupdate --check              # print the version comparison only
//! git-autoupdate --check --json       # same, as JSON
//! git-autoupdate --force              # update unconditionally
//! git-autoupdate --rollback           # restore the last backup
//! git-autoupdate -c ./updater.toml -v # custom config, debug logging
//! ```
//!
//! The configuration file is the TOML form of [`UpdaterConfig`]. When it has
//! no `token`, `GIT_AUTOUPDATE_TOKEN` is used.

pub mod update;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::debug;

use crate::config::{LoggerConfig, Token, UpdaterConfig};

/// Environment variable consulted when the configuration has no token.
pub const TOKEN_ENV: &str = "GIT_AUTOUPDATE_TOKEN";

/// Operation selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compare, then update if the versions differ.
    Auto,
    /// Compare only.
    Check,
    /// Update without comparing.
    Force,
    /// Restore the last backup.
    Rollback,
}

/// Keep an application checkout in sync with its git repository.
#[derive(Parser, Debug)]
#[command(
    name = "git-autoupdate",
    about = "Update an application from its git repository",
    version,
    long_about = "Compares the installed manifest version with the one in the repository and, \
                  when they differ, clones the update, backs up the application, installs the \
                  update and its dependencies, then runs the configured completion command."
)]
#[command(group(ArgGroup::new("mode").args(["check", "force", "rollback"])))]
pub struct Cli {
    /// Path to the updater configuration file.
    ///
    /// Defaults to `git-autoupdate/config.toml` in the platform config directory.
    #[arg(short, long, env = "GIT_AUTOUPDATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging, including git commands.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Compare versions without changing anything.
    #[arg(long)]
    pub check: bool,

    /// Print the comparison as JSON (with `--check`).
    #[arg(long, requires = "check")]
    pub json: bool,

    /// Update even if the versions match.
    #[arg(long)]
    pub force: bool,

    /// Restore the application from the last backup.
    #[arg(long)]
    pub rollback: bool,
}

impl Cli {
    /// The selected operation.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        if self.check {
            Mode::Check
        } else if self.force {
            Mode::Force
        } else if self.rollback {
            Mode::Rollback
        } else {
            Mode::Auto
        }
    }

    /// Logger configuration for this invocation.
    ///
    /// `--verbose` selects debug and `--quiet` disables logging. Otherwise the
    /// configuration file's `log` table applies, defaulting to info.
    #[must_use]
    pub fn build_logger(&self, from_file: Option<LoggerConfig>) -> Option<LoggerConfig> {
        if self.quiet {
            None
        } else if self.verbose {
            Some(LoggerConfig {
                level: "debug".to_string(),
                ..from_file.unwrap_or_default()
            })
        } else {
            Some(from_file.unwrap_or_default())
        }
    }

    /// Path of the configuration file to load.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => UpdaterConfig::default_path(),
        }
    }

    /// Load the configuration file and apply command-line overrides.
    pub async fn load_config(&self) -> Result<UpdaterConfig> {
        let path = self.config_path()?;
        if !path.exists() {
            return Err(crate::core::UpdateError::config(format!(
                "configuration file not found: {}",
                path.display()
            )))
            .context("Pass --config or create the default configuration file");
        }
        debug!("Loading configuration from {}", path.display());

        let mut config = UpdaterConfig::load_from(&path).await?;
        if config.token().is_none() {
            if let Ok(token) = std::env::var(TOKEN_ENV) {
                if !token.trim().is_empty() {
                    debug!("Using token from {TOKEN_ENV}");
                    config.token = Some(Token::new(token.trim()));
                }
            }
        }
        config.log = self.build_logger(config.log.take());
        Ok(config)
    }

    /// Run the selected operation.
    pub async fn execute(self) -> Result<()> {
        let config = self.load_config().await?;
        match self.mode() {
            Mode::Auto => update::auto(config).await,
            Mode::Check => update::check(config, self.json).await,
            Mode::Force => update::force(config).await,
            Mode::Rollback => update::rollback(config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_mode_selection() {
        assert_eq!(Cli::parse_from(["git-autoupdate"]).mode(), Mode::Auto);
        assert_eq!(Cli::parse_from(["git-autoupdate", "--check"]).mode(), Mode::Check);
        assert_eq!(Cli::parse_from(["git-autoupdate", "--force"]).mode(), Mode::Force);
        assert_eq!(Cli::parse_from(["git-autoupdate", "--rollback"]).mode(), Mode::Rollback);
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(Cli::try_parse_from(["git-autoupdate", "--check", "--force"]).is_err());
        assert!(Cli::try_parse_from(["git-autoupdate", "-v", "-q"]).is_err());
        assert!(Cli::try_parse_from(["git-autoupdate", "--json"]).is_err());
    }

    #[test]
    fn test_build_logger() {
        let verbose = Cli::parse_from(["git-autoupdate", "-v"]);
        assert_eq!(verbose.build_logger(None).unwrap().level, "debug");

        let quiet = Cli::parse_from(["git-autoupdate", "-q"]);
        assert!(quiet.build_logger(Some(LoggerConfig::default())).is_none());

        let plain = Cli::parse_from(["git-autoupdate"]);
        assert_eq!(plain.build_logger(None).unwrap().level, "info");
        let from_file = LoggerConfig::with_level("warn");
        assert_eq!(plain.build_logger(Some(from_file)).unwrap().level, "warn");
    }

    #[tokio::test]
    #[serial]
    async fn test_load_config_token_from_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "repository = \"https://github.com/owner/app\"\ntemp_location = \"/tmp/updates\"\n",
        )
        .unwrap();

        unsafe {
            std::env::set_var(TOKEN_ENV, "ghp_env");
        }
        let cli = Cli::parse_from(["git-autoupdate", "--config", path.to_str().unwrap()]);
        let config = cli.load_config().await;
        unsafe {
            std::env::remove_var(TOKEN_ENV);
        }

        let config = config.unwrap();
        assert_eq!(config.token(), Some("ghp_env"));
        assert_eq!(config.log.unwrap().level, "info");
    }

    #[tokio::test]
    #[serial]
    async fn test_load_config_missing_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        let cli = Cli::parse_from(["git-autoupdate", "--config", missing.to_str().unwrap()]);
        let err = cli.load_config().await.unwrap_err();
        assert!(format!("{err:#}").contains("configuration file not found"));
    }
}
