//! git-autoupdate - keep an installed application in sync with its git repository
//!
//! The crate compares the `version` field of the application's manifest
//! (`package.json` by default) with the same file in the repository and, when
//! they differ, replaces the application with the repository's content:
//!
//! ```text
//!   compare ──▶ download ──▶ backup ──▶ install ──▶ dependencies ──▶ post-actions
//!   (HTTP)      (git clone)  (copy)     (copy over)  (npm install)    (restart/exit)
//! ```
//!
//! # Modules
//!
//! - [`config`] - [`config::UpdaterConfig`] and the logger configuration
//! - [`core`] - the [`core::UpdateError`] taxonomy and user-facing error rendering
//! - [`git`] - repository URLs, token embedding and the [`git::Cloner`] seam
//! - [`remote`] - remote manifest and latest-release lookups
//! - [`update`] - the [`update::AutoUpdater`] facade, readiness gate and pipeline stages
//! - [`logging`] - installing and reloading the `tracing` subscriber
//! - [`utils`] - filesystem and platform helpers
//! - [`cli`] - the `git-autoupdate` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use git_autoupdate::config::UpdaterConfig;
//! use git_autoupdate::update::AutoUpdater;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::new("https://github.com/owner/app", "~/.cache/app-updates")
//!     .from_releases(true)
//!     .with_ignore_files(["config.json", ".env"]);
//!
//! let updater = AutoUpdater::new(config)?;
//! let comparison = updater.compare_versions().await;
//! println!("{comparison}");
//!
//! if !comparison.up_to_date {
//!     updater.auto_update().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod git;
pub mod logging;
pub mod remote;
pub mod update;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
