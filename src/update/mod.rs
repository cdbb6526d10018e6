//! Self-update orchestration.
//!
//! [`AutoUpdater`] is the facade an application embeds. It owns an immutable
//! configuration snapshot, a [`ReadinessGate`] and the [`UpdatePipeline`]:
//!
//! - [`AutoUpdater::compare_versions`] reads the installed and remote
//!   manifests and never touches the filesystem
//! - [`AutoUpdater::force_update`] runs every pipeline stage unconditionally
//! - [`AutoUpdater::auto_update`] waits for release resolution, compares, and
//!   runs the pipeline only when the versions differ
//!
//! The `bool`/sentinel methods never fail; each has a `try_` counterpart that
//! returns the typed [`UpdateError`].
//!
//! Concurrent `force_update`/`auto_update` calls on one updater, or on two
//! updaters sharing a temp location, are not synchronized. Callers must run at
//! most one update at a time.
//!
//! # Examples
//!
//! ```rust,no_run
//! use git_autoupdate::config::UpdaterConfig;
//! use git_autoupdate::update::AutoUpdater;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::new("https://github.com/owner/app", "/tmp/updates")
//!     .with_ignore_files(["config.json"])
//!     .with_execute_on_complete("systemctl restart app")
//!     .exit_on_complete(true);
//!
//! let updater = AutoUpdater::new(config)?;
//! if !updater.auto_update().await {
//!     eprintln!("update failed, see logs");
//! }
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod dependencies;
pub mod install;
pub mod pipeline;
pub mod post_actions;
pub mod readiness;
pub mod version_check;
pub mod workspace;

pub use backup::BackupManager;
pub use dependencies::{DiagnosticClassifier, Severity, classify_diagnostic};
pub use pipeline::{Stage, UpdatePipeline, UpdateReport};
pub use post_actions::{ExitHook, UPDATE_EXIT_STATUS};
pub use readiness::{ReadinessGate, ReferenceState};
pub use version_check::{COMPARISON_ERROR, VersionComparator, VersionComparison};
pub use workspace::Workspace;

use anyhow::Context;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{LoggerConfig, UpdaterConfig};
use crate::core::UpdateError;
use crate::git::{Cloner, GitCloner};
use crate::logging::LogSetup;
use crate::remote::{ReleaseTagBinder, RemoteVersionResolver};

/// Run blocking filesystem work off the async workers.
pub(crate) async fn blocking<F, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.context("Blocking filesystem task panicked")?
}

/// Result of [`AutoUpdater::try_auto_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Installed and remote versions matched; nothing ran.
    UpToDate(VersionComparison),
    /// The pipeline ran to completion.
    Updated {
        /// Comparison that triggered the update.
        comparison: VersionComparison,
        /// Stages that ran.
        report: UpdateReport,
    },
}

impl UpdateOutcome {
    /// Whether the pipeline ran.
    #[must_use]
    pub const fn updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Self-update facade for one application.
///
/// Construction validates the configuration and, when `from_releases` is set,
/// starts resolving the latest release tag in the background. Dropping the
/// updater aborts a resolution still in flight.
pub struct AutoUpdater {
    config: Arc<UpdaterConfig>,
    gate: ReadinessGate,
    comparator: VersionComparator,
    pipeline: UpdatePipeline,
    _release_task: Option<ReleaseTask>,
}

/// Aborts the release lookup when the updater is dropped.
struct ReleaseTask(JoinHandle<()>);

impl Drop for ReleaseTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl std::fmt::Debug for AutoUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoUpdater")
            .field("repository", &crate::git::display_url(&self.config.repository))
            .field("state", &self.gate.state())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl AutoUpdater {
    /// Updater cloning with the system `git`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Config`] when validation fails, the log
    /// configuration is invalid, or `from_releases` is set outside a tokio
    /// runtime. Nothing touches the network or the filesystem before these
    /// checks pass.
    pub fn new(config: UpdaterConfig) -> Result<Self, UpdateError> {
        let cloner = GitCloner::with_timeout(config.clone_timeout());
        Self::with_cloner(config, Arc::new(cloner))
    }

    /// Updater using `cloner` for the download stage.
    ///
    /// # Errors
    ///
    /// Same as [`AutoUpdater::new`].
    pub fn with_cloner(config: UpdaterConfig, cloner: Arc<dyn Cloner>) -> Result<Self, UpdateError> {
        config.validate()?;
        if config.from_releases && tokio::runtime::Handle::try_current().is_err() {
            return Err(UpdateError::config(
                "`from_releases` requires a running tokio runtime",
            ));
        }
        if let Some(log) = &config.log {
            let setup =
                crate::logging::apply(log).map_err(|e| UpdateError::config(format!("{e:#}")))?;
            debug!("Logging setup: {setup:?}");
        }

        let mut config = config;
        let app_dir = std::path::absolute(config.app_dir()).map_err(|e| {
            UpdateError::config(format!("cannot resolve the application directory: {e}"))
        })?;
        config.app_dir = Some(app_dir.clone());
        let config = Arc::new(config);

        let resolver = RemoteVersionResolver::from_config(&config)?;
        let comparator = VersionComparator::new(resolver, config.local_manifest_path());
        let workspace = Workspace::new(&config.resolved_temp_location()?);
        let pipeline = UpdatePipeline::new(Arc::clone(&config), app_dir, workspace, cloner);

        let gate = ReadinessGate::new();
        let release_task = if config.from_releases {
            Some(ReleaseTask(ReleaseTagBinder::from_config(&config)?.spawn(gate.clone())))
        } else {
            None
        };

        debug!(
            "Updater ready for {} (branch '{}', from_releases={})",
            crate::git::display_url(&config.repository),
            config.branch,
            config.from_releases
        );

        Ok(Self {
            config,
            gate,
            comparator,
            pipeline,
            _release_task: release_task,
        })
    }

    /// Replace the hook called for exit-on-complete.
    #[must_use]
    pub fn with_exit_hook(mut self, hook: ExitHook) -> Self {
        self.pipeline = self.pipeline.with_exit_hook(hook);
        self
    }

    /// Replace the dependency diagnostic classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: DiagnosticClassifier) -> Self {
        self.pipeline = self.pipeline.with_classifier(classifier);
        self
    }

    /// The validated configuration snapshot.
    #[must_use]
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Reference used right now: the resolved release tag, or the configured branch.
    #[must_use]
    pub fn reference(&self) -> String {
        self.gate.resolved_tag().unwrap_or_else(|| self.config.branch.clone())
    }

    /// Current readiness state.
    #[must_use]
    pub fn reference_state(&self) -> ReferenceState {
        self.gate.state()
    }

    /// Whether release resolution, if any, has finished.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Replace the log filter at runtime.
    ///
    /// Returns [`LogSetup::External`] when a host subscriber owns the output
    /// and the new level could not take effect.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Config`] for an invalid level directive.
    pub fn set_log_config(&self, log: &LoggerConfig) -> Result<LogSetup, UpdateError> {
        crate::logging::apply(log).map_err(|e| UpdateError::config(format!("{e:#}")))
    }

    /// Wait until release resolution, if any, has finished and return the
    /// reference updates will use.
    ///
    /// Returns immediately when `from_releases` is off.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ReleaseResolution`] when the release lookup failed or
    /// did not finish within `ready_timeout_ms`.
    pub async fn wait_ready(&self) -> Result<String, UpdateError> {
        if !self.gate.is_ready() {
            debug!("Waiting for latest release resolution");
        }
        match self.gate.wait_ready(self.config.ready_timeout()).await? {
            ReferenceState::Failed(e) => Err(UpdateError::ReleaseResolution {
                reason: e.to_string(),
            }),
            ReferenceState::Resolved(tag) => Ok(tag),
            state => {
                debug!("Reference state: {state:?}");
                Ok(self.config.branch.clone())
            }
        }
    }

    /// Compare installed and remote versions without waiting for release resolution.
    ///
    /// # Errors
    ///
    /// [`UpdateError::LocalRead`], [`UpdateError::NotFoundOrPrivate`],
    /// [`UpdateError::Request`] or [`UpdateError::Parse`].
    pub async fn try_compare_versions(&self) -> Result<VersionComparison, UpdateError> {
        self.comparator.try_compare(&self.reference()).await
    }

    /// Compare installed and remote versions; failures yield the `"Error"` sentinel.
    pub async fn compare_versions(&self) -> VersionComparison {
        self.comparator.compare(&self.reference()).await
    }

    /// Run the whole pipeline regardless of versions or readiness.
    ///
    /// # Errors
    ///
    /// The error of the first failing stage.
    pub async fn try_force_update(&self) -> Result<UpdateReport, UpdateError> {
        self.pipeline.run(&self.reference()).await
    }

    /// [`AutoUpdater::try_force_update`], logging the failure.
    pub async fn force_update(&self) -> bool {
        match self.try_force_update().await {
            Ok(_) => true,
            Err(e) => {
                error!("Update failed: {e}");
                false
            }
        }
    }

    /// Wait for release resolution, compare, and update if the versions differ.
    ///
    /// A failed comparison counts as "not up to date" and the pipeline runs.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ReleaseResolution`] when the release lookup failed or
    /// did not finish within `ready_timeout_ms`, otherwise the error of the
    /// first failing stage.
    pub async fn try_auto_update(&self) -> Result<UpdateOutcome, UpdateError> {
        self.wait_ready().await?;

        let comparison = self.compare_versions().await;
        if comparison.up_to_date {
            info!("Already up to date ({})", comparison.current_version);
            return Ok(UpdateOutcome::UpToDate(comparison));
        }
        if comparison.is_error() {
            warn!("Versions could not be compared, updating anyway");
        } else {
            info!(
                "Updating from {} to {}",
                comparison.current_version, comparison.remote_version
            );
        }

        let report = self.try_force_update().await?;
        Ok(UpdateOutcome::Updated {
            comparison,
            report,
        })
    }

    /// [`AutoUpdater::try_auto_update`], logging the failure. Up to date counts as success.
    pub async fn auto_update(&self) -> bool {
        match self.try_auto_update().await {
            Ok(_) => true,
            Err(e) => {
                error!("Automatic update failed: {e}");
                false
            }
        }
    }

    /// Copy the last backup back over the application directory.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Backup`] when no backup exists or copying fails.
    pub async fn restore_backup(&self) -> Result<(), UpdateError> {
        let manager = self.pipeline.backup_manager();
        if !manager.backup_exists() {
            return Err(UpdateError::Backup {
                reason: format!("no backup at {}", manager.backup_path().display()),
            });
        }
        manager.restore_backup().await.map_err(|e| UpdateError::Backup {
            reason: format!("{e:#}"),
        })
    }
}
