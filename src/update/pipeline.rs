//! The ordered update stages.
//!
//! ```text
//! Download ─▶ Backup ─▶ Install ─▶ Dependencies ─▶ PostActions
//! ```
//!
//! The first failing stage aborts the run. Nothing in the application
//! directory changes before the backup has been written, and the backup is
//! only replaced after the update has been cloned successfully.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::backup::BackupManager;
use super::dependencies::{DependencyInstaller, DiagnosticClassifier, default_classifier};
use super::install::Installer;
use super::post_actions::{ExitHook, PostActions, process_exit_hook};
use super::workspace::Workspace;
use crate::config::UpdaterConfig;
use crate::core::UpdateError;
use crate::git::{Cloner, display_url, embed_token};

/// One pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Clone the reference into the workspace.
    Download,
    /// Copy the application into the backup directory.
    Backup,
    /// Purge ignored paths and copy the clone over the application.
    Install,
    /// Run the dependency install command.
    Dependencies,
    /// Launch the completion command and exit if configured.
    PostActions,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Download => "download",
            Self::Backup => "backup",
            Self::Install => "install",
            Self::Dependencies => "dependencies",
            Self::PostActions => "post-actions",
        };
        f.write_str(name)
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Branch or tag that was installed.
    pub reference: String,
    /// Completed stages, in order. Skipped stages are absent.
    pub stages: Vec<Stage>,
}

/// Runs the update stages for one application.
///
/// Not safe to run twice concurrently on the same workspace.
#[derive(Clone)]
pub struct UpdatePipeline {
    config: Arc<UpdaterConfig>,
    app_dir: PathBuf,
    workspace: Workspace,
    cloner: Arc<dyn Cloner>,
    classifier: DiagnosticClassifier,
    exit_hook: ExitHook,
}

impl fmt::Debug for UpdatePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatePipeline")
            .field("app_dir", &self.app_dir)
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl UpdatePipeline {
    /// Pipeline installing into `app_dir` through `workspace`.
    pub fn new(
        config: Arc<UpdaterConfig>,
        app_dir: PathBuf,
        workspace: Workspace,
        cloner: Arc<dyn Cloner>,
    ) -> Self {
        Self {
            config,
            app_dir,
            workspace,
            cloner,
            classifier: default_classifier(),
            exit_hook: process_exit_hook(),
        }
    }

    /// Replace the dependency diagnostic classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: DiagnosticClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the hook used for exit-on-complete.
    #[must_use]
    pub fn with_exit_hook(mut self, hook: ExitHook) -> Self {
        self.exit_hook = hook;
        self
    }

    /// The workspace used by this pipeline.
    #[must_use]
    pub const fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Backup manager for this pipeline's application and workspace.
    #[must_use]
    pub fn backup_manager(&self) -> BackupManager {
        BackupManager::new(self.app_dir.clone(), self.workspace.backup_dir())
    }

    /// Install `reference`, stopping at the first failing stage.
    ///
    /// # Errors
    ///
    /// The error of the failing stage: [`UpdateError::Clone`],
    /// [`UpdateError::Backup`], [`UpdateError::Purge`], [`UpdateError::Install`],
    /// [`UpdateError::DependencyInstall`] or [`UpdateError::PostAction`].
    pub async fn run(&self, reference: &str) -> Result<UpdateReport, UpdateError> {
        info!("Updating {} to '{reference}'", display_url(&self.config.repository));
        let mut stages = Vec::with_capacity(5);

        self.download(reference).await?;
        stages.push(Stage::Download);

        self.backup().await?;
        stages.push(Stage::Backup);

        Installer::new(self.workspace.clone_dir(), self.app_dir.clone())
            .with_ignore_files(self.config.ignore_files.clone())
            .strict(self.config.strict_ignore_files)
            .install()
            .await?;
        stages.push(Stage::Install);

        if let Some(command) = self.config.install_command() {
            DependencyInstaller::new(command, self.app_dir.clone())
                .with_classifier(Arc::clone(&self.classifier))
                .with_timeout(self.config.install_timeout())
                .run()
                .await?;
            stages.push(Stage::Dependencies);
        } else {
            debug!("No install command configured, skipping dependencies");
        }

        info!("Update to '{reference}' installed");
        let post = PostActions::new(
            self.config.completion_command().map(str::to_string),
            self.app_dir.clone(),
        )
        .with_grace(self.config.post_command_grace())
        .exit_on_complete(self.config.exit_on_complete, Arc::clone(&self.exit_hook));
        post.run().await?;
        stages.push(Stage::PostActions);

        Ok(UpdateReport {
            reference: reference.to_string(),
            stages,
        })
    }

    async fn download(&self, reference: &str) -> Result<(), UpdateError> {
        let shown_url = display_url(&self.config.repository);
        let clone_error = |reason: String| UpdateError::Clone {
            url: shown_url.clone(),
            reference: reference.to_string(),
            reason,
        };

        let clone_dir =
            self.workspace.reset_clone_dir().await.map_err(|e| clone_error(format!("{e:#}")))?;
        let url = embed_token(&self.config.repository, self.config.token());

        debug!("Cloning {shown_url} at '{reference}' into {}", clone_dir.display());
        self.cloner.clone_ref(&url, &clone_dir, reference).await.map_err(|e| {
            match e.downcast::<UpdateError>() {
                Ok(typed @ UpdateError::Clone { .. }) => typed,
                Ok(other) => clone_error(other.to_string()),
                Err(e) => clone_error(format!("{e:#}")),
            }
        })
    }

    async fn backup(&self) -> Result<(), UpdateError> {
        self.backup_manager().create_backup().await.map_err(|e| UpdateError::Backup {
            reason: format!("{e:#}"),
        })
    }
}
