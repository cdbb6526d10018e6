use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::blocking;
use crate::utils::fs::{CopyOptions, copy_dir, remove_path};

const MAX_RESTORE_ATTEMPTS: u32 = 3;

/// Keeps one backup generation of the application directory.
///
/// The backup is a full copy of the application directory, dependency
/// artifacts included, with symbolic links replaced by the files they point
/// to. Creating a new backup discards the previous one.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::update::backup::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let manager = BackupManager::new(
///     PathBuf::from("/srv/app"),
///     PathBuf::from("/tmp/updates/git-autoupdate/backup"),
/// );
/// manager.create_backup().await?;
///
/// // ... install fails halfway ...
/// manager.restore_backup().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    app_dir: PathBuf,
    backup_path: PathBuf,
}

impl BackupManager {
    /// Manager backing up `app_dir` into `backup_path`.
    #[must_use]
    pub const fn new(app_dir: PathBuf, backup_path: PathBuf) -> Self {
        Self {
            app_dir,
            backup_path,
        }
    }

    /// Replace the backup with a fresh copy of the application directory.
    ///
    /// # Errors
    ///
    /// Fails if the application directory is missing or any entry cannot be
    /// copied, including broken symbolic links.
    pub async fn create_backup(&self) -> Result<()> {
        if !self.app_dir.is_dir() {
            bail!("Application directory does not exist: {}", self.app_dir.display());
        }

        if self.backup_exists() {
            debug!("Removing old backup at {}", self.backup_path.display());
        }
        info!("Backing up {} to {}", self.app_dir.display(), self.backup_path.display());

        let app_dir = self.app_dir.clone();
        let backup_path = self.backup_path.clone();
        blocking(move || {
            remove_path(&backup_path)?;
            copy_dir(&app_dir, &backup_path, &CopyOptions::dereferencing())
        })
        .await?;

        debug!("Backup created");
        Ok(())
    }

    /// Copy the backup back over the application directory.
    ///
    /// Files created after the backup are left in place. Retried a few times
    /// since the application may still hold files open while it shuts down.
    ///
    /// # Errors
    ///
    /// Fails if no backup exists or the copy keeps failing.
    pub async fn restore_backup(&self) -> Result<()> {
        if !self.backup_exists() {
            bail!("No backup found at {}", self.backup_path.display());
        }

        warn!("Restoring {} from backup at {}", self.app_dir.display(), self.backup_path.display());

        let mut attempts = 0;
        loop {
            match self.attempt_restore().await {
                Ok(()) => {
                    info!("Successfully restored from backup");
                    return Ok(());
                }
                Err(e) if attempts < MAX_RESTORE_ATTEMPTS - 1 => {
                    warn!("Restore attempt {} failed: {e:#}. Retrying...", attempts + 1);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt_restore(&self) -> Result<()> {
        let app_dir = self.app_dir.clone();
        let backup_path = self.backup_path.clone();
        blocking(move || copy_dir(&backup_path, &app_dir, &CopyOptions::default())).await
    }

    /// Whether a backup exists.
    #[must_use]
    pub fn backup_exists(&self) -> bool {
        self.backup_path.is_dir()
    }

    /// Location of the backup.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}
