//! Install stage: purge ignored paths from the clone, then copy it over the
//! application directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::blocking;
use crate::core::UpdateError;
use crate::utils::fs::{CopyOptions, copy_dir, remove_path};

/// Never copied from the clone into the application.
const GIT_DIR: &str = ".git";

/// Copies a cloned update over the live application directory.
#[derive(Debug, Clone)]
pub struct Installer {
    clone_dir: PathBuf,
    app_dir: PathBuf,
    ignore_files: Vec<String>,
    strict_ignore_files: bool,
}

impl Installer {
    /// Installer moving `clone_dir` into `app_dir`.
    #[must_use]
    pub const fn new(clone_dir: PathBuf, app_dir: PathBuf) -> Self {
        Self {
            clone_dir,
            app_dir,
            ignore_files: Vec::new(),
            strict_ignore_files: false,
        }
    }

    /// Paths, relative to the clone root, removed before copying.
    #[must_use]
    pub fn with_ignore_files(mut self, ignore_files: Vec<String>) -> Self {
        self.ignore_files = ignore_files;
        self
    }

    /// Fail when an ignore path is absent from the clone.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict_ignore_files = strict;
        self
    }

    /// Purge ignored paths, then copy the clone over the application.
    ///
    /// Application files without a counterpart in the clone are kept, which
    /// is how ignored local configuration survives.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Purge`] for invalid or (in strict mode) missing ignore
    /// paths, [`UpdateError::Install`] if the copy fails.
    pub async fn install(&self) -> Result<(), UpdateError> {
        self.purge_ignored().await?;

        info!("Installing update into {}", self.app_dir.display());
        let clone_dir = self.clone_dir.clone();
        let app_dir = self.app_dir.clone();
        blocking(move || copy_dir(&clone_dir, &app_dir, &CopyOptions::default().skip(GIT_DIR)))
            .await
            .map_err(|e| UpdateError::Install {
                reason: format!("{e:#}"),
            })
    }

    /// Remove every ignore path from the clone.
    pub async fn purge_ignored(&self) -> Result<(), UpdateError> {
        for entry in &self.ignore_files {
            let relative = checked_relative(entry)?;
            let target = self.clone_dir.join(relative);

            match std::fs::symlink_metadata(&target) {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    if self.strict_ignore_files {
                        return Err(UpdateError::Purge {
                            path: entry.clone(),
                            reason: "not present in the update".to_string(),
                        });
                    }
                    debug!("Ignored path '{entry}' is not part of the update, skipping");
                    continue;
                }
                Err(e) => {
                    return Err(UpdateError::Purge {
                        path: entry.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            debug!("Purging ignored path '{entry}' from the update");
            blocking(move || remove_path(&target)).await.map_err(|e| UpdateError::Purge {
                path: entry.clone(),
                reason: format!("{e:#}"),
            })?;
        }
        Ok(())
    }
}

/// Reject ignore paths that would reach outside the clone directory.
fn checked_relative(entry: &str) -> Result<&Path, UpdateError> {
    let invalid = |reason: &str| UpdateError::Purge {
        path: entry.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty path"));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(invalid("path must not contain '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path must be relative to the repository root"));
            }
        }
    }
    if path.components().all(|c| c == Component::CurDir) {
        return Err(invalid("path must name a file or directory"));
    }
    Ok(path)
}
