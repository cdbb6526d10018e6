//! Clone and backup directories under the configured temp location.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::blocking;
use crate::utils::fs::empty_dir;

/// Directory created under `temp_location` to hold the workspace.
pub const WORKSPACE_DIR: &str = "git-autoupdate";

const CLONE_DIR: &str = "repo";
const BACKUP_DIR: &str = "backup";

/// `{temp_location}/git-autoupdate/{repo,backup}`.
///
/// One pipeline run owns the workspace at a time; two updaters sharing a
/// temp location must not run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Workspace rooted under `temp_location`.
    #[must_use]
    pub fn new(temp_location: &Path) -> Self {
        Self {
            root: temp_location.join(WORKSPACE_DIR),
        }
    }

    /// `{temp_location}/git-autoupdate`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory the update is cloned into.
    #[must_use]
    pub fn clone_dir(&self) -> PathBuf {
        self.root.join(CLONE_DIR)
    }

    /// Directory holding the single backup generation.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    /// Remove any previous clone and recreate the clone directory empty.
    pub async fn reset_clone_dir(&self) -> Result<PathBuf> {
        let dir = self.clone_dir();
        let target = dir.clone();
        blocking(move || empty_dir(&target)).await?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let ws = Workspace::new(Path::new("/tmp/updates"));
        assert_eq!(ws.root(), Path::new("/tmp/updates/git-autoupdate"));
        assert_eq!(ws.clone_dir(), PathBuf::from("/tmp/updates/git-autoupdate/repo"));
        assert_eq!(ws.backup_dir(), PathBuf::from("/tmp/updates/git-autoupdate/backup"));
    }

    #[tokio::test]
    async fn test_reset_clone_dir_discards_previous_clone() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path());
        std::fs::create_dir_all(ws.clone_dir().join("old")).unwrap();
        std::fs::write(ws.clone_dir().join("old/file"), "stale").unwrap();

        let dir = ws.reset_clone_dir().await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }
}
