//! Local vs. remote version comparison.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error};

use crate::core::UpdateError;
use crate::remote::{RemoteVersionResolver, read_local_version};

/// Placeholder reported for both versions when a comparison fails.
pub const COMPARISON_ERROR: &str = "Error";

/// Result of one comparison. Computed fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionComparison {
    /// Whether the two version strings are identical.
    pub up_to_date: bool,
    /// Version of the installed application, or [`COMPARISON_ERROR`].
    pub current_version: String,
    /// Version at the tracked reference, or [`COMPARISON_ERROR`].
    pub remote_version: String,
}

impl VersionComparison {
    /// Compare two versions byte for byte. `1.0` and `1.0.0` differ.
    pub fn new(current_version: impl Into<String>, remote_version: impl Into<String>) -> Self {
        let current_version = current_version.into();
        let remote_version = remote_version.into();
        Self {
            up_to_date: current_version == remote_version,
            current_version,
            remote_version,
        }
    }

    /// The result reported when either version could not be read.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            up_to_date: false,
            current_version: COMPARISON_ERROR.to_string(),
            remote_version: COMPARISON_ERROR.to_string(),
        }
    }

    /// Whether this is the [`Self::failed`] placeholder rather than real versions.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.current_version == COMPARISON_ERROR && self.remote_version == COMPARISON_ERROR
    }
}

impl fmt::Display for VersionComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error() {
            return write!(f, "version comparison failed");
        }
        write!(f, "current {}, remote {}", self.current_version, self.remote_version)?;
        if self.up_to_date {
            write!(f, " (up to date)")?;
        }
        Ok(())
    }
}

/// Compares the installed manifest with the manifest at a reference.
#[derive(Debug, Clone)]
pub struct VersionComparator {
    resolver: RemoteVersionResolver,
    local_manifest: PathBuf,
}

impl VersionComparator {
    /// Comparator reading the installed version from `local_manifest`.
    #[must_use]
    pub const fn new(resolver: RemoteVersionResolver, local_manifest: PathBuf) -> Self {
        Self {
            resolver,
            local_manifest,
        }
    }

    /// Compare, reporting failures as errors.
    ///
    /// # Errors
    ///
    /// [`UpdateError::LocalRead`] for the installed manifest, or the lookup
    /// errors of [`RemoteVersionResolver::remote_version`].
    pub async fn try_compare(&self, reference: &str) -> Result<VersionComparison, UpdateError> {
        let current = read_local_version(&self.local_manifest)?;
        let remote = self.resolver.remote_version(reference).await?;
        let comparison = VersionComparison::new(current, remote);
        debug!("Compared against '{reference}': {comparison}");
        Ok(comparison)
    }

    /// Compare, logging failures and reporting them as [`VersionComparison::failed`].
    pub async fn compare(&self, reference: &str) -> VersionComparison {
        match self.try_compare(reference).await {
            Ok(comparison) => comparison,
            Err(e) => {
                error!("Version comparison failed: {e}");
                VersionComparison::failed()
            }
        }
    }
}
