//! Directory operations for creating, copying, emptying and removing directories.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// # Errors
///
/// Fails if the path exists but is not a directory, or creation fails.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("/tmp/updater/git-autoupdate/repo"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!(
                "Failed to create directory: {}\n\nCheck directory permissions and path validity",
                path.display()
            )
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Removes everything at `path` and recreates it as an empty directory.
pub fn empty_dir(path: &Path) -> Result<()> {
    remove_path(path)?;
    ensure_dir(path)
}

/// Recursively removes a directory and all its contents.
///
/// Succeeds when the directory does not exist.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Removes a file, symlink or directory tree.
///
/// Symlinks are removed themselves, never their targets. Succeeds when nothing
/// exists at `path`.
pub fn remove_path(path: &Path) -> Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    if metadata.is_dir() {
        remove_dir_all(path)
    } else {
        fs::remove_file(path).with_context(|| format!("Failed to remove file: {}", path.display()))
    }
}

/// Options for [`copy_dir`].
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Copy the targets of symbolic links instead of the links themselves.
    pub dereference: bool,
    /// Names of top-level entries of the source that are not copied.
    pub skip: Vec<OsString>,
}

impl CopyOptions {
    /// Options that follow symbolic links.
    #[must_use]
    pub fn dereferencing() -> Self {
        Self {
            dereference: true,
            skip: Vec::new(),
        }
    }

    /// Skip a top-level entry of the source directory.
    #[must_use]
    pub fn skip(mut self, name: impl Into<OsString>) -> Self {
        self.skip.push(name.into());
        self
    }
}

/// Recursively copies the contents of `src` into `dst`.
///
/// Existing files in `dst` are overwritten when the source has a file at the
/// same relative path; files in `dst` without a counterpart are left alone.
/// `dst` is created when missing.
///
/// With [`CopyOptions::dereference`] set, symbolic links are followed and the
/// linked content is copied. Otherwise links are recreated as links on Unix
/// and skipped elsewhere.
///
/// # Errors
///
/// Fails on the first entry that cannot be read or written, including broken
/// links and link cycles when dereferencing.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::utils::fs::{CopyOptions, copy_dir};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// copy_dir(
///     Path::new("/tmp/updater/git-autoupdate/repo"),
///     Path::new("/srv/app"),
///     &CopyOptions::default().skip(".git"),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn copy_dir(src: &Path, dst: &Path, options: &CopyOptions) -> Result<()> {
    if !src.is_dir() {
        return Err(anyhow::anyhow!("Source is not a directory: {}", src.display()));
    }
    ensure_dir(dst)?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(options.dereference)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() != 1 || !options.skip.iter().any(|name| name == entry.file_name())
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to read directory: {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("Entry outside of source: {}", entry.path().display()))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            ensure_dir(&target)?;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            if fs::symlink_metadata(&target).is_ok_and(|m| m.file_type().is_symlink()) {
                fs::remove_file(&target).with_context(|| {
                    format!("Failed to replace symlink: {}", target.display())
                })?;
            }
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy file from {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let destination = fs::read_link(link)
        .with_context(|| format!("Failed to read symlink: {}", link.display()))?;
    remove_path(target)?;
    std::os::unix::fs::symlink(&destination, target)
        .with_context(|| format!("Failed to create symlink: {}", target.display()))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, _target: &Path) -> Result<()> {
    tracing::debug!("Skipping symlink {}", link.display());
    Ok(())
}
