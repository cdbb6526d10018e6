//! Platform-specific helpers.
//!
//! Covers the few places where Windows and Unix differ for the updater: the
//! git executable name, how a configured command string is handed to the
//! shell, and `~` / environment variable expansion in configured paths.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Returns `true` when compiled for Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns the user's home directory.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine home directory.\n\n\
            Set the HOME environment variable (or USERPROFILE on Windows)"
        )
    })
}

/// Returns the name of the git executable for this platform.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() { "git.exe" } else { "git" }
}

/// Checks whether an executable can be found on `PATH`.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Builds a command that runs `command_line` through the platform shell.
///
/// Configured commands (`install_command`, `execute_on_complete`) are free-form
/// strings that may use pipes or `&&`, so they go through `sh -c` on Unix and
/// `cmd /C` on Windows.
#[must_use]
pub fn shell_command(command_line: &str) -> tokio::process::Command {
    if is_windows() {
        let mut cmd = tokio::process::Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    } else {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}

/// Resolves a configured path with `~/` and environment variable expansion.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::utils::platform::resolve_path;
///
/// # fn example() -> anyhow::Result<()> {
/// let temp = resolve_path("~/.cache/my-app")?;
/// let other = resolve_path("$TMPDIR/updates")?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails when the home directory is unknown, when `~user` syntax is used, or
/// when a referenced environment variable is undefined.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = if let Some(stripped) = path.strip_prefix("~/") {
        get_home_dir()?.join(stripped)
    } else if path == "~" {
        get_home_dir()?
    } else if path.starts_with('~') {
        return Err(anyhow::anyhow!(
            "Invalid path: {path}\n\n\
            Tilde expansion only supports '~/' for the home directory"
        ));
    } else {
        PathBuf::from(path)
    };

    let path_str = expanded.to_string_lossy();
    let expanded_str = shellexpand::env(&path_str)
        .with_context(|| format!("Failed to expand environment variables in path: {path_str}"))?;

    Ok(PathBuf::from(expanded_str.as_ref()))
}
