//! Builder for running the system `git` binary with consistent logging,
//! timeouts and error mapping.
//!
//! Arguments that may carry credentials (clone URLs with an embedded token)
//! are redacted before they reach a log line or an error message.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use super::strip_auth_from_url;
use crate::core::UpdateError;
use crate::utils::platform::get_git_command;

/// Fluent builder for a single git invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::git::command_builder::GitCommand;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// GitCommand::clone_branch("https://github.com/owner/app", "v2.0.0", "/tmp/updates/repo")
///     .maybe_timeout(Some(Duration::from_secs(120)))
///     .with_context("owner/app")
///     .execute()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// New commands capture output, inherit the environment, disable interactive
/// credential prompts and have no timeout.
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
    /// Set for clone commands so failures map to [`UpdateError::Clone`].
    clone_target: Option<CloneTarget>,
}

struct CloneTarget {
    display_url: String,
    reference: String,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: None,
            context: None,
            clone_target: None,
        }
    }
}

impl GitCommand {
    /// Creates an empty git command.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs git in `dir` (passed as `-C <dir>`).
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bounds how long the command may run, if a duration is given.
    #[must_use]
    pub const fn maybe_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Prefixes log lines with `(context)`.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// `git clone --branch <reference> <url> <target>`.
    ///
    /// `url` may embed a token; it is redacted in logs and errors.
    #[must_use]
    pub fn clone_branch(url: &str, reference: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new().args([
            "clone",
            "--branch",
            reference,
            url,
            &target.as_ref().display().to_string(),
        ]);
        cmd.clone_target = Some(CloneTarget {
            display_url: redact(url),
            reference: reference.to_string(),
        });
        cmd
    }

    fn full_args(&self) -> Vec<String> {
        let mut full_args = Vec::with_capacity(self.args.len() + 2);
        if let Some(dir) = &self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        full_args
    }

    fn display_args(&self) -> String {
        self.full_args().iter().map(|arg| redact(arg)).collect::<Vec<_>>().join(" ")
    }

    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    fn failure(&self, reason: String) -> anyhow::Error {
        match &self.clone_target {
            Some(target) => UpdateError::Clone {
                url: target.display_url.clone(),
                reference: target.reference.clone(),
                reason,
            }
            .into(),
            None => anyhow::anyhow!("git {} failed: {}", self.operation(), reason),
        }
    }

    /// Executes the command, logging its output at debug level.
    ///
    /// # Errors
    ///
    /// Clone commands fail with [`UpdateError::Clone`]; other commands fail
    /// with a message naming the git operation. Both carry git's stderr, or a
    /// timeout notice.
    pub async fn execute(self) -> Result<()> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let display_args = self.display_args();

        let mut cmd = Command::new(git_command);
        cmd.args(self.full_args());
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        match &self.context {
            Some(ctx) => {
                tracing::debug!(target: "git", "({ctx}) Executing command: {git_command} {display_args}");
            }
            None => tracing::debug!(target: "git", "Executing command: {git_command} {display_args}"),
        }

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.with_context(|| format!("Failed to execute git {display_args}"))?
            } else {
                tracing::warn!(
                    target: "git",
                    "Command timed out after {} seconds: git {display_args}",
                    duration.as_secs()
                );
                return Err(self.failure(format!(
                    "timed out after {} seconds (network issue or a credential prompt waiting for input)",
                    duration.as_secs()
                )));
            }
        } else {
            output_future
                .await
                .with_context(|| format!("Failed to execute git {display_args}"))?
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            let reason = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            return Err(self.failure(redact_text(reason)));
        }

        for stream in [&stdout, &stderr] {
            let text = stream.trim();
            if text.is_empty() {
                continue;
            }
            match &self.context {
                Some(ctx) => tracing::debug!(target: "git", "({ctx}) {}", redact_text(text)),
                None => tracing::debug!(target: "git", "{}", redact_text(text)),
            }
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "git::perf",
                "Git {} took {:.2}s",
                self.operation(),
                elapsed.as_secs_f64()
            );
        }

        Ok(())
    }

}

fn redact(arg: &str) -> String {
    strip_auth_from_url(arg).unwrap_or_else(|_| arg.to_string())
}

/// Git echoes the remote URL in its messages; drop the userinfo of every URL.
fn redact_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("://") {
        let (head, tail) = rest.split_at(pos + 3);
        out.push_str(head);
        let end = tail
            .find(|c: char| c == '/' || c == '\'' || c == '"' || c.is_whitespace())
            .unwrap_or(tail.len());
        let authority = &tail[..end];
        match authority.rfind('@') {
            Some(at) => out.push_str(&authority[at + 1..]),
            None => out.push_str(authority),
        }
        rest = &tail[end..];
    }
    out.push_str(rest);
    out
}
