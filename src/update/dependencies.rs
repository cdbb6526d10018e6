//! Dependency install stage.
//!
//! The install command runs through the platform shell in the application
//! directory. Its standard output is only logged. Its diagnostic stream is
//! classified line by line: package managers print warnings and errors on the
//! same stream, so a [`DiagnosticClassifier`] decides which lines are fatal.
//! The default one treats any line containing `error` (case-insensitive) as
//! fatal and everything else as a warning. That heuristic can misfire both
//! ways; embedders with a better signal can plug in their own.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

use crate::core::UpdateError;
use crate::utils::platform::shell_command;

/// Classification of one diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged, the install continues.
    Warning,
    /// Fails the install.
    Error,
}

/// Decides whether a diagnostic line is fatal.
pub type DiagnosticClassifier = Arc<dyn Fn(&str) -> Severity + Send + Sync>;

/// `Error` for lines containing `error` in any letter case, `Warning` otherwise.
#[must_use]
pub fn classify_diagnostic(line: &str) -> Severity {
    if line.to_lowercase().contains("error") { Severity::Error } else { Severity::Warning }
}

/// The classifier used unless the embedder installs another one.
#[must_use]
pub fn default_classifier() -> DiagnosticClassifier {
    Arc::new(classify_diagnostic)
}

/// Runs the dependency install command for the application.
#[derive(Clone)]
pub struct DependencyInstaller {
    command: String,
    app_dir: PathBuf,
    classifier: DiagnosticClassifier,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for DependencyInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyInstaller")
            .field("command", &self.command)
            .field("app_dir", &self.app_dir)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DependencyInstaller {
    /// Installer running `command` in `app_dir` with the default classifier.
    pub fn new(command: impl Into<String>, app_dir: PathBuf) -> Self {
        Self {
            command: command.into(),
            app_dir,
            classifier: default_classifier(),
            timeout: None,
        }
    }

    /// Replace the diagnostic classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: DiagnosticClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Kill the command if it runs longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the command to completion.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::DependencyInstall`] when the command cannot be
    /// started, prints a fatal diagnostic line, exits unsuccessfully or times
    /// out. The process is killed as soon as a fatal line is seen.
    pub async fn run(&self) -> Result<(), UpdateError> {
        info!("Installing dependencies with `{}`", self.command);
        let failed = |reason: String| UpdateError::DependencyInstall {
            reason,
        };

        let mut child = shell_command(&self.command)
            .current_dir(&self.app_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failed(format!("failed to start `{}`: {e}", self.command)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let classifier = Arc::clone(&self.classifier);

        let run = async move {
            let output = async {
                if let Some(stdout) = stdout {
                    for_each_line(stdout, |line| {
                        debug!("{line}");
                        Ok(())
                    })
                    .await?;
                }
                Ok::<(), String>(())
            };
            let diagnostics = async {
                if let Some(stderr) = stderr {
                    for_each_line(stderr, |line| match classifier(line) {
                        Severity::Error => Err(line.to_string()),
                        Severity::Warning => {
                            warn!("{line}");
                            Ok(())
                        }
                    })
                    .await?;
                }
                Ok::<(), String>(())
            };

            tokio::try_join!(output, diagnostics).map_err(|line| {
                failed(line.trim().to_string())
            })?;

            let status = child
                .wait()
                .await
                .map_err(|e| failed(format!("failed to wait for `{}`: {e}", self.command)))?;
            if !status.success() {
                return Err(failed(format!("`{}` exited with {status}", self.command)));
            }
            Ok(())
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                failed(format!("`{}` timed out after {} seconds", self.command, limit.as_secs()))
            })?,
            None => run.await,
        }?;

        info!("Dependencies installed");
        Ok(())
    }
}

/// Feed each line of `stream` to `f`, stopping at the first error.
///
/// Invalid UTF-8 is replaced rather than treated as end of stream. A read
/// error is returned as the failure message.
async fn for_each_line<R, F>(stream: R, mut f: F) -> Result<(), String>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str) -> Result<(), String>,
{
    let mut segments = BufReader::new(stream).split(b'\n');
    loop {
        let segment = match segments.next_segment().await {
            Ok(Some(segment)) => segment,
            Ok(None) => break,
            Err(e) => return Err(format!("failed to read command output: {e}")),
        };
        let line = String::from_utf8_lossy(&segment);
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        f(line)?;
    }
    Ok(())
}
