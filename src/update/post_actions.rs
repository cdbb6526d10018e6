//! Post-update actions: launch the completion command, then optionally exit.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::core::UpdateError;
use crate::utils::platform::shell_command;

/// Status the process exits with after an update when `exit_on_complete` is set.
pub const UPDATE_EXIT_STATUS: i32 = 1;

/// Terminates the process. Replaceable so embedders and tests can intercept the exit.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// [`ExitHook`] calling [`std::process::exit`].
#[must_use]
pub fn process_exit_hook() -> ExitHook {
    Arc::new(|code| std::process::exit(code))
}

/// Launches the completion command and handles exit-on-complete.
#[derive(Clone)]
pub struct PostActions {
    command: Option<String>,
    working_dir: PathBuf,
    grace: Duration,
    exit_on_complete: bool,
    exit_hook: ExitHook,
}

impl std::fmt::Debug for PostActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostActions")
            .field("command", &self.command)
            .field("working_dir", &self.working_dir)
            .field("grace", &self.grace)
            .field("exit_on_complete", &self.exit_on_complete)
            .finish_non_exhaustive()
    }
}

impl PostActions {
    /// Post actions running `command` (if any) from `working_dir`.
    #[must_use]
    pub fn new(command: Option<String>, working_dir: PathBuf) -> Self {
        Self {
            command,
            working_dir,
            grace: Duration::from_secs(1),
            exit_on_complete: false,
            exit_hook: process_exit_hook(),
        }
    }

    /// How long to wait after launching the command.
    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Exit through `hook` once the command has been launched.
    #[must_use]
    pub fn exit_on_complete(mut self, enabled: bool, hook: ExitHook) -> Self {
        self.exit_on_complete = enabled;
        self.exit_hook = hook;
        self
    }

    /// Launch the command without waiting for it, sleep for the grace period,
    /// then exit if configured.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::PostAction`] if the command cannot be spawned.
    /// In that case the process does not exit.
    pub async fn run(&self) -> Result<(), UpdateError> {
        if let Some(command) = &self.command {
            self.launch_detached(command)?;
            tokio::time::sleep(self.grace).await;
        }

        if self.exit_on_complete {
            info!("Update complete, exiting with status {UPDATE_EXIT_STATUS}");
            (self.exit_hook)(UPDATE_EXIT_STATUS);
        }
        Ok(())
    }

    fn launch_detached(&self, command: &str) -> Result<(), UpdateError> {
        info!("Launching `{command}`");

        let mut cmd = shell_command(command);
        cmd.current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        cmd.process_group(0);

        // Dropping the handle neither waits for nor kills the child.
        let _child = cmd.spawn().map_err(|e| UpdateError::PostAction {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
