//! Configuration for git-autoupdate.
//!
//! An [`UpdaterConfig`] is built once (in code or from a TOML file) and is
//! immutable afterwards: the updater keeps it behind an `Arc` and never writes
//! to it. The only value resolved at runtime, the latest release tag, lives in
//! the readiness gate instead (see [`crate::update::readiness`]).
//!
//! # TOML Example
//!
//! ```toml
//! repository = "https://github.com/owner/app"
//! branch = "main"
//! temp_location = "~/.cache/app-updates"
//! ignore_files = ["config.json", ".env"]
//! execute_on_complete = "systemctl --user restart app"
//! exit_on_complete = true
//!
//! [log]
//! level = "debug"
//! ```

mod logger;
mod updater;

pub use logger::LoggerConfig;
pub use updater::{
    DEFAULT_BRANCH, DEFAULT_INSTALL_COMMAND, DEFAULT_MANIFEST_FILE, DEVELOPMENT_ENV, Token,
    UpdaterConfig,
};
