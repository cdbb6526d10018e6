//! Error handling for git-autoupdate
//!
//! This module provides the typed error taxonomy used by every stage of the
//! update flow, and user-friendly error reporting for the command-line host.
//! The error system follows two principles:
//! 1. **Strongly-typed errors** so embedders can match on the failure reason
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`UpdateError`] - One variant per failure class of the update flow
//! - [`ErrorContext`] - Wrapper that adds suggestions and details for display
//!
//! # Error Categories
//!
//! - **Construction**: [`UpdateError::Config`]
//! - **Remote lookups**: [`UpdateError::NotFoundOrPrivate`], [`UpdateError::Request`],
//!   [`UpdateError::Parse`], [`UpdateError::UnsupportedHost`],
//!   [`UpdateError::ReleaseResolution`]
//! - **Local state**: [`UpdateError::LocalRead`]
//! - **Pipeline stages**: [`UpdateError::Clone`], [`UpdateError::Backup`],
//!   [`UpdateError::Purge`], [`UpdateError::Install`],
//!   [`UpdateError::DependencyInstall`], [`UpdateError::PostAction`]
//!
//! Every variant carries owned strings only, so the error is `Clone` and can be
//! stored in the readiness gate and handed to several waiters.
//!
//! # Examples
//!
//! ```rust,no_run
//! use git_autoupdate::core::{UpdateError, user_friendly_error};
//!
//! let error = UpdateError::NotFoundOrPrivate {
//!     url: "https://raw.githubusercontent.com/owner/app/master/package.json".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for update operations.
///
/// Construction-time failures ([`UpdateError::Config`]) are returned to the
/// caller directly. Everything else is produced while comparing versions or
/// running the pipeline; the facade logs those and converts them into a
/// `false` / sentinel result, while the `try_*` methods hand them back as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// Invalid or incomplete configuration, detected before any I/O happens
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// The remote answered 404: wrong token, or the repository does not exist
    #[error("Remote resource not found (wrong token or repository does not exist): {url}")]
    NotFoundOrPrivate {
        /// Requested URL (credentials stripped)
        url: String,
    },

    /// Transport failure or unexpected HTTP status
    #[error("Request to {url} failed: {reason}")]
    Request {
        /// Requested URL (credentials stripped)
        url: String,
        /// Transport error or status description
        reason: String,
    },

    /// A response body was not valid JSON or lacked the expected field
    #[error("Failed to parse {what}: {reason}")]
    Parse {
        /// Description of the document being parsed
        what: String,
        /// Parser message
        reason: String,
    },

    /// The local manifest could not be read or has no version
    #[error("Failed to read local manifest {path}: {reason}")]
    LocalRead {
        /// Manifest path
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Cloning the update into the workspace failed
    #[error("Failed to clone {url} at '{reference}': {reason}")]
    Clone {
        /// Repository URL (credentials stripped)
        url: String,
        /// Branch or tag being cloned
        reference: String,
        /// Underlying failure
        reason: String,
    },

    /// Copying the live application into the backup directory failed
    #[error("Failed to back up application: {reason}")]
    Backup {
        /// Underlying failure
        reason: String,
    },

    /// An ignore path could not be removed from the cloned update
    #[error("Failed to purge ignored path '{path}': {reason}")]
    Purge {
        /// Relative ignore path as configured
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Copying the cloned update over the live application failed
    #[error("Failed to install update: {reason}")]
    Install {
        /// Underlying failure
        reason: String,
    },

    /// The dependency install command reported an error
    #[error("Dependency installation failed: {reason}")]
    DependencyInstall {
        /// Offending diagnostic line or process failure
        reason: String,
    },

    /// The completion command could not be launched
    #[error("Failed to launch completion command '{command}': {reason}")]
    PostAction {
        /// The configured command
        command: String,
        /// Underlying failure
        reason: String,
    },

    /// Release-based resolution only works against recognized hosts
    #[error("Unsupported repository host for release lookup: {repository}")]
    UnsupportedHost {
        /// The configured repository
        repository: String,
    },

    /// The release tag task failed or did not finish in time
    #[error("Latest release could not be resolved: {reason}")]
    ReleaseResolution {
        /// Underlying failure
        reason: String,
    },
}

impl UpdateError {
    /// Shorthand for [`UpdateError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error was raised while validating configuration.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// `ErrorContext` wraps an [`UpdateError`] and adds optional suggestions and
/// details. It is what the command-line host prints when an operation fails.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion attached.
///
/// Typed [`UpdateError`]s get a variant-specific hint. Configuration file
/// errors from `toml` are reported as [`UpdateError::Config`]. Anything else is
/// wrapped as a configuration-level failure carrying the full error chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.downcast_ref::<UpdateError>() {
        return create_error_context(update_error.clone());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(UpdateError::config(toml_error.to_string()))
            .with_suggestion("Check the TOML syntax of the updater configuration file")
            .with_details("Required keys are `repository` and `temp_location`");
    }

    ErrorContext::new(UpdateError::config(format!("{error:#}")))
}

fn create_error_context(error: UpdateError) -> ErrorContext {
    match &error {
        UpdateError::Config { .. } => ErrorContext::new(error).with_suggestion(
            "Set both `repository` and `temp_location`, and keep the temp location outside the application directory",
        ),
        UpdateError::NotFoundOrPrivate { .. } => ErrorContext::new(error)
            .with_suggestion("Check the repository URL and branch, or configure an access token for private repositories")
            .with_details("The remote answered 404, which is also what private repositories return without a valid token"),
        UpdateError::Request { .. } => ErrorContext::new(error)
            .with_suggestion("Check your network connection and try again"),
        UpdateError::Parse { .. } => ErrorContext::new(error)
            .with_suggestion("Make sure the remote manifest is valid JSON with a string `version` field"),
        UpdateError::LocalRead { .. } => ErrorContext::new(error)
            .with_suggestion("Make sure the application manifest exists and has a string `version` field"),
        UpdateError::Clone { .. } => ErrorContext::new(error)
            .with_suggestion("Check that git is installed, the reference exists and the token has read access")
            .with_details("No application files were modified"),
        UpdateError::Backup { .. } => ErrorContext::new(error)
            .with_suggestion("Check free disk space and permissions of the temp location")
            .with_details("No application files were modified"),
        UpdateError::Purge { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the `ignore_files` entries or disable `strict_ignore_files`"),
        UpdateError::Install { .. } => ErrorContext::new(error)
            .with_suggestion("Restore the previous version with `git-autoupdate --rollback`")
            .with_details("The application directory may be partially updated"),
        UpdateError::DependencyInstall { .. } => ErrorContext::new(error)
            .with_suggestion("Run the install command manually in the application directory to inspect the output"),
        UpdateError::PostAction { .. } => ErrorContext::new(error)
            .with_suggestion("Check the `execute_on_complete` command"),
        UpdateError::UnsupportedHost { .. } => ErrorContext::new(error)
            .with_suggestion("Release-based updates require a github.com repository; use `branch` instead"),
        UpdateError::ReleaseResolution { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the repository has a published release and the token is valid"),
    }
}
