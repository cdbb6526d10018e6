//! Core types shared by every git-autoupdate module.
//!
//! Currently this is the error taxonomy ([`UpdateError`]) and the CLI-facing
//! [`ErrorContext`] wrapper produced by [`user_friendly_error`].

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
