//! File system utilities.
//!
//! All functions here are synchronous and return `anyhow::Result` with path
//! context attached. Pipeline stages call them through
//! `tokio::task::spawn_blocking` because a recursive copy of an application
//! tree can take a while.
//!
//! # Modules
//!
//! - [`dirs`] - Ensure, empty, copy and remove directories
//! - [`formats`] - Reading JSON documents

pub mod dirs;
pub mod formats;

pub use dirs::{CopyOptions, copy_dir, empty_dir, ensure_dir, remove_dir_all, remove_path};
pub use formats::{read_json_file, read_text_file};
