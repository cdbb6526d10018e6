//! Cross-platform utilities used by the update pipeline.
//!
//! - [`fs`] - Directory copy/empty/remove primitives and JSON file reading
//! - [`platform`] - Platform detection, shell invocation and path expansion

pub mod fs;
pub mod platform;

pub use fs::{CopyOptions, copy_dir, empty_dir, ensure_dir, read_json_file, remove_path};
pub use platform::{get_git_command, is_windows, resolve_path, shell_command};
