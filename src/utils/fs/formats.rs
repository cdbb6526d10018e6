//! Reading structured documents from disk.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reads a text file with path context attached to the error.
pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Reads and deserializes a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its content does not
/// deserialize into `T`.
pub fn read_json_file<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = read_text_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from file: {}", path.display()))
}
