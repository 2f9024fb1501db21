//! Database configuration.

use std::path::PathBuf;

/// Settings for a [`Database`](crate::Database).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Name of the bundle text file inside a bundle directory.
    pub bundle_file: PathBuf,
    /// Extension of loose blob files in a bundle directory (without the dot).
    /// Matched case-insensitively on import.
    pub blob_file_extension: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            bundle_file: PathBuf::from("messages.bundle"),
            blob_file_extension: "blb".to_string(),
        }
    }
}
