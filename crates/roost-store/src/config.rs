//! Store configuration.

use std::path::PathBuf;

/// Where a [`SqliteStore`](crate::SqliteStore) keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Root of the blob tree.
    pub blob_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("roost.db"),
            blob_dir: PathBuf::from("roost_blobs"),
        }
    }
}

impl StoreConfig {
    /// Database and blob tree side by side under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let defaults = Self::default();
        Self {
            db_path: dir.join(defaults.db_path),
            blob_dir: dir.join(defaults.blob_dir),
        }
    }
}
