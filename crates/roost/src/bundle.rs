//! Bundle export and import.
//!
//! A bundle is a directory holding one text file of concatenated canonical
//! messages plus loose blob files. Blob files are named after a shard of
//! the blob's digest (`d[0..4] + d[48..52]`), or the full digest when two
//! blobs in one export share a short name. Import identifies them by hashing
//! their contents, so the name is only a hint.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use roost_core::{render_bundle, BlobHash, Message, BLOB_BYTE_LIMIT};
use roost_store::Store;

use crate::database::Database;
use crate::error::Result;

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    /// Path of the bundle text file.
    pub bundle_path: PathBuf,
    /// Number of messages in the bundle.
    pub messages: usize,
    /// Number of blob files written.
    pub blobs: usize,
}

/// Loose file name for a blob: first four and last four digest symbols.
pub fn blob_file_name(hash: &BlobHash, extension: &str) -> String {
    let d = hash.to_base32();
    format!("{}{}.{}", &d[0..4], &d[48..52], extension)
}

/// File names for a set of blobs written side by side.
///
/// A blob whose short name is already taken falls back to its full digest.
pub fn blob_file_names(hashes: &[BlobHash], extension: &str) -> Vec<String> {
    let mut taken = HashSet::new();
    hashes
        .iter()
        .map(|hash| {
            let mut name = blob_file_name(hash, extension);
            if !taken.insert(name.clone()) {
                tracing::warn!(blob = %hash, %name, "blob file name taken, using full digest");
                name = format!("{}.{}", hash.to_base32(), extension);
                taken.insert(name.clone());
            }
            name
        })
        .collect()
}

/// Every blob referenced by `messages`, deduplicated in order of appearance.
pub fn referenced_blobs<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Vec<BlobHash> {
    let mut seen = HashSet::new();
    let mut blobs = Vec::new();
    for message in messages {
        for hash in message.blobs() {
            if seen.insert(hash) {
                blobs.push(hash);
            }
        }
    }
    blobs
}

impl<S: Store> Database<S> {
    /// Write every followed peer's log and then the local log into `dir`,
    /// along with each referenced blob this database holds.
    pub fn export_bundle(&self, dir: impl AsRef<Path>) -> Result<BundleReport> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let local = self.identity();
        let mut authors = self.peers()?;
        authors.retain(|peer| *peer != local);
        authors.push(local);

        let mut messages = Vec::new();
        for author in &authors {
            messages.extend(self.log(author)?);
        }

        let mut stored = Vec::new();
        for hash in referenced_blobs(&messages) {
            match self.get_blob(&hash)? {
                Some(data) => stored.push((hash, data)),
                None => tracing::warn!(blob = %hash, "referenced blob not stored, skipping"),
            }
        }

        let hashes: Vec<_> = stored.iter().map(|(hash, _)| *hash).collect();
        let names = blob_file_names(&hashes, &self.config().blob_file_extension);
        for ((_, data), name) in stored.iter().zip(&names) {
            fs::write(dir.join(name), data)?;
        }
        let blobs = stored.len();

        let bundle_path = dir.join(&self.config().bundle_file);
        fs::write(&bundle_path, render_bundle(&messages))?;

        tracing::info!(
            path = %bundle_path.display(),
            authors = authors.len(),
            messages = messages.len(),
            blobs,
            "exported bundle"
        );
        Ok(BundleReport {
            bundle_path,
            messages: messages.len(),
            blobs,
        })
    }

    /// Ingest the bundle in `dir`, then adopt every loose file whose digest
    /// matches a blob the ingested messages reference.
    ///
    /// Returns the ingested messages.
    pub fn import_bundle(&self, dir: impl AsRef<Path>) -> Result<Vec<Message>> {
        let dir = dir.as_ref();
        let text = fs::read_to_string(dir.join(&self.config().bundle_file))?;
        let messages = self.ingest_text(&text)?;

        let wanted: HashSet<BlobHash> = referenced_blobs(&messages).into_iter().collect();
        let mut adopted = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !self.is_blob_file(&path) {
                continue;
            }

            let size = entry.metadata()?.len();
            if size > BLOB_BYTE_LIMIT as u64 {
                tracing::warn!(path = %path.display(), size, "ignoring oversized blob file");
                continue;
            }

            let data = fs::read(&path)?;
            let hash = BlobHash::digest(&data);
            if !wanted.contains(&hash) {
                tracing::warn!(path = %path.display(), "ignoring unreferenced blob file");
                continue;
            }
            if !self.has_blob(&hash)? {
                self.put_blob(&data)?;
                adopted += 1;
            }
        }

        tracing::info!(
            path = %dir.display(),
            messages = messages.len(),
            blobs = adopted,
            "imported bundle"
        );
        Ok(messages)
    }

    fn is_blob_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.config().blob_file_extension))
    }
}
