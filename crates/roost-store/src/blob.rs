//! Content-addressed blob files.
//!
//! A blob lives at a path derived from the 52 base32 symbols of its digest:
//!
//! ```text
//! <root>/d[0]/d[1..9]/d[9..17]/d[17..25]/d[25..33]/d[33..41]/d[41..49].d[49..52]
//! ```

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use roost_core::{BlobHash, BLOB_BYTE_LIMIT};

use crate::error::{Result, StoreError};

/// A directory tree of blobs sharded by digest.
#[derive(Debug, Clone)]
pub struct BlobTree {
    root: PathBuf,
}

impl BlobTree {
    /// Use `root` as the tree's top directory. Nothing is created until the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The tree's top directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a blob with this hash is stored.
    pub fn path_for(&self, hash: &BlobHash) -> PathBuf {
        let d = hash.to_base32();
        let mut path = self.root.clone();
        for shard in [&d[0..1], &d[1..9], &d[9..17], &d[17..25], &d[25..33], &d[33..41]] {
            path.push(shard);
        }
        path.push(format!("{}.{}", &d[41..49], &d[49..52]));
        path
    }

    /// Write a blob unless an intact copy is already present.
    ///
    /// The bytes go to a temporary file that is synced and then renamed
    /// into place, so a crash never leaves a partial blob at its address.
    /// A file at the address whose digest does not match is replaced.
    pub fn put(&self, data: &[u8]) -> Result<BlobHash> {
        check_size(data)?;
        let hash = BlobHash::digest(data);
        let path = self.path_for(&hash);
        if self.get(&hash)?.is_some() {
            return Ok(hash);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        {
            let mut file = File::create(&temp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &path)?;

        tracing::debug!(blob = %hash, bytes = data.len(), "wrote blob");
        Ok(hash)
    }

    /// Read a blob. A file whose contents no longer match its digest is
    /// treated as absent.
    pub fn get(&self, hash: &BlobHash) -> Result<Option<Bytes>> {
        let path = self.path_for(hash);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if BlobHash::digest(&data) != *hash {
            tracing::warn!(blob = %hash, path = %path.display(), "blob file is corrupt");
            return Ok(None);
        }
        Ok(Some(Bytes::from(data)))
    }

    /// Whether an intact copy of a blob is present.
    pub fn has(&self, hash: &BlobHash) -> Result<bool> {
        Ok(self.get(hash)?.is_some())
    }

    /// Remove every blob.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reject blobs over [`BLOB_BYTE_LIMIT`].
pub fn check_size(data: &[u8]) -> Result<()> {
    if data.len() > BLOB_BYTE_LIMIT {
        return Err(StoreError::BlobTooLarge {
            size: data.len(),
            limit: BLOB_BYTE_LIMIT,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let tree = BlobTree::new("/blobs");
        let hash = BlobHash::digest(b"hello");
        let d = hash.to_base32();
        let path = tree.path_for(&hash);

        let expected = format!(
            "/blobs/{}/{}/{}/{}/{}/{}/{}.{}",
            &d[0..1],
            &d[1..9],
            &d[9..17],
            &d[17..25],
            &d[25..33],
            &d[33..41],
            &d[41..49],
            &d[49..52]
        );
        assert_eq!(path, PathBuf::from(expected));
    }

    #[test]
    fn test_put_get() {
        let dir = tempfile::tempdir().unwrap();
        let tree = BlobTree::new(dir.path().join("blobs"));

        let hash = tree.put(b"some bytes").unwrap();
        assert!(tree.has(&hash).unwrap());
        assert_eq!(tree.get(&hash).unwrap().unwrap(), Bytes::from_static(b"some bytes"));

        // Second write is skipped.
        assert_eq!(tree.put(b"some bytes").unwrap(), hash);
    }

    #[test]
    fn test_truncated_file_is_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let tree = BlobTree::new(dir.path().join("blobs"));
        let full = b"the whole picture".to_vec();
        let hash = BlobHash::digest(&full);

        // Leftover of a write that died halfway.
        let path = tree.path_for(&hash);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, &full[..4]).unwrap();
        assert!(tree.get(&hash).unwrap().is_none());
        assert!(!tree.has(&hash).unwrap());

        assert_eq!(tree.put(&full).unwrap(), hash);
        assert_eq!(tree.get(&hash).unwrap().unwrap(), Bytes::from(full));

        let mut temp = path.into_os_string();
        temp.push(".tmp");
        assert!(!PathBuf::from(temp).exists());
    }

    #[test]
    fn test_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let tree = BlobTree::new(dir.path());
        let hash = BlobHash::digest(b"absent");
        assert!(!tree.has(&hash).unwrap());
        assert!(tree.get(&hash).unwrap().is_none());
    }

    #[test]
    fn test_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let tree = BlobTree::new(dir.path());

        let exact = vec![0x5a; BLOB_BYTE_LIMIT];
        let hash = tree.put(&exact).unwrap();
        assert_eq!(tree.get(&hash).unwrap().unwrap().len(), BLOB_BYTE_LIMIT);

        let over = vec![0x5a; BLOB_BYTE_LIMIT + 1];
        assert!(matches!(
            tree.put(&over),
            Err(StoreError::BlobTooLarge { size, limit }) if size == BLOB_BYTE_LIMIT + 1 && limit == BLOB_BYTE_LIMIT
        ));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let tree = BlobTree::new(dir.path().join("blobs"));
        let hash = tree.put(b"gone soon").unwrap();

        tree.clear().unwrap();
        assert!(!tree.has(&hash).unwrap());
        // Clearing an absent tree is fine.
        tree.clear().unwrap();
    }
}
