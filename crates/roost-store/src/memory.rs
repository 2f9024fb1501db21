//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything (blobs included) in memory with no persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;

use roost_core::{BlobHash, Identity, Message, MessageHash};

use crate::blob::check_size;
use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    config: HashMap<String, Vec<u8>>,
    peers: BTreeSet<Identity>,
    blocked: BTreeSet<Identity>,

    /// Messages indexed by multihash.
    messages: HashMap<MessageHash, Message>,

    /// Position index: (author, depth) -> multihash.
    positions: HashMap<(Identity, u64), MessageHash>,

    counts: HashMap<Identity, u64>,
    blobs: HashMap<BlobHash, Bytes>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get_config(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.config.get(key).cloned())
    }

    fn set_config(&self, key: &str, value: &[u8]) -> Result<()> {
        self.write()?.config.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete_config(&self, key: &str) -> Result<()> {
        self.write()?.config.remove(key);
        Ok(())
    }

    fn add_peer(&self, peer: &Identity) -> Result<()> {
        self.write()?.peers.insert(*peer);
        Ok(())
    }

    fn remove_peer(&self, peer: &Identity) -> Result<()> {
        self.write()?.peers.remove(peer);
        Ok(())
    }

    fn block_peer(&self, peer: &Identity) -> Result<()> {
        let mut inner = self.write()?;
        inner.peers.remove(peer);
        inner.blocked.insert(*peer);
        Ok(())
    }

    fn unblock_peer(&self, peer: &Identity) -> Result<()> {
        self.write()?.blocked.remove(peer);
        Ok(())
    }

    fn peers(&self) -> Result<Vec<Identity>> {
        Ok(self.read()?.peers.iter().copied().collect())
    }

    fn blocked(&self) -> Result<Vec<Identity>> {
        Ok(self.read()?.blocked.iter().copied().collect())
    }

    fn is_blocked(&self, peer: &Identity) -> Result<bool> {
        Ok(self.read()?.blocked.contains(peer))
    }

    fn insert_message(&self, message: &Message) -> Result<InsertResult> {
        let mut inner = self.write()?;

        let hash = message.multihash();
        let author = *message.author();
        let depth = message.depth();

        if inner.messages.contains_key(&hash) {
            return Ok(InsertResult::AlreadyExists);
        }

        if inner.blocked.contains(&author) {
            return Ok(InsertResult::Blocked);
        }

        if let Some(existing) = inner.positions.get(&(author, depth)) {
            return Err(StoreError::Conflict {
                author: author.to_multihash(),
                depth,
                existing: existing.to_multihash(),
            });
        }

        inner.messages.insert(hash, message.clone());
        inner.positions.insert((author, depth), hash);
        let count = inner.counts.entry(author).or_insert(0);
        *count = (*count).max(depth + 1);

        tracing::debug!(message = %hash, %author, depth, "inserted message");
        Ok(InsertResult::Inserted)
    }

    fn get_message(&self, hash: &MessageHash) -> Result<Option<Message>> {
        Ok(self.read()?.messages.get(hash).cloned())
    }

    fn has_message(&self, hash: &MessageHash) -> Result<bool> {
        Ok(self.read()?.messages.contains_key(hash))
    }

    fn message_count(&self, author: &Identity) -> Result<u64> {
        Ok(self.read()?.counts.get(author).copied().unwrap_or(0))
    }

    fn message_at(&self, author: &Identity, depth: u64) -> Result<Option<Message>> {
        let inner = self.read()?;
        Ok(inner
            .positions
            .get(&(*author, depth))
            .and_then(|hash| inner.messages.get(hash))
            .cloned())
    }

    fn message_hashes(&self) -> Result<Vec<MessageHash>> {
        let mut hashes: Vec<_> = self.read()?.messages.keys().copied().collect();
        hashes.sort();
        Ok(hashes)
    }

    fn put_blob(&self, data: &[u8]) -> Result<BlobHash> {
        check_size(data)?;
        let hash = BlobHash::digest(data);
        self.write()?
            .blobs
            .entry(hash)
            .or_insert_with(|| Bytes::copy_from_slice(data));
        Ok(hash)
    }

    fn get_blob(&self, hash: &BlobHash) -> Result<Option<Bytes>> {
        Ok(self.read()?.blobs.get(hash).cloned())
    }

    fn has_blob(&self, hash: &BlobHash) -> Result<bool> {
        Ok(self.read()?.blobs.contains_key(hash))
    }

    fn reset(&self) -> Result<()> {
        *self.write()? = MemoryStoreInner::default();
        Ok(())
    }
}
