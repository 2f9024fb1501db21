//! Store trait: the abstract interface for Roost persistence.
//!
//! This trait allows the database layer to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use bytes::Bytes;
use roost_core::{BlobHash, ChainHead, Identity, Message, MessageHash};

use crate::error::{Result, StoreError};

/// Config key holding the local identity's seed.
pub const SEED_KEY: &str = "SEED";

/// Config key holding the in-flight draft.
pub const DRAFT_KEY: &str = "HEAD.draft";

/// Result of inserting a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Message was inserted.
    Inserted,
    /// Message already exists (idempotent, not an error).
    AlreadyExists,
    /// The author is blocked; nothing was written.
    Blocked,
}

/// The Store trait: interface for message, peer, blob and config persistence.
///
/// Methods take `&self`; implementations use interior mutability. Every
/// mutating call is atomic: the message, its depth index entry and the
/// author's count change together or not at all.
///
/// # Design Notes
///
/// - **Idempotent inserts**: Inserting the same message twice returns `AlreadyExists`.
/// - **Conflict detection**: Inserting a different message at an occupied
///   (author, depth) fails with [`StoreError::Conflict`](crate::StoreError::Conflict).
/// - **Blocking**: Blocking a peer removes it from the peer set; inserts
///   from blocked authors are skipped.
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Config
    // ─────────────────────────────────────────────────────────────────────────

    /// Read a config value.
    fn get_config(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a config value, replacing any previous one.
    fn set_config(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove a config value. Removing a missing key is not an error.
    fn delete_config(&self, key: &str) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Peers
    // ─────────────────────────────────────────────────────────────────────────

    /// Follow a peer.
    fn add_peer(&self, peer: &Identity) -> Result<()>;

    /// Stop following a peer.
    fn remove_peer(&self, peer: &Identity) -> Result<()>;

    /// Remove a peer from the peer set and add it to the block set.
    fn block_peer(&self, peer: &Identity) -> Result<()>;

    /// Remove an identity from the block set.
    fn unblock_peer(&self, peer: &Identity) -> Result<()>;

    /// Followed peers, sorted.
    fn peers(&self) -> Result<Vec<Identity>>;

    /// Blocked identities, sorted.
    fn blocked(&self) -> Result<Vec<Identity>>;

    /// Whether an identity is blocked.
    fn is_blocked(&self, peer: &Identity) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a verified message.
    ///
    /// # Returns
    /// - `Inserted` if the message was new.
    /// - `AlreadyExists` if the exact same message already exists.
    /// - `Blocked` if the author is blocked.
    fn insert_message(&self, message: &Message) -> Result<InsertResult>;

    /// Get a message by multihash.
    fn get_message(&self, hash: &MessageHash) -> Result<Option<Message>>;

    /// Check if a message exists.
    fn has_message(&self, hash: &MessageHash) -> Result<bool>;

    /// Number of messages stored for an author.
    fn message_count(&self, author: &Identity) -> Result<u64>;

    /// Get an author's message at a depth.
    fn message_at(&self, author: &Identity, depth: u64) -> Result<Option<Message>>;

    /// Every stored message multihash, across all authors.
    fn message_hashes(&self) -> Result<Vec<MessageHash>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Blobs
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a blob, returning its hash. Storing a known blob is a no-op.
    fn put_blob(&self, data: &[u8]) -> Result<BlobHash>;

    /// Get a blob by hash.
    fn get_blob(&self, hash: &BlobHash) -> Result<Option<Bytes>>;

    /// Check if a blob exists.
    fn has_blob(&self, hash: &BlobHash) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Wipe every collection and blob, leaving an empty store.
    fn reset(&self) -> Result<()>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Where an author's log currently ends.
    fn chain_head(&self, author: &Identity) -> Result<ChainHead>;

    /// An author's full log, in depth order.
    fn log(&self, author: &Identity) -> Result<Vec<Message>>;
}

impl<S: Store + ?Sized> StoreExt for S {
    fn chain_head(&self, author: &Identity) -> Result<ChainHead> {
        let count = self.message_count(author)?;
        let last = match count.checked_sub(1) {
            Some(depth) => {
                let message = self.message_at(author, depth)?.ok_or_else(|| {
                    StoreError::InvalidData(format!("{author} has no message at depth {depth}"))
                })?;
                Some(message.multihash())
            }
            None => None,
        };
        Ok(ChainHead { count, last })
    }

    fn log(&self, author: &Identity) -> Result<Vec<Message>> {
        let count = self.message_count(author)?;
        let mut messages = Vec::with_capacity(count as usize);
        for depth in 0..count {
            if let Some(message) = self.message_at(author, depth)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }
}
