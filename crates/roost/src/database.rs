//! The Database: one store, one local identity, one draft slot.
//!
//! `Database` is the long-lived context object every operation goes
//! through. It owns the store, holds the local signing key (derived from
//! the seed kept in config), and runs the verification pipeline for both
//! locally published and imported messages.

use bytes::Bytes;

use roost_core::canonical::{self, Fields};
use roost_core::{
    parse, tokenize, tokenize_unsigned, validation, BlobHash, BodyValue, Draft, Identity, Ingest,
    Keypair, Message, MessageHash, MessageRecord, SEED_LEN,
};
use roost_store::{
    InsertResult, SqliteStore, Store, StoreConfig, StoreError, StoreExt, DRAFT_KEY, SEED_KEY,
};

use crate::config::DatabaseConfig;
use crate::error::{DraftStateError, Result, RoostError};

/// The main Database struct.
///
/// Provides a unified API for:
/// - Managing peers and blocks
/// - Drafting and publishing messages
/// - Ingesting canonical text from other authors
/// - Querying logs and blobs
pub struct Database<S: Store> {
    /// The storage backend.
    store: S,
    /// The local identity's keypair.
    keypair: Keypair,
    /// Configuration.
    config: DatabaseConfig,
}

impl Database<SqliteStore> {
    /// Open a SQLite-backed database.
    pub fn open_sqlite(store_config: &StoreConfig, config: DatabaseConfig) -> Result<Self> {
        Self::open(SqliteStore::open_with(store_config)?, config)
    }
}

impl<S: Store> Database<S> {
    /// Open a database, deriving the local identity from the stored seed.
    ///
    /// A fresh store gets a newly generated seed.
    pub fn open(store: S, config: DatabaseConfig) -> Result<Self> {
        let keypair = match store.get_config(SEED_KEY)? {
            Some(seed) => keypair_from_seed(&seed)?,
            None => {
                let keypair = Keypair::generate();
                store.set_config(SEED_KEY, &keypair.seed())?;
                keypair
            }
        };
        tracing::debug!(identity = %keypair.identity(), "opened database");
        Ok(Self {
            store,
            keypair,
            config,
        })
    }

    /// Open a database with a given identity, replacing any stored seed.
    pub fn with_keypair(store: S, keypair: Keypair, config: DatabaseConfig) -> Result<Self> {
        store.set_config(SEED_KEY, &keypair.seed())?;
        Ok(Self {
            store,
            keypair,
            config,
        })
    }

    /// The local identity.
    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    /// The store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Peers
    // ─────────────────────────────────────────────────────────────────────────

    /// Follow a peer.
    pub fn add_peer(&self, peer: &Identity) -> Result<()> {
        Ok(self.store.add_peer(peer)?)
    }

    /// Stop following a peer.
    pub fn remove_peer(&self, peer: &Identity) -> Result<()> {
        Ok(self.store.remove_peer(peer)?)
    }

    /// Unfollow and block a peer. Its messages are dropped from now on.
    pub fn block_peer(&self, peer: &Identity) -> Result<()> {
        Ok(self.store.block_peer(peer)?)
    }

    /// Lift a block.
    pub fn unblock_peer(&self, peer: &Identity) -> Result<()> {
        Ok(self.store.unblock_peer(peer)?)
    }

    /// Followed peers, sorted.
    pub fn peers(&self) -> Result<Vec<Identity>> {
        Ok(self.store.peers()?)
    }

    /// Blocked identities, sorted.
    pub fn blocked(&self) -> Result<Vec<Identity>> {
        Ok(self.store.blocked()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a message by multihash.
    pub fn get_message(&self, hash: &MessageHash) -> Result<Option<Message>> {
        Ok(self.store.get_message(hash)?)
    }

    /// Number of messages stored for an author.
    pub fn message_count(&self, author: &Identity) -> Result<u64> {
        Ok(self.store.message_count(author)?)
    }

    /// An author's message at a depth.
    pub fn message_at(&self, author: &Identity, depth: u64) -> Result<Option<Message>> {
        Ok(self.store.message_at(author, depth)?)
    }

    /// An author's full log, in depth order.
    pub fn log(&self, author: &Identity) -> Result<Vec<Message>> {
        Ok(self.store.log(author)?)
    }

    /// Every stored message multihash.
    pub fn message_hashes(&self) -> Result<Vec<MessageHash>> {
        Ok(self.store.message_hashes()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blobs
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a blob, returning its hash.
    pub fn put_blob(&self, data: &[u8]) -> Result<BlobHash> {
        Ok(self.store.put_blob(data)?)
    }

    /// Get a blob by hash.
    pub fn get_blob(&self, hash: &BlobHash) -> Result<Option<Bytes>> {
        Ok(self.store.get_blob(hash)?)
    }

    /// Whether a blob is stored.
    pub fn has_blob(&self, hash: &BlobHash) -> Result<bool> {
        Ok(self.store.has_blob(hash)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Drafts
    // ─────────────────────────────────────────────────────────────────────────

    /// The in-flight draft, if any.
    pub fn current_draft(&self) -> Result<Option<Draft>> {
        match self.store.get_config(DRAFT_KEY)? {
            Some(bytes) => ciborium::from_reader(bytes.as_slice())
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string()).into()),
            None => Ok(None),
        }
    }

    /// Open a new draft. Fails if one is already open.
    pub fn new_draft(&self, kind: &str) -> Result<Draft> {
        if self.current_draft()?.is_some() {
            return Err(DraftStateError::AlreadyOpen.into());
        }
        let draft = Draft::new(kind)?;
        self.save_draft(&draft)?;
        Ok(draft)
    }

    /// Assign `key` in the open draft, returning the tagged value stored.
    pub fn update_draft(&self, key: &str, value: &str) -> Result<BodyValue> {
        let mut draft = self.require_draft()?;
        let stored = draft.set(key, value)?;
        self.save_draft(&draft)?;
        Ok(stored)
    }

    /// Render the open draft with placeholders for the publish-time fields.
    pub fn render_current_draft(&self) -> Result<String> {
        Ok(self.require_draft()?.render(&self.identity()))
    }

    /// Discard the open draft, if any.
    pub fn delete_current_draft(&self) -> Result<()> {
        Ok(self.store.delete_config(DRAFT_KEY)?)
    }

    /// Sign the open draft onto the local log and clear the draft slot.
    ///
    /// The signed text goes through the same lexer, parser and verification
    /// as imported messages. On failure the draft is left in place.
    pub fn publish_draft(&self) -> Result<Message> {
        let draft = self.require_draft()?;
        let author = self.identity();
        let head = self.store.chain_head(&author)?;

        let unsigned = canonical::render_unsigned(&Fields {
            author: &author,
            depth: head.count,
            kind: draft.kind(),
            prev: head.last.as_ref(),
            body: draft.body(),
        });
        let signature = self.keypair.sign(unsigned.as_bytes());
        let tokens = tokenize_unsigned(&unsigned, &signature)?;

        let message = parse(&mut self.pipeline(), tokens)?
            .pop()
            .ok_or_else(|| RoostError::AuthorBlocked(author.to_multihash()))?;

        self.store.delete_config(DRAFT_KEY)?;
        tracing::info!(
            message = %message.multihash(),
            depth = message.depth(),
            kind = message.kind(),
            "published message"
        );
        Ok(message)
    }

    /// Open a draft, assign every entry, and publish it.
    pub fn add_message<K, V>(&self, kind: &str, entries: impl IntoIterator<Item = (K, V)>) -> Result<Message>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.new_draft(kind)?;
        for (key, value) in entries {
            self.update_draft(key.as_ref(), value.as_ref())?;
        }
        self.publish_draft()
    }

    fn require_draft(&self) -> Result<Draft> {
        self.current_draft()?
            .ok_or_else(|| DraftStateError::NotFound.into())
    }

    fn save_draft(&self, draft: &Draft) -> Result<()> {
        let mut buf = Vec::new();
        ciborium::into_writer(draft, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(self.store.set_config(DRAFT_KEY, &buf)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingest
    // ─────────────────────────────────────────────────────────────────────────

    /// Lex, parse, verify and store canonical text.
    ///
    /// Returns the ingested messages in input order; already-known messages
    /// are included, messages by blocked authors are not.
    pub fn ingest_text(&self, text: &str) -> Result<Vec<Message>> {
        let tokens = tokenize(text)?;
        parse(&mut self.pipeline(), tokens)
    }

    /// Verify one record and store it.
    ///
    /// 1. A known multihash returns the stored copy.
    /// 2. A blocked author fails with [`RoostError::AuthorBlocked`].
    /// 3. The body size, chain position and signature are checked.
    /// 4. The frozen message is inserted.
    pub fn ingest_record(&self, record: MessageRecord) -> Result<Message> {
        let hash = record.multihash();
        if let Some(existing) = self.store.get_message(&hash)? {
            tracing::debug!(message = %hash, "message already known");
            return Ok(existing);
        }

        if self.store.is_blocked(&record.author)? {
            tracing::warn!(author = %record.author, "refusing message from blocked author");
            return Err(RoostError::AuthorBlocked(record.author.to_multihash()));
        }

        let head = self.store.chain_head(&record.author)?;
        let message = validation::verify_record(record, &head)?;

        match self.store.insert_message(&message)? {
            InsertResult::Inserted => {
                tracing::debug!(
                    message = %hash,
                    author = %message.author(),
                    depth = message.depth(),
                    "ingested message"
                );
            }
            InsertResult::AlreadyExists => {}
            InsertResult::Blocked => {
                tracing::warn!(author = %message.author(), "author blocked during ingest");
                return Err(RoostError::AuthorBlocked(message.author().to_multihash()));
            }
        }
        Ok(message)
    }

    fn pipeline(&self) -> Pipeline<'_, S> {
        Pipeline { db: self }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Wipe the store and start over with a new identity.
    pub fn reset_database(&mut self) -> Result<()> {
        self.store.reset()?;
        let keypair = Keypair::generate();
        self.store.set_config(SEED_KEY, &keypair.seed())?;
        tracing::info!(identity = %keypair.identity(), "reset database");
        self.keypair = keypair;
        Ok(())
    }
}

/// Parser sink that feeds records through [`Database::ingest_record`].
struct Pipeline<'a, S: Store> {
    db: &'a Database<S>,
}

impl<S: Store> Ingest for Pipeline<'_, S> {
    type Error = RoostError;

    fn is_blocked(&self, author: &Identity) -> Result<bool> {
        let blocked = self.db.store.is_blocked(author)?;
        if blocked {
            tracing::warn!(%author, "dropping message from blocked author");
        }
        Ok(blocked)
    }

    fn ingest(&mut self, record: MessageRecord) -> Result<Message> {
        self.db.ingest_record(record)
    }
}

fn keypair_from_seed(seed: &[u8]) -> Result<Keypair> {
    let seed: [u8; SEED_LEN] = seed.try_into().map_err(|_| {
        StoreError::InvalidData(format!("seed is {} bytes, expected {SEED_LEN}", seed.len()))
    })?;
    Ok(Keypair::from_seed(&seed))
}
