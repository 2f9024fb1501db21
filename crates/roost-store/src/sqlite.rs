//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Roost. It uses rusqlite with
//! bundled SQLite behind a mutex; every mutating call runs in one transaction.
//! Blobs live in a [`BlobTree`] next to the database.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use roost_core::{
    Body, BlobHash, CoreError, Identity, Message, MessageHash, MessageRecord, Signature,
};

use crate::blob::BlobTree;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::migration::{self, DATA_TABLES};
use crate::traits::{InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Mutex<Connection>,
    blobs: BlobTree,
}

impl SqliteStore {
    /// Open a SQLite database at `db_path`, keeping blobs under `blob_dir`.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(db_path: impl AsRef<Path>, blob_dir: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            blobs: BlobTree::new(blob_dir.as_ref()),
        })
    }

    /// Open the database and blob tree named by a [`StoreConfig`].
    pub fn open_with(config: &StoreConfig) -> Result<Self> {
        Self::open(&config.db_path, &config.blob_dir)
    }

    /// Open an in-memory SQLite database. Blobs still go to `blob_dir`.
    ///
    /// Useful for testing.
    pub fn open_memory(blob_dir: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            blobs: BlobTree::new(blob_dir.as_ref()),
        })
    }

    /// The blob tree backing this store.
    pub fn blob_tree(&self) -> &BlobTree {
        &self.blobs
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    /// Run a read on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` in a transaction, committing only if it succeeds.
    fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Raw columns of a `messages` row.
struct MessageRow {
    author: String,
    depth: i64,
    kind: String,
    prev: Option<String>,
    body: Vec<u8>,
    signature: String,
}

const MESSAGE_COLUMNS: &str = "author, depth, kind, prev, body, signature";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        author: row.get("author")?,
        depth: row.get("depth")?,
        kind: row.get("kind")?,
        prev: row.get("prev")?,
        body: row.get("body")?,
        signature: row.get("signature")?,
    })
}

impl MessageRow {
    fn into_message(self) -> Result<Message> {
        let invalid = |e: CoreError| StoreError::InvalidData(e.to_string());
        let body: Body = ciborium::from_reader(self.body.as_slice())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let depth = u64::try_from(self.depth)
            .map_err(|_| StoreError::InvalidData(format!("negative depth {}", self.depth)))?;

        Ok(Message::from_trusted(MessageRecord {
            author: Identity::parse(&self.author).map_err(invalid)?,
            depth,
            kind: self.kind,
            prev: self
                .prev
                .map(|p| MessageHash::parse(&p))
                .transpose()
                .map_err(invalid)?,
            body,
            signature: Signature::parse(&self.signature).map_err(invalid)?,
        }))
    }
}

fn encode_body(body: &Body) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(body, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn identities(conn: &Connection, sql: &str) -> Result<Vec<Identity>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.iter()
        .map(|text| Identity::parse(text).map_err(|e| StoreError::InvalidData(e.to_string())))
        .collect()
}

impl Store for SqliteStore {
    fn get_config(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
    }

    fn set_config(&self, key: &str, value: &[u8]) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO config (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn delete_config(&self, key: &str) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM config WHERE key = ?1", params![key])?;
            Ok(())
        })
    }

    fn add_peer(&self, peer: &Identity) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT OR IGNORE INTO peers (identity) VALUES (?1)",
                params![peer.to_multihash()],
            )?;
            Ok(())
        })
    }

    fn remove_peer(&self, peer: &Identity) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute(
                "DELETE FROM peers WHERE identity = ?1",
                params![peer.to_multihash()],
            )?;
            Ok(())
        })
    }

    fn block_peer(&self, peer: &Identity) -> Result<()> {
        let peer = peer.to_multihash();
        self.with_tx(|tx| {
            tx.execute("DELETE FROM peers WHERE identity = ?1", params![peer])?;
            tx.execute(
                "INSERT OR IGNORE INTO blocked (identity) VALUES (?1)",
                params![peer],
            )?;
            Ok(())
        })
    }

    fn unblock_peer(&self, peer: &Identity) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute(
                "DELETE FROM blocked WHERE identity = ?1",
                params![peer.to_multihash()],
            )?;
            Ok(())
        })
    }

    fn peers(&self) -> Result<Vec<Identity>> {
        self.with_conn(|conn| identities(conn, "SELECT identity FROM peers ORDER BY identity"))
    }

    fn blocked(&self) -> Result<Vec<Identity>> {
        self.with_conn(|conn| identities(conn, "SELECT identity FROM blocked ORDER BY identity"))
    }

    fn is_blocked(&self, peer: &Identity) -> Result<bool> {
        self.with_conn(|conn| {
            let blocked: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM blocked WHERE identity = ?1)",
                params![peer.to_multihash()],
                |row| row.get(0),
            )?;
            Ok(blocked)
        })
    }

    fn insert_message(&self, message: &Message) -> Result<InsertResult> {
        let hash = message.multihash().to_multihash();
        let author = message.author().to_multihash();
        let depth = message.depth() as i64;
        let body = encode_body(message.body())?;

        self.with_tx(|tx| {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE multihash = ?1)",
                params![hash],
                |row| row.get(0),
            )?;
            if exists {
                return Ok(InsertResult::AlreadyExists);
            }

            let blocked: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM blocked WHERE identity = ?1)",
                params![author],
                |row| row.get(0),
            )?;
            if blocked {
                return Ok(InsertResult::Blocked);
            }

            let occupant: Option<String> = tx
                .query_row(
                    "SELECT multihash FROM messages_by_depth WHERE author = ?1 AND depth = ?2",
                    params![author, depth],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing) = occupant {
                return Err(StoreError::Conflict {
                    author,
                    depth: message.depth(),
                    existing,
                });
            }

            tx.execute(
                "INSERT INTO messages (
                    multihash, author, depth, kind, prev, body, signature
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    hash,
                    author,
                    depth,
                    message.kind(),
                    message.prev().map(|p| p.to_multihash()),
                    body,
                    message.signature().to_multihash(),
                ],
            )?;
            tx.execute(
                "INSERT INTO messages_by_depth (author, depth, multihash) VALUES (?1, ?2, ?3)",
                params![author, depth, hash],
            )?;
            tx.execute(
                "INSERT INTO message_counts (author, count) VALUES (?1, ?2)
                 ON CONFLICT(author) DO UPDATE SET count = MAX(count, excluded.count)",
                params![author, depth + 1],
            )?;

            tracing::debug!(message = %hash, %author, depth, "inserted message");
            Ok(InsertResult::Inserted)
        })
    }

    fn get_message(&self, hash: &MessageHash) -> Result<Option<Message>> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE multihash = ?1"),
                params![hash.to_multihash()],
                read_row,
            )
            .optional()
            .map_err(StoreError::from)
        })?;
        row.map(MessageRow::into_message).transpose()
    }

    fn has_message(&self, hash: &MessageHash) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE multihash = ?1)",
                params![hash.to_multihash()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn message_count(&self, author: &Identity) -> Result<u64> {
        let count: Option<i64> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT count FROM message_counts WHERE author = ?1",
                params![author.to_multihash()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })?;
        Ok(count.unwrap_or(0) as u64)
    }

    fn message_at(&self, author: &Identity, depth: u64) -> Result<Option<Message>> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE multihash = (
                        SELECT multihash FROM messages_by_depth WHERE author = ?1 AND depth = ?2
                    )"
                ),
                params![author.to_multihash(), depth as i64],
                read_row,
            )
            .optional()
            .map_err(StoreError::from)
        })?;
        row.map(MessageRow::into_message).transpose()
    }

    fn message_hashes(&self) -> Result<Vec<MessageHash>> {
        let rows: Vec<String> = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT multihash FROM messages ORDER BY multihash")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        rows.iter()
            .map(|text| MessageHash::parse(text).map_err(|e| StoreError::InvalidData(e.to_string())))
            .collect()
    }

    fn put_blob(&self, data: &[u8]) -> Result<BlobHash> {
        self.blobs.put(data)
    }

    fn get_blob(&self, hash: &BlobHash) -> Result<Option<Bytes>> {
        self.blobs.get(hash)
    }

    fn has_blob(&self, hash: &BlobHash) -> Result<bool> {
        self.blobs.has(hash)
    }

    fn reset(&self) -> Result<()> {
        self.with_tx(|tx| {
            for table in DATA_TABLES {
                tx.execute(&format!("DELETE FROM {table}"), [])?;
            }
            Ok(())
        })?;
        self.blobs.clear()
    }
}
