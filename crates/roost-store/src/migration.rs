//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Tables holding data (everything except the migration bookkeeping).
pub const DATA_TABLES: [&str; 6] = [
    "config",
    "peers",
    "blocked",
    "messages",
    "messages_by_depth",
    "message_counts",
];

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Key/value settings: identity seed, draft slot
        CREATE TABLE config (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL
        );

        -- Followed and blocked identities (USER.<b32>.ed25519)
        CREATE TABLE peers (
            identity TEXT PRIMARY KEY
        );

        CREATE TABLE blocked (
            identity TEXT PRIMARY KEY
        );

        -- Messages by multihash
        CREATE TABLE messages (
            multihash TEXT PRIMARY KEY,       -- TEXT.<b32>.sha256 of signed rendering
            author TEXT NOT NULL,
            depth INTEGER NOT NULL,
            kind TEXT NOT NULL,
            prev TEXT,                        -- NULL at depth 0
            body BLOB NOT NULL,               -- CBOR list of (key, rendered value)
            signature TEXT NOT NULL
        );

        -- Per-author position index
        CREATE TABLE messages_by_depth (
            author TEXT NOT NULL,
            depth INTEGER NOT NULL,
            multihash TEXT NOT NULL,
            PRIMARY KEY (author, depth)
        );

        -- Per-author message count
        CREATE TABLE message_counts (
            author TEXT PRIMARY KEY,
            count INTEGER NOT NULL
        );

        CREATE INDEX idx_messages_author ON messages(author);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
