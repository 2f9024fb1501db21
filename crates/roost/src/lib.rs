//! # Roost
//!
//! Signed, append-only message logs exchanged as plain-text bundles.
//!
//! ## Overview
//!
//! Every identity owns a strictly ordered chain of messages. Each message
//! names its author, its depth in the author's log, a kind, the multihash
//! of the previous message, an ordered body, and an Ed25519 signature over
//! its canonical text. A [`Database`] holds the local identity, the logs of
//! followed peers, and the blobs their messages reference.
//!
//! ## Key Concepts
//!
//! - **Message**: Immutable once verified. Identified by the SHA-256 of its canonical text.
//! - **Draft**: The one unpublished message being assembled.
//! - **Bundle**: A directory with the canonical text of several logs plus loose blob files.
//! - **Blocked peer**: Its messages are parsed but never stored.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use roost::{Database, DatabaseConfig};
//! use roost::store::MemoryStore;
//!
//! fn example() -> roost::Result<()> {
//!     let db = Database::open(MemoryStore::new(), DatabaseConfig::default())?;
//!
//!     let message = db.add_message("hello", [("foo", "bar")])?;
//!     println!("published {}", message.multihash());
//!
//!     db.export_bundle("outbox")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `roost::core` - Core primitives (Message, references, canonical text)
//! - `roost::store` - Storage abstraction and SQLite

pub mod bundle;
pub mod config;
pub mod database;
pub mod error;

// Re-export component crates
pub use roost_core as core;
pub use roost_store as store;

// Re-export main types for convenience
pub use bundle::BundleReport;
pub use config::DatabaseConfig;
pub use database::Database;
pub use error::{DraftStateError, Result, RoostError};

// Re-export commonly used core types
pub use roost_core::{
    BlobHash, Body, BodyValue, Draft, Identity, Keypair, Message, MessageHash, Signature,
};
