//! # Roost Store
//!
//! Storage abstraction for Roost. Provides a trait-based interface for
//! messages, peers, blobs and config, with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts persistence behind the [`Store`] trait,
//! allowing the database layer to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`BlobTree`] - Digest-sharded blob files
//! - [`InsertResult`] - Result of inserting a message
//!
//! ## Usage
//!
//! ```rust,no_run
//! use roost_store::{SqliteStore, Store, StoreConfig};
//!
//! fn example() -> roost_store::Result<()> {
//!     let store = SqliteStore::open_with(&StoreConfig::default())?;
//!     println!("{} messages", store.message_hashes()?.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting the same message twice returns `AlreadyExists`
//! - **Conflict detection**: Different message at same (author, depth) is `StoreError::Conflict`
//! - **Atomicity**: Message, depth index and count update in one transaction

pub mod blob;
pub mod config;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use blob::BlobTree;
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store, StoreExt, DRAFT_KEY, SEED_KEY};
