//! # Roost Core
//!
//! Pure primitives for Roost: references, the canonical text format,
//! messages and drafts, and the verification checks.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over signed, content-addressed messages.
//!
//! ## Key Types
//!
//! - [`Message`] - A verified, immutable entry in an author's log
//! - [`MessageRecord`] - A message as read off the wire, before verification
//! - [`Draft`] - An unpublished message under construction
//! - [`Identity`], [`MessageHash`], [`BlobHash`], [`Signature`] - References
//!
//! ## Canonical text
//!
//! Messages are hashed, signed and exchanged as line-oriented text. See
//! [`canonical`] for rendering and [`lexer`] / [`parser`] for reading it back.

pub mod canonical;
pub mod codec;
pub mod crypto;
pub mod draft;
pub mod error;
pub mod lexer;
pub mod message;
pub mod parser;
pub mod types;
pub mod validation;

pub use canonical::{render_bundle, DRAFT_PLACEHOLDER};
pub use crypto::{sha256, Keypair, SEED_LEN};
pub use draft::Draft;
pub use error::{CoreError, LexError, LexState, ParseError, ValidationError};
pub use lexer::{tokenize, tokenize_unsigned, Token};
pub use message::{Body, BodyValue, Message, MessageRecord};
pub use parser::{parse, Ingest};
pub use types::{BlobHash, Identity, MessageHash, Signature, NONE};
pub use validation::{verify_record, ChainHead};

/// Maximum number of body entries in a message.
pub const MAX_BODY_ENTRIES: usize = 64;

/// Maximum length of a kind or body key.
pub const MAX_TOKEN_LEN: usize = 64;

/// Maximum length of a string literal's escaped content, in bytes.
pub const MAX_STRING_LEN: usize = 128;

/// Maximum number of decimal digits in a depth.
pub const MAX_DEPTH_DIGITS: usize = 7;

/// Maximum size of a blob, in bytes.
pub const BLOB_BYTE_LIMIT: usize = 360_000;
