//! Error types for Roost.

use roost_core::{CoreError, LexError, ParseError, ValidationError};
use roost_store::StoreError;
use thiserror::Error;

/// Misuse of the single draft slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DraftStateError {
    #[error("a draft is already open")]
    AlreadyOpen,

    #[error("no draft is open")]
    NotFound,
}

/// Errors that can occur during Roost operations.
#[derive(Debug, Error)]
pub enum RoostError {
    /// Malformed canonical text.
    #[error("lexical error: {0}")]
    Lex(#[from] LexError),

    /// A header field or body key repeated within one message.
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    /// A message ended without a required field.
    #[error("message is missing its {0} field")]
    MissingField(&'static str),

    /// Depth or prev does not continue the author's log.
    #[error("verification failed: expected `{field}` to equal {expected}, got: {actual}")]
    Verification {
        field: &'static str,
        actual: String,
        expected: String,
    },

    /// Signature does not verify against the author.
    #[error("bad signature from {author}")]
    BadSignature { author: String },

    /// Body or blob over its limit.
    #[error("{what} exceeds limit of {limit}: {actual}")]
    SizeLimit {
        what: &'static str,
        limit: usize,
        actual: usize,
    },

    /// Draft slot misuse.
    #[error("draft error: {0}")]
    DraftState(#[from] DraftStateError),

    /// A record from a blocked author was refused, or the local identity is
    /// blocked and its own message was dropped.
    #[error("author is blocked: {0}")]
    AuthorBlocked(String),

    /// Invalid value.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Bundle file I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseError> for RoostError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::DuplicateField(field) => RoostError::DuplicateField(field),
            ParseError::MissingField(field) => RoostError::MissingField(field),
        }
    }
}

impl From<ValidationError> for RoostError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Mismatch {
                field,
                actual,
                expected,
            } => RoostError::Verification {
                field,
                actual,
                expected,
            },
            ValidationError::SignatureFailed { author } => RoostError::BadSignature { author },
            ValidationError::BodyTooLarge { count, max } => RoostError::SizeLimit {
                what: "body entries",
                limit: max,
                actual: count,
            },
        }
    }
}

impl From<StoreError> for RoostError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::BlobTooLarge { size, limit } => RoostError::SizeLimit {
                what: "blob bytes",
                limit,
                actual: size,
            },
            other => RoostError::Store(other),
        }
    }
}

/// Result type for Roost operations.
pub type Result<T> = std::result::Result<T, RoostError>;
