//! Error types for Roost core.

use std::fmt;

use thiserror::Error;

/// Errors raised while decoding or validating individual values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid base32 symbol {symbol:?} at offset {offset}")]
    InvalidSymbol { symbol: char, offset: usize },

    #[error("invalid {expected} reference: {value}")]
    InvalidReference { expected: &'static str, value: String },

    #[error("invalid body key: {0:?}")]
    InvalidKey(String),

    #[error("invalid kind: {0:?}")]
    InvalidKind(String),

    #[error("invalid string literal: {0}")]
    InvalidStringLiteral(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Which part of a message the lexer was scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Header,
    Body,
    Footer,
}

impl fmt::Display for LexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LexState::Header => "header",
            LexState::Body => "body",
            LexState::Footer => "footer",
        };
        f.write_str(name)
    }
}

/// A line that no alternative of the current lexer state accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error in {state} at offset {offset}: {reason}")]
pub struct LexError {
    /// Byte offset of the start of the offending line.
    pub offset: usize,
    /// State the scanner was in.
    pub state: LexState,
    /// What went wrong.
    pub reason: String,
}

/// Errors raised while grouping tokens into message records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    #[error("message is missing its {0} field")]
    MissingField(&'static str),
}

/// Errors raised by the verification checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expected field `{field}` to equal {expected}, got: {actual}")]
    Mismatch {
        field: &'static str,
        actual: String,
        expected: String,
    },

    #[error("signature verification failed for {author}")]
    SignatureFailed { author: String },

    #[error("messages cannot have more than {max} body entries, got {count}")]
    BodyTooLarge { count: usize, max: usize },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
