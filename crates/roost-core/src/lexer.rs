//! Line-oriented scanner for canonical message text.
//!
//! The scanner walks the input one line at a time through three states:
//! `Header` (author/depth/kind/prev lines), `Body` (`key:value` lines) and
//! `Footer` (one signature line). A bare newline closes the header and the
//! body; after the signature, a bare newline or the end of input closes the
//! message and returns to `Header`.
//!
//! Every field is checked by its own validator, so a token that comes out
//! of the lexer is already well-formed. The first line no alternative
//! accepts aborts the scan.

use crate::error::{LexError, LexState};
use crate::message::{is_token, BodyValue};
use crate::types::{parse_prev, Identity, MessageHash, Signature};
use crate::MAX_DEPTH_DIGITS;

const SIGNATURE_PREFIX: &str = "signature ";

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Author(Identity),
    Depth(u64),
    Kind(String),
    Prev(Option<MessageHash>),
    HeaderEnd,
    BodyEntry(String, BodyValue),
    BodyEnd,
    Signature(Signature),
    MessageEnd,
}

/// Tokenize concatenated canonical message text.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).run()
}

/// Tokenize an unsigned rendering with its signature footer appended.
pub fn tokenize_unsigned(unsigned: &str, signature: &Signature) -> Result<Vec<Token>, LexError> {
    let signed = format!("{unsigned}{SIGNATURE_PREFIX}{signature}\n");
    tokenize(&signed)
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    state: LexState,
    tokens: Vec<Token>,
    /// A header field was seen for the current message.
    open: bool,
    /// The footer's signature line was seen.
    signed: bool,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            state: LexState::Header,
            tokens: Vec::new(),
            open: false,
            signed: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let input = self.input;
        while self.pos < input.len() {
            let rest = &input[self.pos..];
            let Some(end) = rest.find('\n') else {
                return Err(self.flunk("line is not newline-terminated"));
            };
            let line = &rest[..end];
            self.step(line)?;
            self.pos += end + 1;
        }
        self.finish()
    }

    fn step(&mut self, line: &str) -> Result<(), LexError> {
        match self.state {
            LexState::Header => {
                if line.is_empty() {
                    if !self.open {
                        return Err(self.flunk("blank line before header"));
                    }
                    self.tokens.push(Token::HeaderEnd);
                    self.state = LexState::Body;
                } else {
                    let token = self.header_field(line)?;
                    self.tokens.push(token);
                    self.open = true;
                }
            }
            LexState::Body => {
                if line.is_empty() {
                    self.tokens.push(Token::BodyEnd);
                    self.state = LexState::Footer;
                    self.signed = false;
                } else {
                    let token = self.body_entry(line)?;
                    self.tokens.push(token);
                }
            }
            LexState::Footer => {
                if !self.signed {
                    let token = self.signature(line)?;
                    self.tokens.push(token);
                    self.signed = true;
                } else if line.is_empty() {
                    self.close_message();
                } else {
                    return Err(self.flunk("expected blank line after signature"));
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Token>, LexError> {
        match self.state {
            LexState::Header if !self.open => Ok(self.tokens),
            LexState::Footer if self.signed => {
                self.close_message();
                Ok(self.tokens)
            }
            _ => Err(self.flunk("unexpected end of input")),
        }
    }

    fn close_message(&mut self) {
        self.tokens.push(Token::MessageEnd);
        self.state = LexState::Header;
        self.open = false;
        self.signed = false;
    }

    fn header_field(&self, line: &str) -> Result<Token, LexError> {
        let (name, value) = line
            .split_once(' ')
            .ok_or_else(|| self.flunk("expected `<field> <value>`"))?;
        match name {
            "author" => Identity::parse(value)
                .map(Token::Author)
                .map_err(|e| self.flunk(e.to_string())),
            "depth" => parse_depth(value)
                .map(Token::Depth)
                .ok_or_else(|| self.flunk(format!("invalid depth: {value:?}"))),
            "kind" if is_token(value) => Ok(Token::Kind(value.to_string())),
            "kind" => Err(self.flunk(format!("invalid kind: {value:?}"))),
            "prev" => parse_prev(value)
                .map(Token::Prev)
                .map_err(|e| self.flunk(e.to_string())),
            other => Err(self.flunk(format!("unknown header field: {other:?}"))),
        }
    }

    fn body_entry(&self, line: &str) -> Result<Token, LexError> {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| self.flunk("expected `<key>:<value>`"))?;
        if !is_token(key) {
            return Err(self.flunk(format!("invalid body key: {key:?}")));
        }
        let value = BodyValue::parse(value).map_err(|e| self.flunk(e.to_string()))?;
        Ok(Token::BodyEntry(key.to_string(), value))
    }

    fn signature(&self, line: &str) -> Result<Token, LexError> {
        let value = line
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or_else(|| self.flunk("expected `signature <ref>`"))?;
        Signature::parse(value)
            .map(Token::Signature)
            .map_err(|e| self.flunk(e.to_string()))
    }

    fn flunk(&self, reason: impl Into<String>) -> LexError {
        LexError {
            offset: self.pos,
            state: self.state,
            reason: reason.into(),
        }
    }
}

/// 1..=7 decimal digits, no leading zeros except `0` itself.
fn parse_depth(text: &str) -> Option<u64> {
    let well_formed = !text.is_empty()
        && text.len() <= MAX_DEPTH_DIGITS
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'));
    if well_formed {
        text.parse().ok()
    } else {
        None
    }
}
