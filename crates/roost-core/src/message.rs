//! Messages: the immutable entries of an author's log.
//!
//! A message has six fields:
//! - `author`: who signed it
//! - `depth`: its position in the author's log, contiguous from 0
//! - `kind`: a short token saying how to read the body
//! - `prev`: the multihash of the author's previous message (`NONE` at depth 0)
//! - `body`: an insertion-ordered list of `key:value` entries
//! - `signature`: Ed25519 over the unsigned canonical rendering
//!
//! The multihash is always derived from the signed rendering, never stored.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::canonical;
use crate::codec::{BLOB_SIGIL, IDENTITY_SIGIL, MESSAGE_SIGIL};
use crate::error::{CoreError, ParseError, Result};
use crate::types::{BlobHash, Identity, MessageHash, Signature, NONE};
use crate::{MAX_STRING_LEN, MAX_TOKEN_LEN};

/// Whether `text` is a legal kind or body key: 1..=64 of `[A-Za-z0-9._]`.
pub fn is_token(text: &str) -> bool {
    !text.is_empty()
        && text.len() <= MAX_TOKEN_LEN
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_')
}

/// Validate a message kind.
pub fn validate_kind(kind: &str) -> Result<()> {
    if is_token(kind) {
        Ok(())
    } else {
        Err(CoreError::InvalidKind(kind.to_string()))
    }
}

/// Validate a body key.
pub fn validate_key(key: &str) -> Result<()> {
    if is_token(key) {
        Ok(())
    } else {
        Err(CoreError::InvalidKey(key.to_string()))
    }
}

/// A body value, tagged once when it is assigned or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BodyValue {
    /// A double-quoted string literal (stored unescaped).
    Str(String),
    /// A reference to an identity.
    Identity(Identity),
    /// A reference to a message.
    Message(MessageHash),
    /// A reference to a blob.
    Blob(BlobHash),
    /// The `NONE` sentinel.
    None,
}

impl BodyValue {
    /// A string literal, checked against the escaped length limit.
    pub fn string(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let escaped = escape(&value);
        if escaped.len() > MAX_STRING_LEN {
            return Err(CoreError::InvalidStringLiteral(format!(
                "{} bytes once escaped, limit is {MAX_STRING_LEN}",
                escaped.len()
            )));
        }
        Ok(BodyValue::Str(value))
    }

    /// Tag a raw draft value: a well-formed quoted literal or reference is
    /// taken as written, everything else becomes a string literal.
    pub fn classify(raw: &str) -> Result<Self> {
        if raw.starts_with('"') {
            if let Ok(literal) = unescape_literal(raw) {
                return Ok(BodyValue::Str(literal));
            }
        } else if raw.starts_with(IDENTITY_SIGIL) {
            if let Ok(id) = Identity::parse(raw) {
                return Ok(BodyValue::Identity(id));
            }
        } else if raw.starts_with(MESSAGE_SIGIL) {
            if let Ok(hash) = MessageHash::parse(raw) {
                return Ok(BodyValue::Message(hash));
            }
        } else if raw.starts_with(BLOB_SIGIL) {
            if let Ok(hash) = BlobHash::parse(raw) {
                return Ok(BodyValue::Blob(hash));
            }
        }
        Self::string(raw)
    }

    /// Parse a value exactly as it appears in canonical text.
    pub fn parse(text: &str) -> Result<Self> {
        if text == NONE {
            return Ok(BodyValue::None);
        }
        if text.starts_with('"') {
            return unescape_literal(text).map(BodyValue::Str);
        }
        if text.starts_with(IDENTITY_SIGIL) {
            return Identity::parse(text).map(BodyValue::Identity);
        }
        if text.starts_with(MESSAGE_SIGIL) {
            return MessageHash::parse(text).map(BodyValue::Message);
        }
        if text.starts_with(BLOB_SIGIL) {
            return BlobHash::parse(text).map(BodyValue::Blob);
        }
        Err(CoreError::InvalidReference {
            expected: "body value",
            value: text.to_string(),
        })
    }

    /// Render as canonical text.
    pub fn render(&self) -> String {
        match self {
            BodyValue::Str(s) => format!("\"{}\"", escape(s)),
            BodyValue::Identity(id) => id.to_multihash(),
            BodyValue::Message(hash) => hash.to_multihash(),
            BodyValue::Blob(hash) => hash.to_multihash(),
            BodyValue::None => NONE.to_string(),
        }
    }

    /// The blob this value references, if any.
    pub fn as_blob(&self) -> Option<&BlobHash> {
        match self {
            BodyValue::Blob(hash) => Some(hash),
            _ => None,
        }
    }
}

impl fmt::Display for BodyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for BodyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

impl<'de> Deserialize<'de> for BodyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        BodyValue::parse(&text).map_err(serde::de::Error::custom)
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_literal(text: &str) -> Result<String> {
    let invalid = |why: &str| CoreError::InvalidStringLiteral(format!("{why}: {text}"));

    let inner = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| invalid("unterminated"))?;
    if inner.len() > MAX_STRING_LEN {
        return Err(invalid("too long"));
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                _ => return Err(invalid("bad escape")),
            },
            '"' => return Err(invalid("unescaped quote")),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// An insertion-ordered body. Order is load-bearing: it is hashed and signed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Body {
    entries: Vec<(String, BodyValue)>,
}

impl Body {
    /// Create an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the body has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&BodyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BodyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert or overwrite in place, keeping the key's original position.
    ///
    /// Returns the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: BodyValue) -> Option<BodyValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Append a new entry; a repeated key is an error.
    pub fn try_push(
        &mut self,
        key: impl Into<String>,
        value: BodyValue,
    ) -> std::result::Result<(), ParseError> {
        let key = key.into();
        if self.get(&key).is_some() {
            return Err(ParseError::DuplicateField(key));
        }
        self.entries.push((key, value));
        Ok(())
    }
}

/// A complete, not yet verified message as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub author: Identity,
    pub depth: u64,
    pub kind: String,
    pub prev: Option<MessageHash>,
    pub body: Body,
    pub signature: Signature,
}

impl MessageRecord {
    /// The borrowed field view the serializer works from.
    pub fn fields(&self) -> canonical::Fields<'_> {
        canonical::Fields {
            author: &self.author,
            depth: self.depth,
            kind: &self.kind,
            prev: self.prev.as_ref(),
            body: &self.body,
        }
    }

    /// Canonical rendering without the signature footer (what is signed).
    pub fn render_unsigned(&self) -> String {
        canonical::render_unsigned(&self.fields())
    }

    /// Full canonical rendering (what is hashed).
    pub fn render(&self) -> String {
        canonical::render_signed(&self.fields(), &self.signature)
    }

    /// The multihash of this record.
    pub fn multihash(&self) -> MessageHash {
        MessageHash::digest(self.render().as_bytes())
    }
}

/// A verified message. Immutable: no field can change after verification.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    record: MessageRecord,
}

impl Message {
    /// Wrap a record that already passed verification.
    pub(crate) fn verified(record: MessageRecord) -> Self {
        Self { record }
    }

    /// Rebuild a message from trusted storage without re-verifying it.
    pub fn from_trusted(record: MessageRecord) -> Self {
        Self { record }
    }

    pub fn author(&self) -> &Identity {
        &self.record.author
    }

    pub fn depth(&self) -> u64 {
        self.record.depth
    }

    pub fn kind(&self) -> &str {
        &self.record.kind
    }

    pub fn prev(&self) -> Option<&MessageHash> {
        self.record.prev.as_ref()
    }

    pub fn body(&self) -> &Body {
        &self.record.body
    }

    pub fn signature(&self) -> &Signature {
        &self.record.signature
    }

    /// The underlying record.
    pub fn record(&self) -> &MessageRecord {
        &self.record
    }

    /// Full canonical rendering.
    pub fn render(&self) -> String {
        self.record.render()
    }

    /// Rendering without the signature footer.
    pub fn render_unsigned(&self) -> String {
        self.record.render_unsigned()
    }

    /// Content address: `TEXT.` + base32(SHA-256(render())) + `.sha256`.
    pub fn multihash(&self) -> MessageHash {
        self.record.multihash()
    }

    /// Every blob referenced from the kind, body keys, or body values,
    /// deduplicated in order of first appearance.
    pub fn blobs(&self) -> Vec<BlobHash> {
        let mut found = Vec::new();
        let candidates = std::iter::once(BlobHash::parse(self.kind()).ok())
            .chain(self.body().iter().map(|(key, _)| BlobHash::parse(key).ok()))
            .chain(self.body().iter().map(|(_, value)| value.as_blob().copied()));
        for hash in candidates.flatten() {
            if !found.contains(&hash) {
                found.push(hash);
            }
        }
        found
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("author", self.author())
            .field("depth", &self.depth())
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}
