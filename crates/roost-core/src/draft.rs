//! Drafts: the mutable staging area for an unpublished message.

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::error::Result;
use crate::message::{validate_key, validate_kind, Body, BodyValue};
use crate::types::Identity;

/// An unsigned message under construction.
///
/// Assigning an existing key overwrites it in place. Body values are tagged
/// once, when assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    kind: String,
    body: Body,
}

impl Draft {
    /// Start an empty draft of the given kind.
    pub fn new(kind: impl Into<String>) -> Result<Self> {
        let kind = kind.into();
        validate_kind(&kind)?;
        Ok(Self {
            kind,
            body: Body::new(),
        })
    }

    /// Start a draft with initial `key -> raw value` assignments.
    pub fn with_body<K, V>(kind: impl Into<String>, entries: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut draft = Self::new(kind)?;
        for (key, value) in entries {
            draft.set(key, value.as_ref())?;
        }
        Ok(draft)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Assign a raw value, tagging it as a reference or a string literal.
    pub fn set(&mut self, key: impl Into<String>, raw: &str) -> Result<BodyValue> {
        self.set_value(key, BodyValue::classify(raw)?)
    }

    /// Assign an already tagged value, returning what was stored.
    pub fn set_value(&mut self, key: impl Into<String>, value: BodyValue) -> Result<BodyValue> {
        let key = key.into();
        validate_key(&key)?;
        self.body.insert(key, value.clone());
        Ok(value)
    }

    /// Render with `DRAFT` placeholders for the publish-time fields.
    pub fn render(&self, author: &Identity) -> String {
        canonical::render_draft(author, &self.kind, &self.body)
    }
}
