//! Strong types for the references that appear in canonical text.
//!
//! Every reference renders as `sigil + base32(bytes) + suffix`. Parsing is
//! strict: the sigil, the exact symbol count, canonical symbols and the
//! suffix must all match, so a parsed reference always renders back to the
//! exact text it came from.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::codec::{
    self, BLOB_SIGIL, DIGEST_SUFFIX, IDENTITY_SIGIL, IDENTITY_SUFFIX, MESSAGE_SIGIL,
    SIGNATURE_SUFFIX,
};
use crate::error::{CoreError, Result};

/// The `prev` sentinel of a depth-0 message, also a legal body value.
pub const NONE: &str = "NONE";

/// Strictly parse `sigil + base32 + suffix` into `N` bytes.
fn parse_reference<const N: usize>(
    text: &str,
    sigil: &str,
    suffix: &str,
    expected: &'static str,
) -> Result<[u8; N]> {
    let invalid = || CoreError::InvalidReference {
        expected,
        value: text.to_string(),
    };

    let body = text
        .strip_prefix(sigil)
        .and_then(|rest| rest.strip_suffix(suffix))
        .ok_or_else(invalid)?;

    if body.len() != codec::encoded_len(N) || !codec::is_canonical(body) {
        return Err(invalid());
    }

    let bytes: [u8; N] = codec::decode(body)?.try_into().map_err(|_| invalid())?;

    // Non-zero pad bits would decode fine but render differently.
    if codec::encode(&bytes) != body {
        return Err(invalid());
    }

    Ok(bytes)
}

macro_rules! reference_type {
    (
        $(#[$meta:meta])*
        $name:ident, $len:expr, $sigil:expr, $suffix:expr, $label:expr
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// The base32 part of the rendering, without sigil or suffix.
            pub fn to_base32(&self) -> String {
                codec::encode(&self.0)
            }

            /// Render as `sigil + base32 + suffix`.
            pub fn to_multihash(&self) -> String {
                format!("{}{}{}", $sigil, self.to_base32(), $suffix)
            }

            /// Strictly parse a rendered reference.
            pub fn parse(text: &str) -> Result<Self> {
                parse_reference::<{ $len }>(text, $sigil, $suffix, $label).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_multihash())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}...)", stringify!($name), &hex::encode(self.0)[..8])
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::parse(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

reference_type!(
    /// An author: a 32-byte Ed25519 public key, rendered `USER.<b32>.ed25519`.
    Identity, 32, IDENTITY_SIGIL, IDENTITY_SUFFIX, "identity"
);

reference_type!(
    /// A message multihash: SHA-256 of the signed rendering, `TEXT.<b32>.sha256`.
    MessageHash, 32, MESSAGE_SIGIL, DIGEST_SUFFIX, "message"
);

reference_type!(
    /// A blob multihash: SHA-256 of the blob bytes, `FILE.<b32>.sha256`.
    BlobHash, 32, BLOB_SIGIL, DIGEST_SUFFIX, "blob"
);

reference_type!(
    /// A 64-byte Ed25519 signature, `<b32>.sig.ed25519`.
    Signature, 64, "", SIGNATURE_SUFFIX, "signature"
);

/// Render an optional `prev` link, using the `NONE` sentinel for depth 0.
pub fn render_prev(prev: Option<&MessageHash>) -> String {
    match prev {
        Some(hash) => hash.to_multihash(),
        None => NONE.to_string(),
    }
}

/// Parse a `prev` value: a message reference or the `NONE` sentinel.
pub fn parse_prev(text: &str) -> Result<Option<MessageHash>> {
    if text == NONE {
        Ok(None)
    } else {
        MessageHash::parse(text).map(Some)
    }
}
