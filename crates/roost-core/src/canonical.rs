//! Canonical text rendering.
//!
//! A message renders as:
//!
//! ```text
//! author USER.<b32>.ed25519
//! depth 0
//! kind post
//! prev NONE
//!
//! key:value
//!
//! signature <b32>.sig.ed25519
//! ```
//!
//! The signature covers everything up to and including the blank line after
//! the body. The multihash covers the full rendering, trailing newline
//! included. Same fields always produce the same bytes on every platform.

use crate::message::{Body, Message};
use crate::types::{render_prev, Identity, MessageHash, Signature};

/// Placeholder used for author, depth, prev and signature in draft renderings.
pub const DRAFT_PLACEHOLDER: &str = "DRAFT";

/// Borrowed view of the fields that make up a message.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    pub author: &'a Identity,
    pub depth: u64,
    pub kind: &'a str,
    pub prev: Option<&'a MessageHash>,
    pub body: &'a Body,
}

/// Render without the signature footer. This is the signed text.
pub fn render_unsigned(fields: &Fields<'_>) -> String {
    let mut out = String::new();
    write_header(
        &mut out,
        &fields.author.to_multihash(),
        &fields.depth.to_string(),
        fields.kind,
        &render_prev(fields.prev),
    );
    write_body(&mut out, fields.body);
    out
}

/// Render in full, signature footer included. This is the hashed text.
pub fn render_signed(fields: &Fields<'_>, signature: &Signature) -> String {
    let mut out = render_unsigned(fields);
    write_footer(&mut out, &signature.to_multihash());
    out
}

/// Render a draft for display, with `DRAFT` standing in for the fields
/// only known at publish time.
pub fn render_draft(author: &Identity, kind: &str, body: &Body) -> String {
    let mut out = String::new();
    write_header(
        &mut out,
        &author.to_multihash(),
        DRAFT_PLACEHOLDER,
        kind,
        DRAFT_PLACEHOLDER,
    );
    write_body(&mut out, body);
    write_footer(&mut out, DRAFT_PLACEHOLDER);
    out
}

/// Render a sequence of messages as a bundle: renderings separated by a
/// blank line, ending with a newline.
pub fn render_bundle<'a>(messages: impl IntoIterator<Item = &'a Message>) -> String {
    let mut out = String::new();
    for (i, message) in messages.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&message.render());
    }
    out
}

fn write_header(out: &mut String, author: &str, depth: &str, kind: &str, prev: &str) {
    for (name, value) in [("author", author), ("depth", depth), ("kind", kind), ("prev", prev)] {
        out.push_str(name);
        out.push(' ');
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');
}

fn write_body(out: &mut String, body: &Body) {
    for (key, value) in body.iter() {
        out.push_str(key);
        out.push(':');
        out.push_str(&value.render());
        out.push('\n');
    }
    out.push('\n');
}

fn write_footer(out: &mut String, signature: &str) {
    out.push_str("signature ");
    out.push_str(signature);
    out.push('\n');
}
