//! Groups lexer tokens into message records and hands them to a sink.
//!
//! The parser owns no storage. Whatever receives the records implements
//! [`Ingest`]: it decides whether an author is blocked and runs
//! verification and insertion for everything else.

use crate::error::ParseError;
use crate::lexer::Token;
use crate::message::{Body, Message, MessageRecord};
use crate::types::{Identity, MessageHash, Signature};

/// The receiving end of a parse.
pub trait Ingest {
    /// Error type of the sink. Parse errors must convert into it.
    type Error: From<ParseError>;

    /// Whether messages by `author` are dropped without verification.
    fn is_blocked(&self, author: &Identity) -> Result<bool, Self::Error>;

    /// Verify and store a record, returning the stored message.
    ///
    /// Re-ingesting a known message returns the stored copy.
    fn ingest(&mut self, record: MessageRecord) -> Result<Message, Self::Error>;
}

/// Scratch state for the message being parsed.
#[derive(Default)]
struct Scratch {
    author: Option<Identity>,
    depth: Option<u64>,
    kind: Option<String>,
    prev: Option<Option<MessageHash>>,
    body: Body,
    signature: Option<Signature>,
}

impl Scratch {
    fn freeze(self) -> Result<MessageRecord, ParseError> {
        Ok(MessageRecord {
            author: self.author.ok_or(ParseError::MissingField("author"))?,
            depth: self.depth.ok_or(ParseError::MissingField("depth"))?,
            kind: self.kind.ok_or(ParseError::MissingField("kind"))?,
            prev: self.prev.ok_or(ParseError::MissingField("prev"))?,
            body: self.body,
            signature: self.signature.ok_or(ParseError::MissingField("signature"))?,
        })
    }
}

fn fill<T>(slot: &mut Option<T>, value: T, field: &str) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::DuplicateField(field.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

/// Parse a token stream, ingesting each completed message into `sink`.
///
/// Returns the ingested messages in input order. Messages by blocked
/// authors are dropped and do not appear in the result.
pub fn parse<S: Ingest>(sink: &mut S, tokens: Vec<Token>) -> Result<Vec<Message>, S::Error> {
    let mut messages = Vec::new();
    let mut scratch = Scratch::default();

    for token in tokens {
        match token {
            Token::Author(author) => fill(&mut scratch.author, author, "author")?,
            Token::Depth(depth) => fill(&mut scratch.depth, depth, "depth")?,
            Token::Kind(kind) => fill(&mut scratch.kind, kind, "kind")?,
            Token::Prev(prev) => fill(&mut scratch.prev, prev, "prev")?,
            Token::HeaderEnd | Token::BodyEnd => {}
            Token::BodyEntry(key, value) => scratch.body.try_push(key, value)?,
            Token::Signature(signature) => fill(&mut scratch.signature, signature, "signature")?,
            Token::MessageEnd => {
                let record = std::mem::take(&mut scratch).freeze()?;
                if sink.is_blocked(&record.author)? {
                    continue;
                }
                messages.push(sink.ingest(record)?);
            }
        }
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::lexer::tokenize;
    use crate::message::BodyValue;

    /// Accepts everything except one blocked author, without verifying.
    #[derive(Default)]
    struct Collect {
        blocked: Option<Identity>,
        seen: Vec<MessageRecord>,
    }

    impl Ingest for Collect {
        type Error = ParseError;

        fn is_blocked(&self, author: &Identity) -> Result<bool, ParseError> {
            Ok(self.blocked.as_ref() == Some(author))
        }

        fn ingest(&mut self, record: MessageRecord) -> Result<Message, ParseError> {
            self.seen.push(record.clone());
            Ok(Message::from_trusted(record))
        }
    }

    fn record(seed: u8, kind: &str) -> MessageRecord {
        let keypair = Keypair::from_seed(&[seed; 32]);
        let mut body = Body::new();
        body.insert("foo", BodyValue::Str("bar".into()));
        let mut record = MessageRecord {
            author: keypair.identity(),
            depth: 0,
            kind: kind.into(),
            prev: None,
            body,
            signature: Signature::from_bytes([0; 64]),
        };
        record.signature = keypair.sign(record.render_unsigned().as_bytes());
        record
    }

    #[test]
    fn test_parse_roundtrip() {
        let a = record(1, "one");
        let b = record(2, "two");
        let text = format!("{}\n{}", a.render(), b.render());

        let mut sink = Collect::default();
        let messages = parse(&mut sink, tokenize(&text).unwrap()).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].record(), &a);
        assert_eq!(messages[1].record(), &b);
        assert_eq!(messages[0].multihash(), a.multihash());
    }

    #[test]
    fn test_duplicate_header_field() {
        let mut tokens = tokenize(&record(1, "one").render()).unwrap();
        tokens.insert(1, Token::Kind("again".into()));
        let err = parse(&mut Collect::default(), tokens).unwrap_err();
        assert_eq!(err, ParseError::DuplicateField("kind".into()));
    }

    #[test]
    fn test_duplicate_body_key() {
        let text = record(1, "one").render();
        let doubled = text.replacen("foo:\"bar\"\n", "foo:\"bar\"\nfoo:\"baz\"\n", 1);
        let err = parse(&mut Collect::default(), tokenize(&doubled).unwrap()).unwrap_err();
        assert_eq!(err, ParseError::DuplicateField("foo".into()));
    }

    #[test]
    fn test_missing_field() {
        let text = record(1, "one").render();
        let without_prev = text.replacen("prev NONE\n", "", 1);
        let err = parse(&mut Collect::default(), tokenize(&without_prev).unwrap()).unwrap_err();
        assert_eq!(err, ParseError::MissingField("prev"));
    }

    #[test]
    fn test_blocked_author_is_dropped() {
        let a = record(1, "one");
        let b = record(2, "two");
        let text = format!("{}\n{}", a.render(), b.render());

        let mut sink = Collect {
            blocked: Some(a.author),
            ..Default::default()
        };
        let messages = parse(&mut sink, tokenize(&text).unwrap()).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author(), &b.author);
        assert_eq!(sink.seen, vec![b]);
    }

    #[test]
    fn test_scratch_resets_between_messages() {
        // Same fields twice in a row must not count as duplicates.
        let a = record(1, "one");
        let text = format!("{}\n{}", a.render(), a.render());
        let messages = parse(&mut Collect::default(), tokenize(&text).unwrap()).unwrap();
        assert_eq!(messages.len(), 2);
    }
}
