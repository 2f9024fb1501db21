//! Proptest generators for property-based testing.

use proptest::prelude::*;

use roost_core::{
    BlobHash, Body, BodyValue, Identity, Keypair, Message, MessageHash,
};

use crate::fixtures::sign_record;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random identity (not necessarily one we hold the key for).
pub fn identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 32]>().prop_map(Identity::from_bytes)
}

/// Generate a random message multihash.
pub fn message_hash() -> impl Strategy<Value = MessageHash> {
    any::<[u8; 32]>().prop_map(MessageHash::from_bytes)
}

/// Generate a random blob multihash.
pub fn blob_hash() -> impl Strategy<Value = BlobHash> {
    any::<[u8; 32]>().prop_map(BlobHash::from_bytes)
}

/// Generate a kind or body key.
pub fn token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.]{1,16}".prop_map(String::from)
}

/// Generate string literal content, quotes and backslashes included.
pub fn string_literal() -> impl Strategy<Value = String> {
    "[ -~]{0,40}".prop_map(String::from)
}

/// Generate any body value.
pub fn body_value() -> impl Strategy<Value = BodyValue> {
    prop_oneof![
        4 => string_literal().prop_map(BodyValue::Str),
        1 => identity().prop_map(BodyValue::Identity),
        1 => message_hash().prop_map(BodyValue::Message),
        1 => blob_hash().prop_map(BodyValue::Blob),
        1 => Just(BodyValue::None),
    ]
}

/// Generate a body of at most `max_entries` distinct keys.
pub fn body(max_entries: usize) -> impl Strategy<Value = Body> {
    prop::collection::vec((token(), body_value()), 0..=max_entries).prop_map(|entries| {
        let mut body = Body::new();
        for (key, value) in entries {
            body.insert(key, value);
        }
        body
    })
}

/// Parameters for generating a message.
#[derive(Debug)]
pub struct MessageParams {
    pub keypair: Keypair,
    pub depth: u64,
    pub kind: String,
    pub prev: Option<MessageHash>,
    pub body: Body,
}

impl Arbitrary for MessageParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(), // seed
            0u64..=9_999_999u64,
            token(),
            message_hash(),
            body(8),
        )
            .prop_map(|(seed, depth, kind, prev, body)| MessageParams {
                keypair: Keypair::from_seed(&seed),
                depth,
                kind,
                prev: (depth > 0).then_some(prev),
                body,
            })
            .boxed()
    }
}

/// Generate a signed message from parameters.
///
/// The message is signed but its position is not checked against any log.
pub fn message_from_params(params: &MessageParams) -> Message {
    let record = sign_record(
        &params.keypair,
        params.depth,
        params.prev,
        &params.kind,
        params.body.clone(),
    );
    Message::from_trusted(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roost_core::{parse, tokenize, Ingest, MessageRecord, ParseError};

    /// Sink that accepts every record as-is.
    struct Collect;

    impl Ingest for Collect {
        type Error = ParseError;

        fn is_blocked(&self, _: &Identity) -> Result<bool, ParseError> {
            Ok(false)
        }

        fn ingest(&mut self, record: MessageRecord) -> Result<Message, ParseError> {
            Ok(Message::from_trusted(record))
        }
    }

    proptest! {
        #[test]
        fn test_multihash_deterministic(params: MessageParams) {
            let m1 = message_from_params(&params);
            let m2 = message_from_params(&params);

            prop_assert_eq!(m1.multihash(), m2.multihash());
        }

        #[test]
        fn test_render_deterministic(params: MessageParams) {
            let m1 = message_from_params(&params);
            let m2 = message_from_params(&params);

            prop_assert_eq!(m1.render(), m2.render());
        }

        #[test]
        fn test_signature_verifies(params: MessageParams) {
            let message = message_from_params(&params);
            prop_assert!(message
                .author()
                .is_valid_signature(message.render_unsigned().as_bytes(), message.signature()));
        }

        #[test]
        fn test_rendering_reads_back(params: MessageParams) {
            let message = message_from_params(&params);
            let tokens = tokenize(&message.render()).unwrap();
            let parsed = parse(&mut Collect, tokens).unwrap();

            prop_assert_eq!(parsed.len(), 1);
            prop_assert_eq!(&parsed[0], &message);
        }

        #[test]
        fn test_multihash_unique_with_different_body(
            seed in any::<[u8; 32]>(),
            b1 in body(4),
            b2 in body(4),
        ) {
            prop_assume!(b1 != b2);

            let kp = Keypair::from_seed(&seed);
            let m1 = Message::from_trusted(sign_record(&kp, 0, None, "test", b1));
            let m2 = Message::from_trusted(sign_record(&kp, 0, None, "test", b2));

            prop_assert_ne!(m1.multihash(), m2.multihash());
        }
    }
}
