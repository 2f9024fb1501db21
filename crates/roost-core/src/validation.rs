//! Message verification: size, chain position and signature checks.
//!
//! These checks are pure. The caller supplies the author's current
//! [`ChainHead`] from storage and runs the known-message short-circuit
//! before calling [`verify_record`].

use crate::error::ValidationError;
use crate::message::{Body, Message, MessageRecord};
use crate::types::{render_prev, MessageHash};
use crate::MAX_BODY_ENTRIES;

/// Where an author's log currently ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainHead {
    /// Number of messages stored for the author.
    pub count: u64,
    /// Multihash of the message at depth `count - 1`, if any.
    pub last: Option<MessageHash>,
}

/// Reject bodies with more than [`MAX_BODY_ENTRIES`] entries.
pub fn check_body_size(body: &Body) -> Result<(), ValidationError> {
    if body.len() > MAX_BODY_ENTRIES {
        return Err(ValidationError::BodyTooLarge {
            count: body.len(),
            max: MAX_BODY_ENTRIES,
        });
    }
    Ok(())
}

/// The record must sit directly on top of the author's log.
pub fn check_position(record: &MessageRecord, head: &ChainHead) -> Result<(), ValidationError> {
    if record.depth != head.count {
        return Err(ValidationError::Mismatch {
            field: "depth",
            actual: record.depth.to_string(),
            expected: head.count.to_string(),
        });
    }

    if record.prev != head.last {
        return Err(ValidationError::Mismatch {
            field: "prev",
            actual: render_prev(record.prev.as_ref()),
            expected: render_prev(head.last.as_ref()),
        });
    }

    Ok(())
}

/// Verify the signature over the unsigned rendering.
pub fn verify_signature(record: &MessageRecord) -> Result<(), ValidationError> {
    let unsigned = record.render_unsigned();
    record
        .author
        .verify(unsigned.as_bytes(), &record.signature)
        .map_err(|_| ValidationError::SignatureFailed {
            author: record.author.to_multihash(),
        })
}

/// Run every check in order and freeze the record.
pub fn verify_record(record: MessageRecord, head: &ChainHead) -> Result<Message, ValidationError> {
    check_body_size(&record.body)?;
    check_position(&record, head)?;
    verify_signature(&record)?;
    Ok(Message::verified(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::message::BodyValue;
    use crate::types::Signature;

    fn signed(keypair: &Keypair, depth: u64, prev: Option<MessageHash>, entries: usize) -> MessageRecord {
        let mut body = Body::new();
        for i in 0..entries {
            body.insert(format!("k{i}"), BodyValue::Str(i.to_string()));
        }
        let mut record = MessageRecord {
            author: keypair.identity(),
            depth,
            kind: "test".into(),
            prev,
            body,
            signature: Signature::from_bytes([0; 64]),
        };
        record.signature = keypair.sign(record.render_unsigned().as_bytes());
        record
    }

    #[test]
    fn test_genesis_verifies() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let record = signed(&keypair, 0, None, 1);
        let message = verify_record(record.clone(), &ChainHead::default()).unwrap();
        assert_eq!(message.record(), &record);
    }

    #[test]
    fn test_chain_link_verifies() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let first = signed(&keypair, 0, None, 1);
        let second = signed(&keypair, 1, Some(first.multihash()), 1);
        let head = ChainHead {
            count: 1,
            last: Some(first.multihash()),
        };
        verify_record(second, &head).unwrap();
    }

    #[test]
    fn test_depth_mismatch() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let record = signed(&keypair, 1, None, 1);
        let err = verify_record(record, &ChainHead::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Mismatch {
                field: "depth",
                actual: "1".into(),
                expected: "0".into(),
            }
        );
    }

    #[test]
    fn test_prev_mismatch() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let first = signed(&keypair, 0, None, 1);
        let wrong = MessageHash::from_bytes([0x99; 32]);
        let second = signed(&keypair, 1, Some(wrong), 1);
        let head = ChainHead {
            count: 1,
            last: Some(first.multihash()),
        };
        match verify_record(second, &head).unwrap_err() {
            ValidationError::Mismatch { field, actual, expected } => {
                assert_eq!(field, "prev");
                assert_eq!(actual, wrong.to_multihash());
                assert_eq!(expected, first.multihash().to_multihash());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_genesis_requires_none_prev() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let record = signed(&keypair, 0, Some(MessageHash::from_bytes([1; 32])), 1);
        let err = check_position(&record, &ChainHead::default()).unwrap_err();
        assert!(matches!(err, ValidationError::Mismatch { field: "prev", .. }));
    }

    #[test]
    fn test_bad_signature() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let mut record = signed(&keypair, 0, None, 1);
        record.kind = "tampered".into();
        let err = verify_record(record, &ChainHead::default()).unwrap_err();
        assert!(matches!(err, ValidationError::SignatureFailed { .. }));
    }

    #[test]
    fn test_foreign_signature() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let other = Keypair::from_seed(&[0x43; 32]);
        let mut record = signed(&keypair, 0, None, 1);
        record.signature = other.sign(record.render_unsigned().as_bytes());
        assert!(verify_signature(&record).is_err());
    }

    #[test]
    fn test_body_size_limit() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let at_limit = signed(&keypair, 0, None, MAX_BODY_ENTRIES);
        verify_record(at_limit, &ChainHead::default()).unwrap();

        let over = signed(&keypair, 0, None, MAX_BODY_ENTRIES + 1);
        let err = verify_record(over, &ChainHead::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::BodyTooLarge {
                count: MAX_BODY_ENTRIES + 1,
                max: MAX_BODY_ENTRIES,
            }
        );
    }

    #[test]
    fn test_size_checked_before_position() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let record = signed(&keypair, 5, None, MAX_BODY_ENTRIES + 1);
        let err = verify_record(record, &ChainHead::default()).unwrap_err();
        assert!(matches!(err, ValidationError::BodyTooLarge { .. }));
    }
}
