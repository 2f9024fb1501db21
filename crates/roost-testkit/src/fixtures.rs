//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use roost::{Database, DatabaseConfig};
use roost_core::{
    Body, BodyValue, ChainHead, Identity, Keypair, Message, MessageHash, MessageRecord, Signature,
};
use roost_store::MemoryStore;

/// A test fixture with a keypair and a memory-backed database.
pub struct TestFixture {
    pub keypair: Keypair,
    pub db: Database<MemoryStore>,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::from_keypair(Keypair::generate())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::from_keypair(Keypair::from_seed(&seed))
    }

    fn from_keypair(keypair: Keypair) -> Self {
        let db = Database::with_keypair(
            MemoryStore::new(),
            Keypair::from_seed(&keypair.seed()),
            DatabaseConfig::default(),
        )
        .expect("memory store accepts the seed");
        Self { keypair, db }
    }

    /// The fixture's identity.
    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    /// Sign a record at an arbitrary position, bypassing the database.
    ///
    /// Useful for building out-of-order or conflicting messages.
    pub fn make_record(
        &self,
        depth: u64,
        prev: Option<MessageHash>,
        kind: &str,
        entries: &[(&str, &str)],
    ) -> MessageRecord {
        let mut body = Body::new();
        for (key, raw) in entries {
            body.insert(*key, BodyValue::classify(raw).expect("valid body value"));
        }
        sign_record(&self.keypair, depth, prev, kind, body)
    }

    /// Build the signed chain `kind, kind, ...` of `len` messages without
    /// touching the database.
    pub fn make_chain(&self, kind: &str, len: u64) -> Vec<Message> {
        let mut chain: Vec<Message> = Vec::new();
        for depth in 0..len {
            let prev = chain.last().map(|m| m.multihash());
            let n = depth.to_string();
            let record = self.make_record(depth, prev, kind, &[("n", n.as_str())]);
            let head = ChainHead { count: depth, last: prev };
            chain.push(roost_core::verify_record(record, &head).expect("fixture chain verifies"));
        }
        chain
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Sign a record over its unsigned rendering.
pub fn sign_record(
    keypair: &Keypair,
    depth: u64,
    prev: Option<MessageHash>,
    kind: &str,
    body: Body,
) -> MessageRecord {
    let mut record = MessageRecord {
        author: keypair.identity(),
        depth,
        kind: kind.to_string(),
        prev,
        body,
        signature: Signature::from_bytes([0; 64]),
    };
    record.signature = keypair.sign(record.render_unsigned().as_bytes());
    record
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_identity_matches_db() {
        let fixture = TestFixture::with_seed([7; 32]);
        assert_eq!(fixture.identity(), fixture.db.identity());
    }

    #[test]
    fn test_fixture_chain() {
        let fixture = TestFixture::new();
        let chain = fixture.make_chain("count", 3);

        assert_eq!(chain[0].prev(), None);
        assert_eq!(chain[1].prev(), Some(&chain[0].multihash()));
        assert_eq!(chain[2].prev(), Some(&chain[1].multihash()));
        assert_eq!(chain[2].depth(), 2);
    }

    #[test]
    fn test_chain_ingests_in_order() {
        let author = TestFixture::with_seed([1; 32]);
        let reader = TestFixture::with_seed([2; 32]);

        for message in author.make_chain("count", 4) {
            reader.db.ingest_record(message.record().clone()).unwrap();
        }
        assert_eq!(reader.db.message_count(&author.identity()).unwrap(), 4);
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        // Each party has unique keys
        let ids: Vec<_> = parties.iter().map(|p| p.identity()).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }
}
