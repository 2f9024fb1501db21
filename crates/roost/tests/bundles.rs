//! Bundle export/import between databases.

use std::collections::BTreeSet;
use std::fs;

use anyhow::Result;
use proptest::prelude::*;
use roost::bundle::blob_file_name;
use roost::core::BLOB_BYTE_LIMIT;
use roost::{BlobHash, MessageHash, RoostError};
use roost_testkit::{multi_party_fixtures, TestFixture};

fn hashes(fixture: &TestFixture) -> Result<BTreeSet<MessageHash>> {
    Ok(fixture.db.message_hashes()?.into_iter().collect())
}

#[test]
fn export_then_import_is_a_fixed_point() -> Result<()> {
    let parties = multi_party_fixtures(2);
    let (alice, bob) = (&parties[0], &parties[1]);

    bob.db.add_message("post", [("n", "1")])?;
    alice.db.ingest_text(&bob.db.log(&bob.identity())?[0].render())?;
    alice.db.add_peer(&bob.identity())?;
    alice.db.add_message("post", [("n", "1")])?;
    alice.db.add_message("post", [("n", "2")])?;

    let first = tempfile::tempdir()?;
    let report = alice.db.export_bundle(first.path())?;
    assert_eq!(report.messages, 3);
    let before = hashes(alice)?;

    for _ in 0..2 {
        let imported = alice.db.import_bundle(first.path())?;
        assert_eq!(imported.len(), 3);
        assert_eq!(hashes(alice)?, before);
    }
    assert_eq!(alice.db.message_count(&alice.identity())?, 2);

    let second = tempfile::tempdir()?;
    alice.db.export_bundle(second.path())?;
    assert_eq!(
        fs::read_to_string(&report.bundle_path)?,
        fs::read_to_string(second.path().join("messages.bundle"))?
    );
    Ok(())
}

#[test]
fn export_orders_peers_before_local_log() -> Result<()> {
    let parties = multi_party_fixtures(3);
    let (alice, peers) = (&parties[0], &parties[1..]);

    for peer in peers {
        let message = peer.db.add_message("post", [("from", "peer")])?;
        alice.db.ingest_record(message.record().clone())?;
        alice.db.add_peer(&peer.identity())?;
    }
    alice.db.add_message("post", [("from", "alice")])?;

    let dir = tempfile::tempdir()?;
    alice.db.export_bundle(dir.path())?;
    let text = fs::read_to_string(dir.path().join("messages.bundle"))?;

    let mut sorted: Vec<_> = peers.iter().map(|p| p.identity()).collect();
    sorted.sort();
    let authors: Vec<_> = text
        .lines()
        .filter_map(|line| line.strip_prefix("author "))
        .map(str::to_string)
        .collect();
    let expected: Vec<_> = sorted
        .iter()
        .chain(std::iter::once(&alice.identity()))
        .map(|id| id.to_multihash())
        .collect();
    assert_eq!(authors, expected);
    assert!(text.contains("\n\nauthor "));
    Ok(())
}

#[test]
fn bundle_transfers_log_and_blobs() -> Result<()> {
    let parties = multi_party_fixtures(2);
    let (alice, bob) = (&parties[0], &parties[1]);

    let picture = b"not really a png".to_vec();
    let blob = alice.db.put_blob(&picture)?;
    alice.db.add_message("post", [("text", "look")])?;
    alice.db.add_message("photo", [("image", blob.to_multihash())])?;

    let dir = tempfile::tempdir()?;
    let report = alice.db.export_bundle(dir.path())?;
    assert_eq!(report.blobs, 1);

    // Uppercase extensions from case-insensitive filesystems are accepted.
    let name = blob_file_name(&blob, "blb");
    fs::rename(dir.path().join(&name), dir.path().join(name.replace(".blb", ".BLB")))?;
    fs::write(dir.path().join("stray.blb"), b"unreferenced")?;

    let imported = bob.db.import_bundle(dir.path())?;
    assert_eq!(imported.len(), 2);
    assert_eq!(bob.db.log(&alice.identity())?, alice.db.log(&alice.identity())?);
    assert_eq!(bob.db.get_blob(&blob)?.as_deref(), Some(picture.as_slice()));
    assert!(!bob.db.has_blob(&BlobHash::digest(b"unreferenced"))?);
    Ok(())
}

#[test]
fn oversized_loose_file_is_skipped() -> Result<()> {
    let parties = multi_party_fixtures(2);
    let (alice, bob) = (&parties[0], &parties[1]);
    let blob = alice.db.put_blob(b"small")?;
    alice.db.add_message("photo", [("image", blob.to_multihash())])?;

    let dir = tempfile::tempdir()?;
    alice.db.export_bundle(dir.path())?;
    fs::write(dir.path().join("huge.blb"), vec![0u8; BLOB_BYTE_LIMIT + 1])?;

    assert_eq!(bob.db.import_bundle(dir.path())?.len(), 1);
    assert!(bob.db.has_blob(&blob)?);
    assert!(!bob.db.has_blob(&BlobHash::digest(&vec![0u8; BLOB_BYTE_LIMIT + 1]))?);
    Ok(())
}

#[test]
fn tampered_bundle_fails_import() -> Result<()> {
    let parties = multi_party_fixtures(2);
    let (alice, bob) = (&parties[0], &parties[1]);
    alice.db.add_message("hello", [("foo", "bar")])?;

    let dir = tempfile::tempdir()?;
    let report = alice.db.export_bundle(dir.path())?;
    let text = fs::read_to_string(&report.bundle_path)?;

    fs::write(&report.bundle_path, text.replace("foo:\"bar\"", "foo:\"baz\""))?;
    assert!(matches!(
        bob.db.import_bundle(dir.path()),
        Err(RoostError::BadSignature { .. })
    ));

    fs::write(&report.bundle_path, text.replace("depth 0", "depth 1"))?;
    assert!(matches!(
        bob.db.import_bundle(dir.path()),
        Err(RoostError::Verification { field: "depth", .. })
    ));

    assert!(bob.db.message_hashes()?.is_empty());
    Ok(())
}

#[test]
fn blocked_peer_never_lands() -> Result<()> {
    let parties = multi_party_fixtures(2);
    let (alice, bob) = (&parties[0], &parties[1]);
    bob.db.add_message("spam", [("buy", "now")])?;

    let dir = tempfile::tempdir()?;
    bob.db.export_bundle(dir.path())?;

    alice.db.block_peer(&bob.identity())?;
    assert!(alice.db.import_bundle(dir.path())?.is_empty());
    assert_eq!(alice.db.message_count(&bob.identity())?, 0);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_single_byte_change_breaks_import(
        index in any::<prop::sample::Index>(),
        replacement in prop::sample::select(vec![b'x', b'0', b'Z', b' ', b'\n', b'"']),
    ) {
        let alice = TestFixture::with_seed([0x42; 32]);
        let bob = TestFixture::with_seed([0x24; 32]);
        let text = alice.db.add_message("hello", [("foo", "bar")]).unwrap().render();

        let mut bytes = text.into_bytes();
        let at = index.index(bytes.len());
        prop_assume!(bytes[at] != replacement);
        bytes[at] = replacement;
        let tampered = String::from_utf8(bytes).unwrap();

        prop_assert!(bob.db.ingest_text(&tampered).is_err());
        prop_assert!(bob.db.message_hashes().unwrap().is_empty());
    }
}
