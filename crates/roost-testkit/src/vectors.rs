//! Golden test vectors for deterministic verification.
//!
//! Each vector fixes a seed and the message fields; the canonical text,
//! the Ed25519 signature over it, and therefore the multihash are all
//! fully determined. Any change to rendering shows up here first.

use serde::Serialize;

use roost_core::{Body, BodyValue, Keypair, Message, MessageHash};

use crate::fixtures::sign_record;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    /// Depth in the author's log.
    pub depth: u64,
    /// Message kind.
    pub kind: &'static str,
    /// Rendered `prev`, or `None` at depth 0.
    pub prev: Option<&'static str>,
    /// Body entries, values as they appear in canonical text.
    pub body: &'static [(&'static str, &'static str)],
    /// Expected author reference.
    pub expected_author: &'static str,
    /// Expected multihash of the signed rendering.
    pub expected_multihash: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "hello with foo:bar",
            seed: [0x42; 32],
            depth: 0,
            kind: "hello",
            prev: None,
            body: &[("foo", "\"bar\"")],
            expected_author: "USER.459FHMCVF4EJ8H9J8BGNYBNBDJVWZYKVD9FD604QJR70D641VC90.ed25519",
            expected_multihash: "TEXT.T8ZF9QEPA810GF159MX8DQA1C5VNXJ24CX22YEWSK30S083QGE0G.sha256",
        },
        GoldenVector {
            name: "second hello linking the first",
            seed: [0x42; 32],
            depth: 1,
            kind: "hello",
            prev: Some("TEXT.T8ZF9QEPA810GF159MX8DQA1C5VNXJ24CX22YEWSK30S083QGE0G.sha256"),
            body: &[
                ("foo", "\"baz\""),
                (
                    "parent",
                    "TEXT.T8ZF9QEPA810GF159MX8DQA1C5VNXJ24CX22YEWSK30S083QGE0G.sha256",
                ),
            ],
            expected_author: "USER.459FHMCVF4EJ8H9J8BGNYBNBDJVWZYKVD9FD604QJR70D641VC90.ed25519",
            expected_multihash: "TEXT.T3ZQSE7JTW03YP9TJ6YWP3QTSNCTS0NCWZJDEYYPV8BJBJP68ST0.sha256",
        },
        GoldenVector {
            name: "escapes, blob and NONE values",
            seed: [0x00; 32],
            depth: 0,
            kind: "photo",
            prev: None,
            body: &[
                ("caption", r#""say \"hi\"\\\n""#),
                (
                    "image",
                    "FILE.5KN2EK8BXQ1SXH5BDEMYB7P8H7HYTVXND8EF12569PDKGCVRVJBG.sha256",
                ),
                ("alt", "NONE"),
            ],
            expected_author: "USER.7DN2FF6EPTJ2TRN3N382MVRDEDJK45BQ3QH479HTR14A32TSV8MG.ed25519",
            expected_multihash: "TEXT.M3QEPT7D4J9ZFRH4ACTAPRN47MTY481SMF6YM0Z9ASBDHYN0PN9G.sha256",
        },
        GoldenVector {
            name: "empty body",
            seed: [0x01; 32],
            depth: 0,
            kind: "empty",
            prev: None,
            body: &[],
            expected_author: "USER.HA4E7QBM17RSBZAJVCPKSEJXEB56E2DZ3PA146ZKEJ403D0FDXE0.ed25519",
            expected_multihash: "TEXT.0BCZDKX6P20T6K9NRNGQG2G78Y1BP5AEASCSA7FPAX3FRRPSYGDG.sha256",
        },
    ]
}

/// Generate the signed message a golden vector describes.
pub fn generate_message_from_vector(vector: &GoldenVector) -> Message {
    let keypair = Keypair::from_seed(&vector.seed);
    let prev = vector
        .prev
        .map(|text| MessageHash::parse(text).expect("vector prev is a message reference"));

    let mut body = Body::new();
    for (key, text) in vector.body {
        body.insert(*key, BodyValue::parse(text).expect("vector value is canonical"));
    }

    Message::from_trusted(sign_record(&keypair, vector.depth, prev, vector.kind, body))
}

/// Outcome of regenerating one vector.
#[derive(Debug, Clone, Serialize)]
pub struct VectorReport {
    pub name: String,
    pub author: String,
    pub multihash: String,
    pub matches: bool,
}

/// Regenerate every vector and compare against the recorded values.
pub fn verify_all_vectors() -> Vec<VectorReport> {
    all_vectors()
        .iter()
        .map(|v| {
            let message = generate_message_from_vector(v);
            let author = message.author().to_multihash();
            let multihash = message.multihash().to_multihash();
            let matches = author == v.expected_author && multihash == v.expected_multihash;

            VectorReport {
                name: v.name.to_string(),
                author,
                multihash,
                matches,
            }
        })
        .collect()
}

/// The vector reports as pretty JSON, for diffing against other builds.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&verify_all_vectors())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_match_recorded_values() {
        for report in verify_all_vectors() {
            assert!(
                report.matches,
                "Vector '{}' produced {} / {}",
                report.name, report.author, report.multihash
            );
        }
    }

    #[test]
    fn test_hello_rendering_layout() {
        let message = generate_message_from_vector(&all_vectors()[0]);
        let expected = "author USER.459FHMCVF4EJ8H9J8BGNYBNBDJVWZYKVD9FD604QJR70D641VC90.ed25519\n\
                        depth 0\n\
                        kind hello\n\
                        prev NONE\n\
                        \n\
                        foo:\"bar\"\n\
                        \n\
                        signature QJB5VBBJGHM0GXA2GNHM503VDHZB7AWV0W37X8QE5DS5W88M7HGV3ETMDVP0K7YRW68XKYQ1HCHPK9GRCBA73P7DCSMENM0175HH020.sig.ed25519\n";
        assert_eq!(message.render(), expected);
    }

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            let m1 = generate_message_from_vector(&vector);
            let m2 = generate_message_from_vector(&vector);

            assert_eq!(
                m1.render(),
                m2.render(),
                "Vector '{}' produced different canonical text",
                vector.name
            );
        }
    }

    #[test]
    fn test_second_vector_links_first() {
        let vectors = all_vectors();
        let first = generate_message_from_vector(&vectors[0]);
        let second = generate_message_from_vector(&vectors[1]);

        assert_eq!(second.prev(), Some(&first.multihash()));
        assert_eq!(
            second.body().get("parent"),
            Some(&BodyValue::Message(first.multihash()))
        );
    }

    #[test]
    fn test_blob_vector_references_picture() {
        let message = generate_message_from_vector(&all_vectors()[2]);
        assert_eq!(message.blobs(), vec![roost_core::BlobHash::digest(b"picture")]);
        assert_eq!(
            message.body().get("caption"),
            Some(&BodyValue::Str("say \"hi\"\\\n".into()))
        );
    }

    #[test]
    fn test_json_report() {
        let json = vectors_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), all_vectors().len());
        assert_eq!(parsed[0]["name"], "hello with foo:bar");
    }
}
