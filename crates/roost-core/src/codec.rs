//! Crockford-style base32 and multihash sigil handling.
//!
//! The alphabet drops `I`, `L`, `O` and `U`. Decoding is case-insensitive and
//! folds the look-alike glyphs back onto their canonical symbols, so a digest
//! copied by hand still decodes. Encoding is MSB-first with the final group
//! zero-padded on the right; decoding drops any trailing partial byte.

use crate::error::CoreError;

/// The 32 canonical symbols, indexed by 5-bit value.
pub const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Sigil prefixed to identity (public key) references.
pub const IDENTITY_SIGIL: &str = "USER.";
/// Sigil prefixed to message references.
pub const MESSAGE_SIGIL: &str = "TEXT.";
/// Sigil prefixed to blob references.
pub const BLOB_SIGIL: &str = "FILE.";

/// Type suffix of identity references.
pub const IDENTITY_SUFFIX: &str = ".ed25519";
/// Type suffix of message and blob references.
pub const DIGEST_SUFFIX: &str = ".sha256";
/// Type suffix of signatures.
pub const SIGNATURE_SUFFIX: &str = ".sig.ed25519";

const SIGILS: [&str; 3] = [IDENTITY_SIGIL, MESSAGE_SIGIL, BLOB_SIGIL];
// Longest first: ".sig.ed25519" must win over ".ed25519".
const SUFFIXES: [&str; 3] = [SIGNATURE_SUFFIX, IDENTITY_SUFFIX, DIGEST_SUFFIX];

/// Encode bytes to base32.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(encoded_len(data.len()));
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}

/// Decode base32 text, folding case and look-alike glyphs.
pub fn decode(text: &str) -> Result<Vec<u8>, CoreError> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for (offset, ch) in text.chars().enumerate() {
        let value = symbol_value(ch).ok_or(CoreError::InvalidSymbol { symbol: ch, offset })?;
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(out)
}

/// Number of symbols needed to encode `len` bytes.
pub const fn encoded_len(len: usize) -> usize {
    (len * 8 + 4) / 5
}

/// Strip a recognized sigil and type suffix, then decode the remainder.
///
/// Input without a recognized sigil is decoded whole (after suffix removal).
pub fn decode_multihash(text: &str) -> Result<Vec<u8>, CoreError> {
    let body = SIGILS
        .iter()
        .find_map(|sigil| text.strip_prefix(sigil))
        .unwrap_or(text);
    let body = SUFFIXES
        .iter()
        .find_map(|suffix| body.strip_suffix(suffix))
        .unwrap_or(body);
    decode(body)
}

/// Whether `text` is made only of canonical (upper-case, unfolded) symbols.
pub fn is_canonical(text: &str) -> bool {
    text.bytes().all(|b| ALPHABET.contains(&b))
}

fn symbol_value(ch: char) -> Option<u8> {
    let folded = match ch.to_ascii_uppercase() {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    if !folded.is_ascii() {
        return None;
    }
    ALPHABET
        .iter()
        .position(|&b| b == folded as u8)
        .map(|p| p as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(&[0x00]), "00");
        assert_eq!(encode(&[0xff]), "ZW");
        assert_eq!(encode(b"f"), "CR");
        assert_eq!(encode(&[0xff; 5]), "ZZZZZZZZ");
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(encode(&[0xab; 32]).len(), 52);
        assert_eq!(encode(&[0xab; 64]).len(), 103);
        assert_eq!(encoded_len(32), 52);
        assert_eq!(encoded_len(64), 103);
    }

    #[test]
    fn test_decode_folds_lookalikes() {
        let canonical = encode(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        let sloppy = canonical.to_lowercase().replace('0', "o").replace('1', "l");
        assert_eq!(decode(&sloppy).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_decode_rejects_unknown_symbol() {
        let err = decode("AB-C").unwrap_err();
        assert!(matches!(err, CoreError::InvalidSymbol { symbol: '-', offset: 2 }));
        assert!(decode("U").is_err());
    }

    #[test]
    fn test_decode_multihash_strips_sigil_and_suffix() {
        let digest = [0x42u8; 32];
        let b32 = encode(&digest);

        for text in [
            format!("{IDENTITY_SIGIL}{b32}{IDENTITY_SUFFIX}"),
            format!("{MESSAGE_SIGIL}{b32}{DIGEST_SUFFIX}"),
            format!("{BLOB_SIGIL}{b32}{DIGEST_SUFFIX}"),
            format!("{BLOB_SIGIL}{b32}"),
            b32.clone(),
        ] {
            assert_eq!(decode_multihash(&text).unwrap(), digest.to_vec(), "{text}");
        }

        let sig = [0x17u8; 64];
        let text = format!("{}{SIGNATURE_SUFFIX}", encode(&sig));
        assert_eq!(decode_multihash(&text).unwrap(), sig.to_vec());
    }

    #[test]
    fn test_is_canonical() {
        assert!(is_canonical("0123ABCZ"));
        assert!(!is_canonical("abc"));
        assert!(!is_canonical("O0"));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(decode(&encode(&data)).unwrap(), data);
        }

        #[test]
        fn prop_encoding_is_canonical(data in prop::collection::vec(any::<u8>(), 0..64)) {
            let text = encode(&data);
            prop_assert!(is_canonical(&text));
            prop_assert_eq!(text.len(), encoded_len(data.len()));
        }
    }
}
