//! Cryptographic primitives: Ed25519 signing and SHA-256 hashing.
//!
//! Wraps ed25519-dalek and sha2 behind the reference types in [`crate::types`].

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::{BlobHash, Identity, MessageHash, Signature};

/// Length of an identity seed in bytes.
pub const SEED_LEN: usize = 32;

/// Compute the SHA-256 digest of data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

impl MessageHash {
    /// Hash a signed canonical rendering.
    pub fn digest(rendering: &[u8]) -> Self {
        Self(sha256(rendering))
    }
}

impl BlobHash {
    /// Hash blob contents.
    pub fn digest(data: &[u8]) -> Self {
        Self(sha256(data))
    }
}

impl Identity {
    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = DalekSignature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }

    /// Verify, returning a plain boolean.
    pub fn is_valid_signature(&self, message: &[u8], signature: &Signature) -> bool {
        self.verify(message, signature).is_ok()
    }
}

/// The local identity: a signing key derived from a 32-byte seed.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// The public identity.
    pub fn identity(&self) -> Identity {
        Identity(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// The raw seed (secret key material).
    pub fn seed(&self) -> [u8; SEED_LEN] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.identity())
    }
}
