//! Hash and signature primitives used by message validation
//!
//! Message hashes are blake3 digests truncated to 160 bits. Signatures are
//! Ed25519 over the 20-byte hash.

use super::{MessageHasher, SignatureVerifier};
use crate::core_store::model::{MessageHash, SignatureScheme, HASH_LENGTH};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl MessageHasher for Blake3Hasher {
    fn hash(&self, bytes: &[u8]) -> MessageHash {
        let digest = blake3::hash(bytes);
        let mut truncated = [0u8; HASH_LENGTH];
        truncated.copy_from_slice(&digest.as_bytes()[..HASH_LENGTH]);
        MessageHash::new(truncated)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(
        &self,
        public_key: &[u8],
        hash: &MessageHash,
        signature: &[u8],
        scheme: SignatureScheme,
    ) -> bool {
        if scheme != SignatureScheme::Ed25519 {
            return false;
        }
        let Ok(key_bytes) = <[u8; ED25519_PUBLIC_KEY_LENGTH]>::try_from(public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(hash.as_bytes(), &signature).is_ok()
    }
}
