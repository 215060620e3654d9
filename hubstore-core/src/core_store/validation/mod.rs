/*
    Validation subsystem - Envelope checks and external collaborators

    The stores only see messages that passed `MessageValidator`: correct
    network, recomputed hash, valid signature. Whether a signer is authorised
    and who owns an fname are answered by collaborator traits, so tests and
    embedders can plug in their own sources.
*/

pub mod crypto;

pub use crypto::{Blake3Hasher, Ed25519Verifier};

use crate::core_store::model::{Fid, Message, MessageHash, Network, SignatureScheme};
use crate::core_store::store::errors::{handle_poison, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub trait MessageHasher: Send + Sync {
    fn hash(&self, bytes: &[u8]) -> MessageHash;
}

pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        public_key: &[u8],
        hash: &MessageHash,
        signature: &[u8],
        scheme: SignatureScheme,
    ) -> bool;
}

/// Name registry lookups for FNAME user data
pub trait NameRegistry: Send + Sync {
    /// Fid that currently owns `name`, if registered
    fn owner_of(&self, name: &str) -> StoreResult<Option<Fid>>;
}

/// Answers whether a key may act as a signer for an fid.
///
/// Consulted for SignerAdd and SignerRemove messages, which are signed by the
/// fid's custody key rather than by a delegated signer.
pub trait SignerAuthority: Send + Sync {
    fn is_authorized(&self, fid: Fid, signer: &[u8], timestamp: u32) -> StoreResult<bool>;
}

/// In-memory name registry
#[derive(Debug, Default)]
pub struct MemoryNameRegistry {
    owners: RwLock<HashMap<String, Fid>>,
}

impl MemoryNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, owner: Fid) -> StoreResult<()> {
        self.owners.write().map_err(handle_poison)?.insert(name.into(), owner);
        Ok(())
    }
}

impl NameRegistry for MemoryNameRegistry {
    fn owner_of(&self, name: &str) -> StoreResult<Option<Fid>> {
        Ok(self.owners.read().map_err(handle_poison)?.get(name).copied())
    }
}

/// In-memory custody key table
#[derive(Debug, Default)]
pub struct MemorySignerAuthority {
    custody: RwLock<HashMap<Fid, Vec<u8>>>,
}

impl MemorySignerAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_custody_key(&self, fid: Fid, key: Vec<u8>) -> StoreResult<()> {
        self.custody.write().map_err(handle_poison)?.insert(fid, key);
        Ok(())
    }
}

impl SignerAuthority for MemorySignerAuthority {
    fn is_authorized(&self, fid: Fid, signer: &[u8], _timestamp: u32) -> StoreResult<bool> {
        let custody = self.custody.read().map_err(handle_poison)?;
        Ok(custody.get(&fid).is_some_and(|key| key.as_slice() == signer))
    }
}

/// Structural and cryptographic envelope checks
#[derive(Clone)]
pub struct MessageValidator {
    network: Network,
    hasher: Arc<dyn MessageHasher>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl MessageValidator {
    /// Validator using blake3 and Ed25519
    pub fn new(network: Network) -> Self {
        MessageValidator {
            network,
            hasher: Arc::new(Blake3Hasher),
            verifier: Arc::new(Ed25519Verifier),
        }
    }

    pub fn with_primitives(
        network: Network,
        hasher: Arc<dyn MessageHasher>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        MessageValidator { network, hasher, verifier }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn validate(&self, message: &Message) -> StoreResult<()> {
        if message.fid() == 0 {
            return Err(StoreError::Validation("fid must be positive".to_string()));
        }
        if message.data.network != self.network {
            return Err(StoreError::Validation(format!(
                "message is for {:?}, expected {:?}",
                message.data.network, self.network
            )));
        }
        if !message.data.body.matches(message.message_type()) {
            return Err(StoreError::Validation(format!(
                "body does not match message type {}",
                message.message_type()
            )));
        }

        let expected = self.hasher.hash(&message.data.encode()?);
        if expected != message.hash {
            return Err(StoreError::Validation(format!(
                "hash mismatch: expected {}, got {}",
                expected, message.hash
            )));
        }

        if !self.verifier.verify(
            &message.signer,
            &message.hash,
            &message.signature,
            message.signature_scheme,
        ) {
            return Err(StoreError::Validation("invalid signature".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_name_registry() {
        let registry = MemoryNameRegistry::new();
        registry.register("alice", 7).unwrap();
        assert_eq!(registry.owner_of("alice").unwrap(), Some(7));
        assert_eq!(registry.owner_of("bob").unwrap(), None);
    }

    #[test]
    fn test_memory_signer_authority() {
        let authority = MemorySignerAuthority::new();
        authority.set_custody_key(7, vec![1; 32]).unwrap();
        assert!(authority.is_authorized(7, &[1; 32], 0).unwrap());
        assert!(!authority.is_authorized(7, &[2; 32], 0).unwrap());
        assert!(!authority.is_authorized(8, &[1; 32], 0).unwrap());
    }
}
