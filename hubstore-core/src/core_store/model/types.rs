/*
    types.rs - Common types for core_store models

    Defines:
    - Fids and message hashes
    - Message type and scheme enums
    - Reaction and user data enums
    - Cast ids
*/

use crate::core_store::store::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric account identifier of an author
pub type Fid = u64;

/// Length of a message hash in bytes (blake3 truncated to 160 bits)
pub const HASH_LENGTH: usize = 20;

/// 20-byte message digest
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MessageHash(pub [u8; HASH_LENGTH]);

impl MessageHash {
    pub fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        MessageHash(bytes)
    }

    /// Parse a hash from a byte slice, rejecting any other length
    pub fn from_slice(bytes: &[u8]) -> StoreResult<Self> {
        let array: [u8; HASH_LENGTH] = bytes.try_into().map_err(|_| {
            StoreError::InvalidArgument(format!(
                "hash must be {} bytes, got {}",
                HASH_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(MessageHash(array))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageHash(0x{})", self.to_hex())
    }
}

impl fmt::Display for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Type of a protocol message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    CastAdd = 1,
    CastRemove = 2,
    ReactionAdd = 3,
    ReactionRemove = 4,
    VerificationAdd = 7,
    VerificationRemove = 8,
    SignerAdd = 9,
    SignerRemove = 10,
    UserDataAdd = 11,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::CastAdd => "CastAdd",
            MessageType::CastRemove => "CastRemove",
            MessageType::ReactionAdd => "ReactionAdd",
            MessageType::ReactionRemove => "ReactionRemove",
            MessageType::VerificationAdd => "VerificationAdd",
            MessageType::VerificationRemove => "VerificationRemove",
            MessageType::SignerAdd => "SignerAdd",
            MessageType::SignerRemove => "SignerRemove",
            MessageType::UserDataAdd => "UserDataAdd",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Network a message was signed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    #[default]
    Devnet,
}

impl std::str::FromStr for Network {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            other => Err(StoreError::InvalidArgument(format!("unknown network: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashScheme {
    #[default]
    Blake3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureScheme {
    #[default]
    Ed25519,
}

/// Kind of reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReactionType {
    Like = 1,
    Recast = 2,
}

impl ReactionType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Profile field set by a UserDataAdd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UserDataType {
    Pfp = 1,
    Display = 2,
    Bio = 3,
    Url = 5,
    Fname = 6,
}

impl UserDataType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Identifies a cast by its author and hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CastId {
    pub fid: Fid,
    pub hash: MessageHash,
}

impl CastId {
    pub fn new(fid: Fid, hash: MessageHash) -> Self {
        CastId { fid, hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_from_slice_rejects_wrong_length() {
        assert!(MessageHash::from_slice(&[0u8; 19]).is_err());
        assert!(MessageHash::from_slice(&[0u8; 21]).is_err());
        let hash = MessageHash::from_slice(&[7u8; 20]).unwrap();
        assert_eq!(hash.as_bytes(), &[7u8; 20]);
    }

    #[test]
    fn test_hash_display_is_hex() {
        let hash = MessageHash::new([0xab; 20]);
        assert_eq!(hash.to_string(), format!("0x{}", "ab".repeat(20)));
    }

    #[test]
    fn test_message_type_wire_values() {
        assert_eq!(MessageType::CastAdd.as_u8(), 1);
        assert_eq!(MessageType::SignerRemove.as_u8(), 10);
        assert_eq!(MessageType::UserDataAdd.as_u8(), 11);
        assert_eq!(MessageType::ReactionRemove.name(), "ReactionRemove");
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("devnet".parse::<Network>().unwrap(), Network::Devnet);
        assert!("moon".parse::<Network>().is_err());
    }
}
