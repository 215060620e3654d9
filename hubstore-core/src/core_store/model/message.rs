/*
    message.rs - Signed message envelope and per-kind bodies

    A Message is immutable once signed. `hash` covers the bincode encoding of
    `MessageData`; `signature` is produced by `signer` over that hash.
*/

use super::ts_hash::TsHash;
use super::types::{
    CastId, Fid, HashScheme, MessageHash, MessageType, Network, ReactionType, SignatureScheme,
    UserDataType,
};
use crate::core_store::store::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

const TARGET_TAG_CAST: u8 = 1;
const TARGET_TAG_URL: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub data: MessageData,
    pub hash: MessageHash,
    pub hash_scheme: HashScheme,
    pub signature: Vec<u8>,
    pub signature_scheme: SignatureScheme,
    /// Public key of the key that produced `signature`
    pub signer: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub message_type: MessageType,
    pub fid: Fid,
    /// Protocol-epoch seconds
    pub timestamp: u32,
    pub network: Network,
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    CastAdd(CastAddBody),
    CastRemove(CastRemoveBody),
    /// Shared by ReactionAdd and ReactionRemove
    Reaction(ReactionBody),
    VerificationAdd(VerificationAddBody),
    VerificationRemove(VerificationRemoveBody),
    /// Shared by SignerAdd and SignerRemove
    Signer(SignerBody),
    UserData(UserDataBody),
}

impl MessageBody {
    /// Whether this body is the one a message of `message_type` must carry
    pub fn matches(&self, message_type: MessageType) -> bool {
        matches!(
            (self, message_type),
            (MessageBody::CastAdd(_), MessageType::CastAdd)
                | (MessageBody::CastRemove(_), MessageType::CastRemove)
                | (MessageBody::Reaction(_), MessageType::ReactionAdd)
                | (MessageBody::Reaction(_), MessageType::ReactionRemove)
                | (MessageBody::VerificationAdd(_), MessageType::VerificationAdd)
                | (MessageBody::VerificationRemove(_), MessageType::VerificationRemove)
                | (MessageBody::Signer(_), MessageType::SignerAdd)
                | (MessageBody::Signer(_), MessageType::SignerRemove)
                | (MessageBody::UserData(_), MessageType::UserDataAdd)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastAddBody {
    pub text: String,
    pub mentions: Vec<Fid>,
    /// Byte offsets into `text`, one per mention
    pub mentions_positions: Vec<u32>,
    pub embeds: Vec<String>,
    pub parent: Option<CastParent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastParent {
    Cast(CastId),
    Url(String),
}

impl CastParent {
    /// Prefix-free byte encoding used in secondary index keys
    pub fn index_bytes(&self) -> StoreResult<Vec<u8>> {
        match self {
            CastParent::Cast(cast_id) => Ok(cast_id_bytes(cast_id)),
            CastParent::Url(url) => url_bytes(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastRemoveBody {
    pub target_hash: MessageHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionBody {
    pub reaction_type: ReactionType,
    pub target: ReactionTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionTarget {
    Cast(CastId),
    Url(String),
}

impl ReactionTarget {
    /// Prefix-free byte encoding used in slot and index keys
    pub fn index_bytes(&self) -> StoreResult<Vec<u8>> {
        match self {
            ReactionTarget::Cast(cast_id) => Ok(cast_id_bytes(cast_id)),
            ReactionTarget::Url(url) => url_bytes(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAddBody {
    pub address: Vec<u8>,
    pub claim_signature: Vec<u8>,
    pub block_hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRemoveBody {
    pub address: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerBody {
    /// Delegated Ed25519 public key being granted or revoked
    pub signer: Vec<u8>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataBody {
    pub user_data_type: UserDataType,
    pub value: String,
}

fn cast_id_bytes(cast_id: &CastId) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + 8 + 20);
    bytes.push(TARGET_TAG_CAST);
    bytes.extend_from_slice(&cast_id.fid.to_be_bytes());
    bytes.extend_from_slice(cast_id.hash.as_bytes());
    bytes
}

// Length prefix keeps one url from being a key prefix of another.
fn url_bytes(url: &str) -> StoreResult<Vec<u8>> {
    let len = u16::try_from(url.len()).map_err(|_| {
        StoreError::InvalidArgument(format!("url of {} bytes is too long to index", url.len()))
    })?;
    let mut bytes = Vec::with_capacity(3 + url.len());
    bytes.push(TARGET_TAG_URL);
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(url.as_bytes());
    Ok(bytes)
}

impl MessageData {
    /// Bytes covered by the message hash
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

impl Message {
    pub fn fid(&self) -> Fid {
        self.data.fid
    }

    pub fn timestamp(&self) -> u32 {
        self.data.timestamp
    }

    pub fn message_type(&self) -> MessageType {
        self.data.message_type
    }

    pub fn ts_hash(&self) -> TsHash {
        TsHash::new(self.data.timestamp, &self.hash)
    }

    pub fn hex_hash(&self) -> String {
        self.hash.to_hex()
    }

    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| StoreError::Serialization(format!("invalid message bytes: {}", e)))
    }

    pub fn cast_add_body(&self) -> Option<&CastAddBody> {
        match &self.data.body {
            MessageBody::CastAdd(body) => Some(body),
            _ => None,
        }
    }

    pub fn reaction_body(&self) -> Option<&ReactionBody> {
        match &self.data.body {
            MessageBody::Reaction(body) => Some(body),
            _ => None,
        }
    }

    pub fn signer_body(&self) -> Option<&SignerBody> {
        match &self.data.body {
            MessageBody::Signer(body) => Some(body),
            _ => None,
        }
    }

    pub fn user_data_body(&self) -> Option<&UserDataBody> {
        match &self.data.body {
            MessageBody::UserData(body) => Some(body),
            _ => None,
        }
    }
}
