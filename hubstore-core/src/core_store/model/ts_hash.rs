/*
    ts_hash.rs - Time-hash ordering key

    A TsHash is the big-endian u32 timestamp followed by the 20-byte message
    hash. Ordering is plain byte order over the 24 bytes, which is the order the
    sync layer relies on.
*/

use super::types::{MessageHash, HASH_LENGTH};
use crate::core_store::store::errors::{StoreError, StoreResult};
use std::fmt;

pub const TIMESTAMP_LENGTH: usize = 4;
pub const TS_HASH_LENGTH: usize = TIMESTAMP_LENGTH + HASH_LENGTH;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TsHash([u8; TS_HASH_LENGTH]);

impl TsHash {
    pub fn new(timestamp: u32, hash: &MessageHash) -> Self {
        let mut bytes = [0u8; TS_HASH_LENGTH];
        bytes[..TIMESTAMP_LENGTH].copy_from_slice(&timestamp.to_be_bytes());
        bytes[TIMESTAMP_LENGTH..].copy_from_slice(hash.as_bytes());
        TsHash(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> StoreResult<Self> {
        let array: [u8; TS_HASH_LENGTH] = bytes.try_into().map_err(|_| {
            StoreError::InvalidArgument(format!(
                "ts_hash must be {} bytes, got {}",
                TS_HASH_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(TsHash(array))
    }

    pub fn timestamp(&self) -> u32 {
        let mut ts = [0u8; TIMESTAMP_LENGTH];
        ts.copy_from_slice(&self.0[..TIMESTAMP_LENGTH]);
        u32::from_be_bytes(ts)
    }

    pub fn hash(&self) -> MessageHash {
        let mut hash = [0u8; HASH_LENGTH];
        hash.copy_from_slice(&self.0[TIMESTAMP_LENGTH..]);
        MessageHash::new(hash)
    }

    pub fn as_bytes(&self) -> &[u8; TS_HASH_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for TsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TsHash({}, {})", self.timestamp(), self.hash())
    }
}
