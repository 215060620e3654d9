/*
    keys.rs - Key layout of the message stores

    Primary rows:   [User][fid:8][postfix][ts_hash:24]          -> encoded Message
    Set rows:       [User][fid:8][set postfix][slot]            -> ts_hash
    Index rows:     [root][target bytes][fid:8][ts_hash:24]     -> index value
    Event rows:     [HubEvents][id:8]                           -> encoded HubEvent

    Integers are big-endian so byte order matches numeric order.
*/

use crate::core_store::model::{Fid, TsHash, TS_HASH_LENGTH};
use crate::core_store::store::errors::{StoreError, StoreResult};

pub const FID_BYTES: usize = 8;

/// Length of the fid + ts_hash suffix that closes every index key
pub const INDEX_SUFFIX_LENGTH: usize = FID_BYTES + TS_HASH_LENGTH;

/// First byte of every key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RootPrefix {
    User = 1,
    CastsByParent = 2,
    CastsByMention = 3,
    ReactionsByTarget = 4,
    HubEvents = 5,
}

/// Byte after the fid in per-user keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UserPostfix {
    CastMessage = 1,
    ReactionMessage = 3,
    VerificationMessage = 4,
    SignerMessage = 5,
    UserDataMessage = 6,

    CastAdds = 40,
    CastRemoves = 41,
    ReactionAdds = 46,
    ReactionRemoves = 47,
    VerificationAdds = 48,
    VerificationRemoves = 49,
    SignerAdds = 50,
    SignerRemoves = 51,
    UserDataAdds = 52,
}

impl UserPostfix {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// [User][fid]
pub fn make_user_key(fid: Fid) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + FID_BYTES);
    key.push(RootPrefix::User as u8);
    key.extend_from_slice(&fid.to_be_bytes());
    key
}

/// [User][fid][postfix], the prefix of all rows of one kind for one user
pub fn make_message_prefix(fid: Fid, postfix: UserPostfix) -> Vec<u8> {
    let mut key = make_user_key(fid);
    key.push(postfix.as_u8());
    key
}

/// [User][fid][postfix][ts_hash]
pub fn make_message_primary_key(fid: Fid, postfix: UserPostfix, ts_hash: &TsHash) -> Vec<u8> {
    let mut key = make_message_prefix(fid, postfix);
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

/// [User][fid][set postfix][slot]
pub fn make_set_key(fid: Fid, set_postfix: UserPostfix, slot: &[u8]) -> Vec<u8> {
    let mut key = make_message_prefix(fid, set_postfix);
    key.extend_from_slice(slot);
    key
}

/// [root][target], the prefix of one secondary index bucket
pub fn make_index_prefix(root: RootPrefix, target: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + target.len() + INDEX_SUFFIX_LENGTH);
    key.push(root as u8);
    key.extend_from_slice(target);
    key
}

/// [root][target][fid][ts_hash]
pub fn make_index_key(root: RootPrefix, target: &[u8], fid: Fid, ts_hash: &TsHash) -> Vec<u8> {
    let mut key = make_index_prefix(root, target);
    key.extend_from_slice(&fid.to_be_bytes());
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

/// Split the trailing [fid][ts_hash] off an index key
pub fn parse_index_suffix(key: &[u8]) -> StoreResult<(Fid, TsHash)> {
    if key.len() < INDEX_SUFFIX_LENGTH {
        return Err(StoreError::Internal(format!(
            "index key too short: {} bytes",
            key.len()
        )));
    }
    let suffix = &key[key.len() - INDEX_SUFFIX_LENGTH..];
    let mut fid = [0u8; FID_BYTES];
    fid.copy_from_slice(&suffix[..FID_BYTES]);
    let ts_hash = TsHash::from_bytes(&suffix[FID_BYTES..])?;
    Ok((Fid::from_be_bytes(fid), ts_hash))
}

pub fn make_hub_event_prefix() -> Vec<u8> {
    vec![RootPrefix::HubEvents as u8]
}

/// [HubEvents][id]
pub fn make_hub_event_key(id: u64) -> Vec<u8> {
    let mut key = make_hub_event_prefix();
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub fn parse_hub_event_id(key: &[u8]) -> StoreResult<u64> {
    let bytes: [u8; 8] = key
        .get(1..)
        .and_then(|rest| rest.try_into().ok())
        .ok_or_else(|| StoreError::Internal(format!("malformed hub event key: {:?}", key)))?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_store::model::MessageHash;

    #[test]
    fn test_primary_key_layout() {
        let ts_hash = TsHash::new(7, &MessageHash::new([1; 20]));
        let key = make_message_primary_key(0x0102, UserPostfix::CastMessage, &ts_hash);
        assert_eq!(key[0], RootPrefix::User as u8);
        assert_eq!(&key[1..9], &[0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(key[9], UserPostfix::CastMessage as u8);
        assert_eq!(&key[10..], ts_hash.as_bytes());
    }

    #[test]
    fn test_fid_order_is_numeric() {
        assert!(make_user_key(255) < make_user_key(256));
    }

    #[test]
    fn test_index_suffix_roundtrip() {
        let ts_hash = TsHash::new(99, &MessageHash::new([5; 20]));
        let key = make_index_key(RootPrefix::CastsByMention, &[0xaa; 8], 42, &ts_hash);
        assert!(key.starts_with(&make_index_prefix(RootPrefix::CastsByMention, &[0xaa; 8])));
        assert_eq!(parse_index_suffix(&key).unwrap(), (42, ts_hash));
        assert!(parse_index_suffix(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_hub_event_key() {
        let key = make_hub_event_key(300);
        assert_eq!(parse_hub_event_id(&key).unwrap(), 300);
        assert!(make_hub_event_key(255) < make_hub_event_key(256));
        assert!(parse_hub_event_id(&[5, 1]).is_err());
    }
}
