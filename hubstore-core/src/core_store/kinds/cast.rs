/*
    cast.rs - Cast add/remove set

    Slot: the cast hash. A CastAdd occupies its own hash, a CastRemove the
    hash it targets. Adds are indexed by parent and by each mentioned fid.
*/

use crate::core_store::crdt::{IndexEntry, StoreDef};
use crate::core_store::model::{
    CastParent, Fid, Message, MessageBody, MessageHash, MessageType, TsHash,
};
use crate::core_store::store::keys::{make_index_key, make_index_prefix, RootPrefix, UserPostfix};
use crate::core_store::store::{MessagesPage, PageOptions, Store, StoreError, StoreResult};

pub const MAX_CAST_TEXT_BYTES: usize = 320;
pub const MAX_MENTIONS: usize = 10;
pub const MAX_EMBEDS: usize = 2;
pub const MAX_EMBED_BYTES: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct CastStoreDef;

pub type CastStore = Store<CastStoreDef>;

impl StoreDef for CastStoreDef {
    fn name(&self) -> &'static str {
        "casts"
    }

    fn postfix(&self) -> UserPostfix {
        UserPostfix::CastMessage
    }

    fn add_message_type(&self) -> MessageType {
        MessageType::CastAdd
    }

    fn remove_message_type(&self) -> Option<MessageType> {
        Some(MessageType::CastRemove)
    }

    fn add_set_postfix(&self) -> UserPostfix {
        UserPostfix::CastAdds
    }

    fn remove_set_postfix(&self) -> Option<UserPostfix> {
        Some(UserPostfix::CastRemoves)
    }

    fn slot_key(&self, message: &Message) -> StoreResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::CastAdd(_) => Ok(message.hash.as_bytes().to_vec()),
            MessageBody::CastRemove(body) => Ok(body.target_hash.as_bytes().to_vec()),
            _ => Err(StoreError::InvalidArgument("cast store requires a cast body".to_string())),
        }
    }

    fn secondary_index_keys(&self, message: &Message, ts_hash: &TsHash) -> StoreResult<Vec<IndexEntry>> {
        let Some(body) = message.cast_add_body() else {
            return Ok(Vec::new());
        };
        let fid = message.fid();
        let mut entries = Vec::with_capacity(body.mentions.len() + 1);

        if let Some(parent) = &body.parent {
            let key = make_index_key(RootPrefix::CastsByParent, &parent.index_bytes()?, fid, ts_hash);
            entries.push(IndexEntry::new(key, Vec::new()));
        }
        for mention in &body.mentions {
            let key = make_index_key(RootPrefix::CastsByMention, &mention.to_be_bytes(), fid, ts_hash);
            entries.push(IndexEntry::new(key, Vec::new()));
        }
        Ok(entries)
    }

    fn validate(&self, message: &Message) -> StoreResult<()> {
        let Some(body) = message.cast_add_body() else {
            return Ok(());
        };

        if body.text.len() > MAX_CAST_TEXT_BYTES {
            return Err(StoreError::Validation(format!(
                "text is {} bytes, max {}",
                body.text.len(),
                MAX_CAST_TEXT_BYTES
            )));
        }
        if body.mentions.len() > MAX_MENTIONS {
            return Err(StoreError::Validation(format!("more than {} mentions", MAX_MENTIONS)));
        }
        if body.mentions.len() != body.mentions_positions.len() {
            return Err(StoreError::Validation(
                "mentions and mentions_positions differ in length".to_string(),
            ));
        }
        let text_len = body.text.len() as u64;
        let mut previous = 0u32;
        for &position in &body.mentions_positions {
            if u64::from(position) > text_len || position < previous {
                return Err(StoreError::Validation(format!("invalid mention position {}", position)));
            }
            previous = position;
        }
        if body.embeds.len() > MAX_EMBEDS {
            return Err(StoreError::Validation(format!("more than {} embeds", MAX_EMBEDS)));
        }
        if body.embeds.iter().any(|e| e.is_empty() || e.len() > MAX_EMBED_BYTES) {
            return Err(StoreError::Validation(format!(
                "embeds must be 1 to {} bytes",
                MAX_EMBED_BYTES
            )));
        }
        match &body.parent {
            Some(CastParent::Cast(parent)) if parent.fid == 0 => {
                Err(StoreError::Validation("parent fid must be positive".to_string()))
            }
            Some(CastParent::Cast(parent)) if parent.fid == message.fid() && parent.hash == message.hash => {
                Err(StoreError::Validation("cast cannot be its own parent".to_string()))
            }
            Some(CastParent::Url(url)) if url.is_empty() || url.len() > MAX_EMBED_BYTES => Err(
                StoreError::Validation(format!("parent url must be 1 to {} bytes", MAX_EMBED_BYTES)),
            ),
            _ => Ok(()),
        }
    }
}

impl Store<CastStoreDef> {
    pub fn get_cast_add(&self, fid: Fid, hash: &MessageHash) -> StoreResult<Message> {
        self.get_add(fid, hash.as_bytes())
    }

    pub fn get_cast_remove(&self, fid: Fid, target_hash: &MessageHash) -> StoreResult<Message> {
        self.get_remove(fid, target_hash.as_bytes())
    }

    pub fn get_cast_adds_by_fid(&self, fid: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        self.get_adds_by_fid(fid, page)
    }

    pub fn get_cast_removes_by_fid(&self, fid: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        self.get_removes_by_fid(fid, page)
    }

    /// Replies to `parent`, ordered by author fid then TsHash
    pub fn get_casts_by_parent(&self, parent: &CastParent, page: &PageOptions) -> StoreResult<MessagesPage> {
        let prefix = make_index_prefix(RootPrefix::CastsByParent, &parent.index_bytes()?);
        self.get_by_index(&prefix, page, None)
    }

    /// Casts that mention `mention`
    pub fn get_casts_by_mention(&self, mention: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        let prefix = make_index_prefix(RootPrefix::CastsByMention, &mention.to_be_bytes());
        self.get_by_index(&prefix, page, None)
    }
}
