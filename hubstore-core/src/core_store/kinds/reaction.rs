/*
    reaction.rs - Reaction add/remove set

    Slot: [reaction type][target bytes]. Adds are indexed by target with the
    reaction type as the index value, so a target listing can be filtered by
    type without loading messages.
*/

use crate::core_store::crdt::{IndexEntry, StoreDef};
use crate::core_store::model::{
    Fid, Message, MessageBody, MessageType, ReactionTarget, ReactionType, TsHash,
};
use crate::core_store::store::keys::{make_index_key, make_index_prefix, RootPrefix, UserPostfix};
use crate::core_store::store::{MessagesPage, PageOptions, Store, StoreError, StoreResult};

pub const MAX_TARGET_URL_BYTES: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReactionStoreDef;

pub type ReactionStore = Store<ReactionStoreDef>;

fn make_slot(reaction_type: ReactionType, target: &ReactionTarget) -> StoreResult<Vec<u8>> {
    let target = target.index_bytes()?;
    let mut slot = Vec::with_capacity(1 + target.len());
    slot.push(reaction_type.as_u8());
    slot.extend_from_slice(&target);
    Ok(slot)
}

impl StoreDef for ReactionStoreDef {
    fn name(&self) -> &'static str {
        "reactions"
    }

    fn postfix(&self) -> UserPostfix {
        UserPostfix::ReactionMessage
    }

    fn add_message_type(&self) -> MessageType {
        MessageType::ReactionAdd
    }

    fn remove_message_type(&self) -> Option<MessageType> {
        Some(MessageType::ReactionRemove)
    }

    fn add_set_postfix(&self) -> UserPostfix {
        UserPostfix::ReactionAdds
    }

    fn remove_set_postfix(&self) -> Option<UserPostfix> {
        Some(UserPostfix::ReactionRemoves)
    }

    fn slot_key(&self, message: &Message) -> StoreResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::Reaction(body) => make_slot(body.reaction_type, &body.target),
            _ => Err(StoreError::InvalidArgument("reaction store requires a reaction body".to_string())),
        }
    }

    fn secondary_index_keys(&self, message: &Message, ts_hash: &TsHash) -> StoreResult<Vec<IndexEntry>> {
        if !self.is_add_type(message) {
            return Ok(Vec::new());
        }
        let Some(body) = message.reaction_body() else {
            return Ok(Vec::new());
        };
        let key = make_index_key(
            RootPrefix::ReactionsByTarget,
            &body.target.index_bytes()?,
            message.fid(),
            ts_hash,
        );
        Ok(vec![IndexEntry::new(key, vec![body.reaction_type.as_u8()])])
    }

    fn validate(&self, message: &Message) -> StoreResult<()> {
        let Some(body) = message.reaction_body() else {
            return Ok(());
        };
        match &body.target {
            ReactionTarget::Cast(cast_id) if cast_id.fid == 0 => {
                Err(StoreError::Validation("target fid must be positive".to_string()))
            }
            ReactionTarget::Url(url) if url.is_empty() || url.len() > MAX_TARGET_URL_BYTES => Err(
                StoreError::Validation(format!("target url must be 1 to {} bytes", MAX_TARGET_URL_BYTES)),
            ),
            _ => Ok(()),
        }
    }
}

impl Store<ReactionStoreDef> {
    pub fn get_reaction_add(
        &self,
        fid: Fid,
        reaction_type: ReactionType,
        target: &ReactionTarget,
    ) -> StoreResult<Message> {
        self.get_add(fid, &make_slot(reaction_type, target)?)
    }

    pub fn get_reaction_remove(
        &self,
        fid: Fid,
        reaction_type: ReactionType,
        target: &ReactionTarget,
    ) -> StoreResult<Message> {
        self.get_remove(fid, &make_slot(reaction_type, target)?)
    }

    pub fn get_reaction_adds_by_fid(
        &self,
        fid: Fid,
        reaction_type: Option<ReactionType>,
        page: &PageOptions,
    ) -> StoreResult<MessagesPage> {
        self.by_fid_of_type(fid, MessageType::ReactionAdd, reaction_type, page)
    }

    pub fn get_reaction_removes_by_fid(
        &self,
        fid: Fid,
        reaction_type: Option<ReactionType>,
        page: &PageOptions,
    ) -> StoreResult<MessagesPage> {
        self.by_fid_of_type(fid, MessageType::ReactionRemove, reaction_type, page)
    }

    fn by_fid_of_type(
        &self,
        fid: Fid,
        message_type: MessageType,
        reaction_type: Option<ReactionType>,
        page: &PageOptions,
    ) -> StoreResult<MessagesPage> {
        self.get_by_fid_filtered(fid, page, &|message: &Message| {
            message.message_type() == message_type
                && match (reaction_type, message.reaction_body()) {
                    (None, _) => true,
                    (Some(wanted), Some(body)) => body.reaction_type == wanted,
                    (Some(_), None) => false,
                }
        })
    }

    /// Live reactions to `target` from any fid, optionally of one type
    pub fn get_reactions_by_target(
        &self,
        target: &ReactionTarget,
        reaction_type: Option<ReactionType>,
        page: &PageOptions,
    ) -> StoreResult<MessagesPage> {
        let prefix = make_index_prefix(RootPrefix::ReactionsByTarget, &target.index_bytes()?);
        match reaction_type {
            Some(wanted) => {
                let filter = move |value: &[u8]| value == [wanted.as_u8()];
                self.get_by_index(&prefix, page, Some(&filter))
            }
            None => self.get_by_index(&prefix, page, None),
        }
    }
}
