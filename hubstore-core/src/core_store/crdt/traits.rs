/*
    traits.rs - Capability interface for a CRDT add/remove set

    A StoreDef tells the generic engine everything that differs between the
    cast, reaction, signer, verification and user data sets:
    - which message types are adds and removes
    - where each set lives in the key space
    - how a message maps to its conflict slot
    - which secondary indices an add maintains
*/

use super::conflict::MessageKind;
use crate::core_store::model::{Message, MessageType, TsHash};
use crate::core_store::store::errors::StoreResult;
use crate::core_store::store::keys::UserPostfix;

/// Secondary index row written alongside an add
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl IndexEntry {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        IndexEntry { key, value }
    }
}

/// Per-kind behaviour plugged into `Store<T>`
pub trait StoreDef: Send + Sync {
    /// Name used in logs and metrics labels
    fn name(&self) -> &'static str;

    /// Postfix under which primary message rows are stored
    fn postfix(&self) -> UserPostfix;

    fn add_message_type(&self) -> MessageType;

    /// None for add-only sets
    fn remove_message_type(&self) -> Option<MessageType>;

    fn add_set_postfix(&self) -> UserPostfix;

    fn remove_set_postfix(&self) -> Option<UserPostfix>;

    /// Key identifying the logical slot a message competes for.
    ///
    /// An add and the remove that targets it must yield the same bytes.
    fn slot_key(&self, message: &Message) -> StoreResult<Vec<u8>>;

    /// Secondary index rows for an add
    fn secondary_index_keys(
        &self,
        _message: &Message,
        _ts_hash: &TsHash,
    ) -> StoreResult<Vec<IndexEntry>> {
        Ok(Vec::new())
    }

    /// Kind-specific structural checks run before conflict resolution
    fn validate(&self, _message: &Message) -> StoreResult<()> {
        Ok(())
    }

    fn message_kind(&self, message_type: MessageType) -> Option<MessageKind> {
        if message_type == self.add_message_type() {
            Some(MessageKind::Add)
        } else if Some(message_type) == self.remove_message_type() {
            Some(MessageKind::Remove)
        } else {
            None
        }
    }

    fn is_add_type(&self, message: &Message) -> bool {
        message.message_type() == self.add_message_type()
    }

    fn is_remove_type(&self, message: &Message) -> bool {
        Some(message.message_type()) == self.remove_message_type()
    }

    fn remove_type_supported(&self) -> bool {
        self.remove_message_type().is_some()
    }
}
