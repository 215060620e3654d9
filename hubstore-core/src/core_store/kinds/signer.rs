/*
    signer.rs - Signer add/remove set

    Slot: the delegated public key. A live SignerAdd authorises the key to
    sign the fid's other messages.
*/

use crate::core_store::crdt::StoreDef;
use crate::core_store::model::{Fid, Message, MessageBody, MessageType};
use crate::core_store::store::keys::UserPostfix;
use crate::core_store::store::{MessagesPage, PageOptions, Store, StoreError, StoreResult};

pub const SIGNER_KEY_LENGTH: usize = 32;
pub const MAX_SIGNER_NAME_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, Default)]
pub struct SignerStoreDef;

pub type SignerStore = Store<SignerStoreDef>;

impl StoreDef for SignerStoreDef {
    fn name(&self) -> &'static str {
        "signers"
    }

    fn postfix(&self) -> UserPostfix {
        UserPostfix::SignerMessage
    }

    fn add_message_type(&self) -> MessageType {
        MessageType::SignerAdd
    }

    fn remove_message_type(&self) -> Option<MessageType> {
        Some(MessageType::SignerRemove)
    }

    fn add_set_postfix(&self) -> UserPostfix {
        UserPostfix::SignerAdds
    }

    fn remove_set_postfix(&self) -> Option<UserPostfix> {
        Some(UserPostfix::SignerRemoves)
    }

    fn slot_key(&self, message: &Message) -> StoreResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::Signer(body) => Ok(body.signer.clone()),
            _ => Err(StoreError::InvalidArgument("signer store requires a signer body".to_string())),
        }
    }

    fn validate(&self, message: &Message) -> StoreResult<()> {
        let Some(body) = message.signer_body() else {
            return Ok(());
        };
        if body.signer.len() != SIGNER_KEY_LENGTH {
            return Err(StoreError::Validation(format!(
                "signer key must be {} bytes, got {}",
                SIGNER_KEY_LENGTH,
                body.signer.len()
            )));
        }
        if body.name.as_ref().is_some_and(|name| name.len() > MAX_SIGNER_NAME_BYTES) {
            return Err(StoreError::Validation(format!(
                "signer name longer than {} bytes",
                MAX_SIGNER_NAME_BYTES
            )));
        }
        Ok(())
    }
}

impl Store<SignerStoreDef> {
    pub fn get_signer_add(&self, fid: Fid, signer: &[u8]) -> StoreResult<Message> {
        self.get_add(fid, signer)
    }

    pub fn get_signer_remove(&self, fid: Fid, signer: &[u8]) -> StoreResult<Message> {
        self.get_remove(fid, signer)
    }

    pub fn get_signer_adds_by_fid(&self, fid: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        self.get_adds_by_fid(fid, page)
    }

    pub fn get_signer_removes_by_fid(&self, fid: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        self.get_removes_by_fid(fid, page)
    }

    /// Whether `signer` currently has a live SignerAdd for `fid`
    pub fn is_active_signer(&self, fid: Fid, signer: &[u8]) -> StoreResult<bool> {
        match self.get_signer_add(fid, signer) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
