/*
    verification.rs - Verified address add/remove set

    Slot: the 20-byte address.
*/

use crate::core_store::crdt::StoreDef;
use crate::core_store::model::{Fid, Message, MessageBody, MessageType};
use crate::core_store::store::keys::UserPostfix;
use crate::core_store::store::{MessagesPage, PageOptions, Store, StoreError, StoreResult};

pub const ADDRESS_LENGTH: usize = 20;
pub const BLOCK_HASH_LENGTH: usize = 32;
pub const MAX_CLAIM_SIGNATURE_BYTES: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationStoreDef;

pub type VerificationStore = Store<VerificationStoreDef>;

fn check_address(address: &[u8]) -> StoreResult<()> {
    if address.len() != ADDRESS_LENGTH {
        return Err(StoreError::Validation(format!(
            "address must be {} bytes, got {}",
            ADDRESS_LENGTH,
            address.len()
        )));
    }
    Ok(())
}

impl StoreDef for VerificationStoreDef {
    fn name(&self) -> &'static str {
        "verifications"
    }

    fn postfix(&self) -> UserPostfix {
        UserPostfix::VerificationMessage
    }

    fn add_message_type(&self) -> MessageType {
        MessageType::VerificationAdd
    }

    fn remove_message_type(&self) -> Option<MessageType> {
        Some(MessageType::VerificationRemove)
    }

    fn add_set_postfix(&self) -> UserPostfix {
        UserPostfix::VerificationAdds
    }

    fn remove_set_postfix(&self) -> Option<UserPostfix> {
        Some(UserPostfix::VerificationRemoves)
    }

    fn slot_key(&self, message: &Message) -> StoreResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::VerificationAdd(body) => Ok(body.address.clone()),
            MessageBody::VerificationRemove(body) => Ok(body.address.clone()),
            _ => Err(StoreError::InvalidArgument(
                "verification store requires a verification body".to_string(),
            )),
        }
    }

    fn validate(&self, message: &Message) -> StoreResult<()> {
        match &message.data.body {
            MessageBody::VerificationAdd(body) => {
                check_address(&body.address)?;
                if body.block_hash.len() != BLOCK_HASH_LENGTH {
                    return Err(StoreError::Validation(format!(
                        "block hash must be {} bytes",
                        BLOCK_HASH_LENGTH
                    )));
                }
                if body.claim_signature.is_empty() || body.claim_signature.len() > MAX_CLAIM_SIGNATURE_BYTES {
                    return Err(StoreError::Validation("invalid claim signature length".to_string()));
                }
                Ok(())
            }
            MessageBody::VerificationRemove(body) => check_address(&body.address),
            _ => Ok(()),
        }
    }
}

impl Store<VerificationStoreDef> {
    pub fn get_verification_add(&self, fid: Fid, address: &[u8]) -> StoreResult<Message> {
        self.get_add(fid, address)
    }

    pub fn get_verification_remove(&self, fid: Fid, address: &[u8]) -> StoreResult<Message> {
        self.get_remove(fid, address)
    }

    pub fn get_verification_adds_by_fid(&self, fid: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        self.get_adds_by_fid(fid, page)
    }

    pub fn get_verification_removes_by_fid(
        &self,
        fid: Fid,
        page: &PageOptions,
    ) -> StoreResult<MessagesPage> {
        self.get_removes_by_fid(fid, page)
    }
}
