/*
    user_data.rs - Profile fields, add-only

    Slot: [user data type]. A later UserDataAdd for the same type supersedes
    the earlier one under the usual timestamp/hash rule.
*/

use crate::core_store::crdt::StoreDef;
use crate::core_store::model::{Fid, Message, MessageBody, MessageType, UserDataType};
use crate::core_store::store::keys::UserPostfix;
use crate::core_store::store::{MessagesPage, PageOptions, Store, StoreError, StoreResult};
use crate::core_store::validation::NameRegistry;
use std::sync::Arc;

pub const MAX_USER_DATA_BYTES: usize = 256;
pub const MAX_FNAME_BYTES: usize = 16;

#[derive(Clone, Default)]
pub struct UserDataStoreDef {
    name_registry: Option<Arc<dyn NameRegistry>>,
}

pub type UserDataStore = Store<UserDataStoreDef>;

impl UserDataStoreDef {
    pub fn new(name_registry: Option<Arc<dyn NameRegistry>>) -> Self {
        UserDataStoreDef { name_registry }
    }

    fn validate_fname(&self, fid: Fid, name: &str) -> StoreResult<()> {
        // Empty clears the name
        if name.is_empty() {
            return Ok(());
        }
        let well_formed = name.len() <= MAX_FNAME_BYTES
            && name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !well_formed {
            return Err(StoreError::Validation(format!(
                "fname must match [a-z0-9-]{{1,{}}}: {:?}",
                MAX_FNAME_BYTES, name
            )));
        }
        if let Some(registry) = &self.name_registry {
            match registry.owner_of(name)? {
                Some(owner) if owner == fid => {}
                Some(owner) => {
                    return Err(StoreError::Validation(format!(
                        "fname {} is owned by fid {}",
                        name, owner
                    )))
                }
                None => {
                    return Err(StoreError::Validation(format!("fname {} is not registered", name)))
                }
            }
        }
        Ok(())
    }
}

impl StoreDef for UserDataStoreDef {
    fn name(&self) -> &'static str {
        "user_data"
    }

    fn postfix(&self) -> UserPostfix {
        UserPostfix::UserDataMessage
    }

    fn add_message_type(&self) -> MessageType {
        MessageType::UserDataAdd
    }

    fn remove_message_type(&self) -> Option<MessageType> {
        None
    }

    fn add_set_postfix(&self) -> UserPostfix {
        UserPostfix::UserDataAdds
    }

    fn remove_set_postfix(&self) -> Option<UserPostfix> {
        None
    }

    fn slot_key(&self, message: &Message) -> StoreResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::UserData(body) => Ok(vec![body.user_data_type.as_u8()]),
            _ => Err(StoreError::InvalidArgument(
                "user data store requires a user data body".to_string(),
            )),
        }
    }

    fn validate(&self, message: &Message) -> StoreResult<()> {
        let Some(body) = message.user_data_body() else {
            return Ok(());
        };
        if body.value.len() > MAX_USER_DATA_BYTES {
            return Err(StoreError::Validation(format!(
                "value is {} bytes, max {}",
                body.value.len(),
                MAX_USER_DATA_BYTES
            )));
        }
        if body.user_data_type == UserDataType::Fname {
            self.validate_fname(message.fid(), &body.value)?;
        }
        Ok(())
    }
}

impl Store<UserDataStoreDef> {
    pub fn get_user_data_add(&self, fid: Fid, user_data_type: UserDataType) -> StoreResult<Message> {
        self.get_add(fid, &[user_data_type.as_u8()])
    }

    pub fn get_user_data_adds_by_fid(&self, fid: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        self.get_adds_by_fid(fid, page)
    }
}
