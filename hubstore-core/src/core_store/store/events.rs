/*
    events.rs - Hub events emitted by the message stores

    Every committed state change produces exactly one HubEvent. The id is the
    event's position in the durable event log and doubles as its sequence
    number: ids start at 1 and grow by one per commit.
*/

use crate::core_store::model::Message;
use crate::core_store::store::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HubEventType {
    MergeMessage = 1,
    PruneMessage = 2,
    RevokeMessage = 3,
}

impl HubEventType {
    pub const ALL: [HubEventType; 3] =
        [HubEventType::MergeMessage, HubEventType::PruneMessage, HubEventType::RevokeMessage];

    pub fn name(self) -> &'static str {
        match self {
            HubEventType::MergeMessage => "merge_message",
            HubEventType::PruneMessage => "prune_message",
            HubEventType::RevokeMessage => "revoke_message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubEventBody {
    /// `message` was merged; `deleted_messages` lost conflict resolution to it
    MergeMessage { message: Message, deleted_messages: Vec<Message> },
    /// `message` was evicted by size or age limits
    PruneMessage { message: Message },
    /// `message` was deleted because its signer was revoked
    RevokeMessage { message: Message },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubEvent {
    /// Assigned at commit; 0 until then
    pub id: u64,
    pub body: HubEventBody,
}

impl HubEvent {
    pub fn merge(message: Message, deleted_messages: Vec<Message>) -> Self {
        HubEvent { id: 0, body: HubEventBody::MergeMessage { message, deleted_messages } }
    }

    pub fn prune(message: Message) -> Self {
        HubEvent { id: 0, body: HubEventBody::PruneMessage { message } }
    }

    pub fn revoke(message: Message) -> Self {
        HubEvent { id: 0, body: HubEventBody::RevokeMessage { message } }
    }

    pub fn event_type(&self) -> HubEventType {
        match self.body {
            HubEventBody::MergeMessage { .. } => HubEventType::MergeMessage,
            HubEventBody::PruneMessage { .. } => HubEventType::PruneMessage,
            HubEventBody::RevokeMessage { .. } => HubEventType::RevokeMessage,
        }
    }

    /// The message the event is about
    pub fn message(&self) -> &Message {
        match &self.body {
            HubEventBody::MergeMessage { message, .. }
            | HubEventBody::PruneMessage { message }
            | HubEventBody::RevokeMessage { message } => message,
        }
    }

    pub fn deleted_messages(&self) -> &[Message] {
        match &self.body {
            HubEventBody::MergeMessage { deleted_messages, .. } => deleted_messages,
            _ => &[],
        }
    }

    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| StoreError::Serialization(format!("invalid hub event bytes: {}", e)))
    }
}
