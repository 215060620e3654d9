/*
    core_store - Per-user CRDT message store

    Conflict-resolving storage for signed protocol messages. Handles:
    - Message model and TsHash ordering keys
    - Add/remove set semantics per message kind
    - Byte-ordered KV substrates (memory, SQLite)
    - Pruning, signer revocation and the sequenced event stream
*/

pub mod clock;
pub mod crdt;
pub mod engine;
pub mod kinds;
pub mod kv;
pub mod model;
pub mod store;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use crdt::{MessageKind, StoreDef};
pub use engine::{StoreSet, StoreSetBuilder, FID_LOCKS_COUNT};
pub use kinds::{CastStore, ReactionStore, SignerStore, UserDataStore, VerificationStore};
pub use kv::{KvStore, MemoryKv, SqliteKv};
pub use model::{Fid, Message, MessageHash, MessageType, TsHash};
pub use store::{
    BulkError, EventSubscription, HubEvent, HubEventType, MessagesPage, PageOptions, StoreError,
    StoreEventHandler, StoreResult,
};
pub use validation::MessageValidator;
