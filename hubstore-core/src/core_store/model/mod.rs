/*
    Model subsystem - Message envelope, bodies and the TsHash ordering key
*/

pub mod message;
pub mod ts_hash;
pub mod types;

pub use message::*;
pub use ts_hash::{TsHash, TS_HASH_LENGTH};
pub use types::*;
