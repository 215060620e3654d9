/*
    CRDT subsystem - Add/remove set semantics shared by every message store
*/

pub mod conflict;
pub mod traits;

pub use conflict::{resolve, Contender, MessageKind, Resolution};
pub use traits::{IndexEntry, StoreDef};
