/*
    conflict.rs - Last-write-wins ordering for add/remove sets

    Two messages that occupy the same slot are compared by:
    1. timestamp, later wins
    2. kind, Remove wins over Add at equal timestamps
    3. hash, lexicographically greater wins

    Identical (kind, ts_hash) pairs are duplicates. The order is total, so any
    two replicas that see the same set of messages keep the same winner no
    matter the arrival order.
*/

use crate::core_store::model::TsHash;
use std::cmp::Ordering;

/// Side of the set a message lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Add,
    Remove,
}

impl MessageKind {
    fn rank(self) -> u8 {
        match self {
            MessageKind::Add => 0,
            MessageKind::Remove => 1,
        }
    }
}

/// A message competing for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contender {
    pub kind: MessageKind,
    pub ts_hash: TsHash,
}

impl Contender {
    pub fn new(kind: MessageKind, ts_hash: TsHash) -> Self {
        Contender { kind, ts_hash }
    }
}

impl Ord for Contender {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ts_hash
            .timestamp()
            .cmp(&other.ts_hash.timestamp())
            .then_with(|| self.kind.rank().cmp(&other.kind.rank()))
            .then_with(|| self.ts_hash.hash().cmp(&other.ts_hash.hash()))
    }
}

impl PartialOrd for Contender {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Outcome of comparing an incoming message against a stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Incoming replaces the stored message
    Wins,
    /// Stored message stays, incoming is rejected
    Loses,
    /// Same message
    Duplicate,
}

/// Resolve `incoming` against `existing` for the same slot
pub fn resolve(incoming: &Contender, existing: &Contender) -> Resolution {
    match incoming.cmp(existing) {
        Ordering::Greater => Resolution::Wins,
        Ordering::Less => Resolution::Loses,
        Ordering::Equal => Resolution::Duplicate,
    }
}
