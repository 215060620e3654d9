/*
    memory.rs - In-process KvStore backed by a BTreeMap
*/

use super::{increment_prefix, BatchOp, KvPair, KvStore, WriteBatch};
use crate::core_store::store::errors::{handle_poison, StoreResult};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryKv {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.map.read().map_err(handle_poison)?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.map.read().map_err(handle_poison)?.get(key).cloned())
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut map = self.map.write().map_err(handle_poison)?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan(
        &self,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        reverse: bool,
        limit: usize,
    ) -> StoreResult<Vec<KvPair>> {
        let map = self.map.read().map_err(handle_poison)?;

        // One-sided ranges only: BTreeMap::range panics on inverted bounds.
        let pairs = if reverse {
            let upper = match (start_after, increment_prefix(prefix)) {
                (Some(cursor), Some(end)) if cursor < end.as_slice() => {
                    Bound::Excluded(cursor.to_vec())
                }
                (Some(cursor), None) => Bound::Excluded(cursor.to_vec()),
                (_, Some(end)) => Bound::Excluded(end),
                (None, None) => Bound::Unbounded,
            };
            map.range((Bound::Unbounded, upper))
                .rev()
                .take_while(|(key, _)| key.starts_with(prefix))
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        } else {
            let lower = match start_after {
                Some(cursor) if cursor >= prefix => Bound::Excluded(cursor.to_vec()),
                _ => Bound::Included(prefix.to_vec()),
            };
            map.range((lower, Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(prefix))
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        Ok(pairs)
    }
}
