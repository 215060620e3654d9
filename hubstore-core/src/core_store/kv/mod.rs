/*
    KV subsystem - Ordered byte-keyed storage under the message stores

    Every store writes through a `KvStore`: an ordered map with prefix scans
    and atomic write batches. Two backends ship:
    - MemoryKv: BTreeMap behind a lock, for tests and ephemeral nodes
    - SqliteKv: a single WITHOUT ROWID table behind an r2d2 pool
*/

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKv;
pub use sqlite::SqliteKv;

use crate::core_store::store::errors::StoreResult;

/// Rows fetched per round-trip by `for_each_by_prefix`
pub const SCAN_CHUNK_SIZE: usize = 256;

/// Key/value pair returned by scans
pub type KvPair = (Vec<u8>, Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Set of writes applied atomically by `KvStore::commit`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { key, value });
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { key });
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Ordered key-value substrate
///
/// Keys compare as unsigned byte strings. Ops inside one `WriteBatch` apply
/// in order, so a delete followed by a put of the same key leaves the put.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Up to `limit` pairs whose key starts with `prefix`.
    ///
    /// Forward scans return keys strictly after `start_after`; reverse scans
    /// return keys strictly before it, newest first.
    fn scan(
        &self,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        reverse: bool,
        limit: usize,
    ) -> StoreResult<Vec<KvPair>>;

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.commit(batch)
    }

    fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Visit every pair under `prefix` in key order until `f` returns true
    fn for_each_by_prefix(
        &self,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        reverse: bool,
        f: &mut dyn FnMut(&[u8], &[u8]) -> StoreResult<bool>,
    ) -> StoreResult<()> {
        let mut cursor = start_after.map(|k| k.to_vec());
        loop {
            let chunk = self.scan(prefix, cursor.as_deref(), reverse, SCAN_CHUNK_SIZE)?;
            let exhausted = chunk.len() < SCAN_CHUNK_SIZE;
            for (key, value) in &chunk {
                if f(key, value)? {
                    return Ok(());
                }
            }
            match chunk.into_iter().last() {
                Some((key, _)) if !exhausted => cursor = Some(key),
                _ => return Ok(()),
            }
        }
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// None when no such key exists (empty prefix or all 0xff bytes).
pub fn increment_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
