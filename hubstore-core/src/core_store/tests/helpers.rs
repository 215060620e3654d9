/*
    Shared setup for the scenario tests
*/

use crate::core_store::crdt::StoreDef;
use crate::core_store::kv::{KvPair, KvStore, MemoryKv, WriteBatch};
use crate::core_store::store::{
    PruneLimits, Store, StoreError, StoreEventHandler, StoreResult, DEFAULT_CHANNEL_CAPACITY,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn memory_db() -> Arc<dyn KvStore> {
    Arc::new(MemoryKv::new())
}

pub fn event_handler(db: &Arc<dyn KvStore>) -> Arc<StoreEventHandler> {
    Arc::new(StoreEventHandler::new(Arc::clone(db), DEFAULT_CHANNEL_CAPACITY).unwrap())
}

/// Store over a fresh in-memory substrate with a generous size limit
pub fn new_store<T: StoreDef>(def: T) -> Store<T> {
    new_store_with_limits(def, PruneLimits::new(1_000))
}

pub fn new_store_with_limits<T: StoreDef>(def: T, limits: PruneLimits) -> Store<T> {
    let db = memory_db();
    let handler = event_handler(&db);
    Store::new(def, db, handler, limits)
}

/// Memory substrate whose commits start failing after a budget runs out
pub struct FailingKv {
    inner: MemoryKv,
    commits_left: AtomicUsize,
}

impl FailingKv {
    pub fn new(commits_left: usize) -> Self {
        FailingKv { inner: MemoryKv::new(), commits_left: AtomicUsize::new(commits_left) }
    }

    pub fn set_commits_left(&self, commits_left: usize) {
        self.commits_left.store(commits_left, Ordering::SeqCst);
    }
}

impl KvStore for FailingKv {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let allowed = self
            .commits_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }
        self.inner.commit(batch)
    }

    fn scan(
        &self,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        reverse: bool,
        limit: usize,
    ) -> StoreResult<Vec<KvPair>> {
        self.inner.scan(prefix, start_after, reverse, limit)
    }
}
