/*
    event_handler.rs - Sequencing and fan-out of hub events

    Every accepted mutation goes through `commit_transaction`, which:
    1. assigns the next sequence id
    2. appends the event to the durable log in the same atomic batch as the
       state change
    3. publishes it on the bounded broadcast queue
    4. runs the synchronous listeners for its type, in registration order

    The sequence lock is held across all four steps, so listeners and queue
    consumers observe events in id order. Listeners must not call back into
    a store.
*/

use super::errors::{handle_poison, StoreResult};
use super::events::{HubEvent, HubEventType};
use super::keys::{make_hub_event_key, make_hub_event_prefix, parse_hub_event_id};
use super::subscription::EventSubscription;
use crate::core_store::kv::{KvStore, WriteBatch};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Default bounded queue size
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

pub type ListenerId = u64;

/// Synchronous event callback
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &HubEvent) -> StoreResult<()>;
}

impl<F> EventListener for F
where
    F: Fn(&HubEvent) -> StoreResult<()> + Send + Sync,
{
    fn on_event(&self, event: &HubEvent) -> StoreResult<()> {
        self(event)
    }
}

struct RegisteredListener {
    id: ListenerId,
    event_type: HubEventType,
    listener: Arc<dyn EventListener>,
}

pub struct StoreEventHandler {
    db: Arc<dyn KvStore>,
    last_id: Mutex<u64>,
    listeners: RwLock<Vec<RegisteredListener>>,
    next_listener_id: AtomicU64,
    tx: broadcast::Sender<HubEvent>,
}

impl StoreEventHandler {
    /// Create a handler, resuming the sequence after the last stored event
    pub fn new(db: Arc<dyn KvStore>, channel_capacity: usize) -> StoreResult<Self> {
        let last_id = match db.scan(&make_hub_event_prefix(), None, true, 1)?.first() {
            Some((key, _)) => parse_hub_event_id(key)?,
            None => 0,
        };
        if last_id > 0 {
            info!(last_event_id = last_id, "resuming hub event sequence");
        }

        let (tx, _rx) = broadcast::channel(channel_capacity.max(1));
        Ok(StoreEventHandler {
            db,
            last_id: Mutex::new(last_id),
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            tx,
        })
    }

    /// Atomically apply `batch` together with `event`, then publish it.
    ///
    /// Returns the event with its id set. A listener error is returned after
    /// the commit; the state change and the log entry are already durable.
    pub fn commit_transaction(&self, mut batch: WriteBatch, mut event: HubEvent) -> StoreResult<HubEvent> {
        let mut last_id = self.last_id.lock().map_err(handle_poison)?;
        let id = *last_id + 1;
        event.id = id;

        batch.put(make_hub_event_key(id), event.encode()?);
        self.db.commit(batch)?;
        *last_id = id;

        debug!(event_id = id, event_type = event.event_type().name(), "committed hub event");

        // No receivers is not an error
        let _ = self.tx.send(event.clone());

        self.dispatch(&event)?;
        Ok(event)
    }

    fn dispatch(&self, event: &HubEvent) -> StoreResult<()> {
        let event_type = event.event_type();
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .map_err(handle_poison)?
            .iter()
            .filter(|l| l.event_type == event_type)
            .map(|l| Arc::clone(&l.listener))
            .collect();

        for listener in listeners {
            listener.on_event(event)?;
        }
        Ok(())
    }

    pub fn register_listener(
        &self,
        event_type: HubEventType,
        listener: Arc<dyn EventListener>,
    ) -> StoreResult<ListenerId> {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .map_err(handle_poison)?
            .push(RegisteredListener { id, event_type, listener });
        Ok(id)
    }

    /// Returns false when no listener has `id`
    pub fn unregister_listener(&self, id: ListenerId) -> StoreResult<bool> {
        let mut listeners = self.listeners.write().map_err(handle_poison)?;
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        Ok(listeners.len() != before)
    }

    /// Subscribe to every event committed from now on
    pub fn subscribe(&self) -> StoreResult<EventSubscription> {
        self.subscribe_to(&HubEventType::ALL)
    }

    /// Subscribe to events of the given types committed from now on
    pub fn subscribe_to(&self, event_types: &[HubEventType]) -> StoreResult<EventSubscription> {
        // Holding the sequence lock pins the starting point to the receiver.
        let last_id = self.last_id.lock().map_err(handle_poison)?;
        let rx = self.tx.subscribe();
        Ok(EventSubscription::new(rx, Arc::clone(&self.db), event_types.to_vec(), *last_id))
    }

    /// Persisted events with id > `after`, oldest first
    pub fn get_events(&self, after: u64, limit: usize) -> StoreResult<Vec<HubEvent>> {
        read_events(self.db.as_ref(), after, limit)
    }

    pub fn last_event_id(&self) -> StoreResult<u64> {
        Ok(*self.last_id.lock().map_err(handle_poison)?)
    }

    /// Delete persisted events with id < `before_id`, returning how many went.
    ///
    /// Ids are never reused; the sequence continues from the last id.
    pub fn prune_events(&self, before_id: u64) -> StoreResult<usize> {
        let prefix = make_hub_event_prefix();
        let mut batch = WriteBatch::new();
        self.db.for_each_by_prefix(&prefix, None, false, &mut |key, _| {
            if parse_hub_event_id(key)? >= before_id {
                return Ok(true);
            }
            batch.delete(key.to_vec());
            Ok(false)
        })?;

        let removed = batch.len();
        if removed > 0 {
            self.db.commit(batch)?;
            info!(removed, before_id, "pruned hub events");
        }
        Ok(removed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub(crate) fn read_events(db: &dyn KvStore, after: u64, limit: usize) -> StoreResult<Vec<HubEvent>> {
    let start = make_hub_event_key(after);
    db.scan(&make_hub_event_prefix(), Some(&start), false, limit)?
        .into_iter()
        .map(|(_, value)| HubEvent::decode(&value))
        .collect()
}
