/*
    subscription.rs - Asynchronous consumer side of the hub event queue

    The broadcast queue is bounded. A subscriber that falls behind loses the
    oldest queued events; when the next event it does receive skips ids, the
    missing range is read back from the durable event log. Consumers therefore
    see every event after their starting point, in id order.
*/

use super::errors::{StoreError, StoreResult};
use super::event_handler::read_events;
use super::events::{HubEvent, HubEventType};
use crate::core_store::kv::KvStore;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

/// Events read per round-trip while filling a gap from the log
const CATCH_UP_BATCH: usize = 512;

pub struct EventSubscription {
    rx: broadcast::Receiver<HubEvent>,
    db: Arc<dyn KvStore>,
    event_types: Vec<HubEventType>,
    /// Highest id queued or delivered
    cursor: u64,
    backlog: VecDeque<HubEvent>,
}

impl EventSubscription {
    pub(crate) fn new(
        rx: broadcast::Receiver<HubEvent>,
        db: Arc<dyn KvStore>,
        event_types: Vec<HubEventType>,
        start_after: u64,
    ) -> Self {
        EventSubscription { rx, db, event_types, cursor: start_after, backlog: VecDeque::new() }
    }

    /// Id of the newest event this subscription has seen
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Next matching event, waiting for one to be committed
    pub async fn recv(&mut self) -> StoreResult<HubEvent> {
        loop {
            if let Some(event) = self.pop_matching() {
                return Ok(event);
            }
            match self.rx.recv().await {
                Ok(event) => self.accept(event)?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, position = self.cursor, "event subscriber lagged, catching up from log");
                }
                Err(RecvError::Closed) => {
                    return Err(StoreError::Unavailable("event channel closed".to_string()))
                }
            }
        }
    }

    /// Next matching event if one is ready
    pub fn try_recv(&mut self) -> StoreResult<Option<HubEvent>> {
        loop {
            if let Some(event) = self.pop_matching() {
                return Ok(Some(event));
            }
            match self.rx.try_recv() {
                Ok(event) => self.accept(event)?,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, position = self.cursor, "event subscriber lagged, catching up from log");
                }
                Err(TryRecvError::Closed) => {
                    return Err(StoreError::Unavailable("event channel closed".to_string()))
                }
            }
        }
    }

    fn pop_matching(&mut self) -> Option<HubEvent> {
        while let Some(event) = self.backlog.pop_front() {
            if self.event_types.contains(&event.event_type()) {
                return Some(event);
            }
        }
        None
    }

    fn accept(&mut self, event: HubEvent) -> StoreResult<()> {
        if event.id <= self.cursor {
            return Ok(());
        }
        if event.id > self.cursor + 1 {
            self.fill_from_log(event.id - 1)?;
        }
        if event.id > self.cursor {
            self.cursor = event.id;
            self.backlog.push_back(event);
        }
        Ok(())
    }

    fn fill_from_log(&mut self, up_to: u64) -> StoreResult<()> {
        loop {
            let events = read_events(self.db.as_ref(), self.cursor, CATCH_UP_BATCH)?;
            let exhausted = events.len() < CATCH_UP_BATCH;
            for event in events {
                if event.id > up_to {
                    return Ok(());
                }
                self.cursor = event.id;
                self.backlog.push_back(event);
            }
            if exhausted || self.cursor >= up_to {
                return Ok(());
            }
        }
    }
}
