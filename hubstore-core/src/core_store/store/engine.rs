/*
    engine.rs - Generic CRDT add/remove set over the KV substrate

    One `Store<T>` holds the messages of one kind for every fid. `T` supplies
    the kind-specific parts (slot keys, indices, validation); this file owns
    conflict resolution, atomic batching, paging, pruning and revocation.

    Mutations for one fid must be serialised by the caller. Different fids
    never share keys and may be mutated in parallel.
*/

use super::errors::{BulkError, StoreError, StoreResult};
use super::event_handler::StoreEventHandler;
use super::events::HubEvent;
use super::keys::{
    make_message_prefix, make_message_primary_key, make_set_key, parse_index_suffix, UserPostfix,
    INDEX_SUFFIX_LENGTH,
};
use super::page::{MessagesPage, PageOptions, PAGE_SIZE_MAX};
use crate::core_store::clock::{Clock, SystemClock};
use crate::core_store::crdt::{resolve, Contender, MessageKind, Resolution, StoreDef};
use crate::core_store::kv::{KvStore, WriteBatch};
use crate::core_store::model::{Fid, Message, MessageType, TsHash, TS_HASH_LENGTH};
use crate::metrics::{self, Timer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retention bounds for one store, applied per fid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneLimits {
    /// Max live messages per fid
    pub size_limit: u32,
    /// Max age of the oldest live message
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<Duration>,
}

impl PruneLimits {
    pub fn new(size_limit: u32) -> Self {
        PruneLimits { size_limit, time_limit: None }
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

/// What a paging visitor does with one message
enum Visit {
    Take,
    Skip,
    Done,
}

pub struct Store<T: StoreDef> {
    def: T,
    db: Arc<dyn KvStore>,
    event_handler: Arc<StoreEventHandler>,
    prune_limits: PruneLimits,
    clock: Arc<dyn Clock>,
    page_size_max: usize,
}

impl<T: StoreDef> Store<T> {
    pub fn new(
        def: T,
        db: Arc<dyn KvStore>,
        event_handler: Arc<StoreEventHandler>,
        prune_limits: PruneLimits,
    ) -> Self {
        Store {
            def,
            db,
            event_handler,
            prune_limits,
            clock: Arc::new(SystemClock),
            page_size_max: PAGE_SIZE_MAX,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_page_size_max(mut self, page_size_max: usize) -> Self {
        self.page_size_max = page_size_max.clamp(1, PAGE_SIZE_MAX);
        self
    }

    pub fn def(&self) -> &T {
        &self.def
    }

    pub fn prune_limits(&self) -> PruneLimits {
        self.prune_limits
    }

    pub fn event_handler(&self) -> &Arc<StoreEventHandler> {
        &self.event_handler
    }

    // ===== Merge =====

    /// Admit `message` if it wins its slot.
    ///
    /// Returns the committed merge event; its id is the sequence number.
    /// Fails with `Duplicate` or `Conflict` without touching state.
    pub fn merge(&self, message: &Message) -> StoreResult<HubEvent> {
        let timer = Timer::new(metrics::MERGE_DURATION_MS, self.def.name());
        let result = self.merge_inner(message);
        timer.stop();

        match &result {
            Ok(event) => {
                metrics::record_store_counter(metrics::MERGE_SUCCESS, self.def.name(), 1);
                debug!(
                    store = self.def.name(),
                    fid = message.fid(),
                    hash = %message.hex_hash(),
                    event_id = event.id,
                    superseded = event.deleted_messages().len(),
                    "merged message"
                );
            }
            Err(StoreError::Duplicate(_)) => {
                metrics::record_store_counter(metrics::MERGE_DUPLICATE, self.def.name(), 1);
            }
            Err(StoreError::Prunable(_)) => {
                metrics::record_store_counter(metrics::MERGE_PRUNABLE, self.def.name(), 1);
            }
            Err(StoreError::Conflict(_)) => {
                metrics::record_store_counter(metrics::MERGE_CONFLICT, self.def.name(), 1);
                debug!(
                    store = self.def.name(),
                    fid = message.fid(),
                    hash = %message.hex_hash(),
                    "message lost conflict resolution"
                );
            }
            Err(_) => {}
        }
        result
    }

    fn merge_inner(&self, message: &Message) -> StoreResult<HubEvent> {
        let kind = self.check_message(message)?;
        let fid = message.fid();
        let ts_hash = message.ts_hash();

        let primary_key = make_message_primary_key(fid, self.def.postfix(), &ts_hash);
        if self.db.exists(&primary_key)? {
            return Err(StoreError::duplicate());
        }
        if self.is_prunable(fid, &ts_hash)? {
            return Err(StoreError::Prunable(format!(
                "message would be pruned from the {} store at once",
                self.def.name()
            )));
        }

        let slot = self.def.slot_key(message)?;
        let incoming = Contender::new(kind, ts_hash);
        let mut batch = WriteBatch::new();
        let mut superseded = Vec::new();

        for (existing_kind, set_postfix) in self.set_postfixes() {
            let set_key = make_set_key(fid, set_postfix, &slot);
            let Some(value) = self.db.get(&set_key)? else {
                continue;
            };
            let existing_ts_hash = TsHash::from_bytes(&value)?;
            let existing = Contender::new(existing_kind, existing_ts_hash);

            match resolve(&incoming, &existing) {
                Resolution::Loses => {
                    return Err(StoreError::conflicts_with(self.message_type_of(existing_kind)?));
                }
                Resolution::Duplicate => return Err(StoreError::duplicate()),
                Resolution::Wins => {
                    let existing_key =
                        make_message_primary_key(fid, self.def.postfix(), &existing_ts_hash);
                    match self.db.get(&existing_key)? {
                        Some(bytes) => {
                            let existing_message = Message::decode(&bytes)?;
                            self.delete_message_ops(&mut batch, &existing_message)?;
                            superseded.push(existing_message);
                        }
                        None => {
                            warn!(
                                store = self.def.name(),
                                fid,
                                ts_hash = ?existing_ts_hash,
                                "set entry points at missing message, dropping it"
                            );
                            batch.delete(set_key);
                        }
                    }
                }
            }
        }

        self.put_message_ops(&mut batch, message, kind, &slot)?;
        self.event_handler.commit_transaction(batch, HubEvent::merge(message.clone(), superseded))
    }

    /// Type, body and kind-specific checks run before conflict resolution
    fn check_message(&self, message: &Message) -> StoreResult<MessageKind> {
        let message_type = message.message_type();
        let kind = self.def.message_kind(message_type).ok_or_else(|| {
            StoreError::InvalidArgument(format!(
                "{} store does not accept {} messages",
                self.def.name(),
                message_type
            ))
        })?;
        if !message.data.body.matches(message_type) {
            return Err(StoreError::InvalidArgument(format!(
                "body does not match message type {}",
                message_type
            )));
        }
        if message.fid() == 0 {
            return Err(StoreError::InvalidArgument("fid must be positive".to_string()));
        }
        self.def.validate(message)?;
        Ok(kind)
    }

    fn set_postfixes(&self) -> Vec<(MessageKind, UserPostfix)> {
        let mut sets = vec![(MessageKind::Add, self.def.add_set_postfix())];
        if let Some(remove) = self.def.remove_set_postfix() {
            sets.push((MessageKind::Remove, remove));
        }
        sets
    }

    fn message_type_of(&self, kind: MessageKind) -> StoreResult<MessageType> {
        match kind {
            MessageKind::Add => Ok(self.def.add_message_type()),
            MessageKind::Remove => self.def.remove_message_type().ok_or_else(|| {
                StoreError::Internal(format!("{} store has no remove type", self.def.name()))
            }),
        }
    }

    fn set_postfix_for(&self, kind: MessageKind) -> StoreResult<UserPostfix> {
        match kind {
            MessageKind::Add => Ok(self.def.add_set_postfix()),
            MessageKind::Remove => self.def.remove_set_postfix().ok_or_else(|| {
                StoreError::InvalidArgument(format!("{} store has no remove set", self.def.name()))
            }),
        }
    }

    fn put_message_ops(
        &self,
        batch: &mut WriteBatch,
        message: &Message,
        kind: MessageKind,
        slot: &[u8],
    ) -> StoreResult<()> {
        let fid = message.fid();
        let ts_hash = message.ts_hash();

        batch.put(make_message_primary_key(fid, self.def.postfix(), &ts_hash), message.encode()?);
        batch.put(make_set_key(fid, self.set_postfix_for(kind)?, slot), ts_hash.as_bytes().to_vec());
        if kind == MessageKind::Add {
            for entry in self.def.secondary_index_keys(message, &ts_hash)? {
                batch.put(entry.key, entry.value);
            }
        }
        Ok(())
    }

    /// Queue deletion of a stored message with its set entry and indices
    fn delete_message_ops(&self, batch: &mut WriteBatch, message: &Message) -> StoreResult<()> {
        let kind = self.def.message_kind(message.message_type()).ok_or_else(|| {
            StoreError::Internal(format!(
                "{} store holds foreign {} message",
                self.def.name(),
                message.message_type()
            ))
        })?;
        let fid = message.fid();
        let ts_hash = message.ts_hash();

        // The set entry may already point at a newer message
        let set_key = make_set_key(fid, self.set_postfix_for(kind)?, &self.def.slot_key(message)?);
        if self.db.get(&set_key)?.as_deref() == Some(ts_hash.as_bytes().as_slice()) {
            batch.delete(set_key);
        }
        if kind == MessageKind::Add {
            for entry in self.def.secondary_index_keys(message, &ts_hash)? {
                batch.delete(entry.key);
            }
        }
        batch.delete(make_message_primary_key(fid, self.def.postfix(), &ts_hash));
        Ok(())
    }

    // ===== Reads =====

    /// Current winner of kind `kind` in `slot`
    pub fn get_by_slot(&self, fid: Fid, kind: MessageKind, slot: &[u8]) -> StoreResult<Message> {
        let set_key = make_set_key(fid, self.set_postfix_for(kind)?, slot);
        let value = self.db.get(&set_key)?.ok_or_else(|| {
            StoreError::NotFound(format!("no {} message in slot for fid {}", self.def.name(), fid))
        })?;
        self.get_message(fid, &TsHash::from_bytes(&value)?)
    }

    pub fn get_add(&self, fid: Fid, slot: &[u8]) -> StoreResult<Message> {
        self.get_by_slot(fid, MessageKind::Add, slot)
    }

    pub fn get_remove(&self, fid: Fid, slot: &[u8]) -> StoreResult<Message> {
        self.get_by_slot(fid, MessageKind::Remove, slot)
    }

    pub fn get_message(&self, fid: Fid, ts_hash: &TsHash) -> StoreResult<Message> {
        let key = make_message_primary_key(fid, self.def.postfix(), ts_hash);
        match self.db.get(&key)? {
            Some(bytes) => Message::decode(&bytes),
            None => Err(StoreError::NotFound(format!(
                "{} message {:?} for fid {}",
                self.def.name(),
                ts_hash,
                fid
            ))),
        }
    }

    /// Messages of `kind` (or both kinds) for `fid`, in TsHash order
    pub fn get_range_by_fid(
        &self,
        fid: Fid,
        kind: Option<MessageKind>,
        page: &PageOptions,
    ) -> StoreResult<MessagesPage> {
        let wanted = match kind {
            Some(kind) => Some(self.message_type_of(kind)?),
            None => None,
        };
        self.page_by_fid(fid, page, &mut |message| match wanted {
            Some(t) if message.message_type() != t => Visit::Skip,
            _ => Visit::Take,
        })
    }

    pub fn get_adds_by_fid(&self, fid: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        self.get_range_by_fid(fid, Some(MessageKind::Add), page)
    }

    pub fn get_removes_by_fid(&self, fid: Fid, page: &PageOptions) -> StoreResult<MessagesPage> {
        if !self.def.remove_type_supported() {
            return Ok(MessagesPage::default());
        }
        self.get_range_by_fid(fid, Some(MessageKind::Remove), page)
    }

    /// Adds and removes with `start_time <= timestamp <= stop_time`
    pub fn get_all_messages_by_fid(
        &self,
        fid: Fid,
        start_time: Option<u32>,
        stop_time: Option<u32>,
        page: &PageOptions,
    ) -> StoreResult<MessagesPage> {
        let reverse = page.reverse;
        self.page_by_fid(fid, page, &mut |message| {
            let ts = message.timestamp();
            let before_start = start_time.is_some_and(|start| ts < start);
            let after_stop = stop_time.is_some_and(|stop| ts > stop);
            match (before_start, after_stop, reverse) {
                (false, false, _) => Visit::Take,
                (true, _, false) | (_, true, true) => Visit::Skip,
                _ => Visit::Done,
            }
        })
    }

    pub fn get_by_fid_filtered(
        &self,
        fid: Fid,
        page: &PageOptions,
        filter: &dyn Fn(&Message) -> bool,
    ) -> StoreResult<MessagesPage> {
        self.page_by_fid(fid, page, &mut |message| {
            if filter(message) {
                Visit::Take
            } else {
                Visit::Skip
            }
        })
    }

    fn page_by_fid(
        &self,
        fid: Fid,
        page: &PageOptions,
        visit: &mut dyn FnMut(&Message) -> Visit,
    ) -> StoreResult<MessagesPage> {
        if fid == 0 {
            return Err(StoreError::InvalidArgument("fid must be positive".to_string()));
        }
        let prefix = make_message_prefix(fid, self.def.postfix());
        let start = page.start_key(&prefix, TS_HASH_LENGTH)?;
        let size = page.effective_size(self.page_size_max);

        let mut messages = Vec::new();
        let mut last_key: Option<Vec<u8>> = None;
        let mut more = false;

        self.db.for_each_by_prefix(&prefix, start.as_deref(), page.reverse, &mut |key, value| {
            let message = Message::decode(value)?;
            match visit(&message) {
                Visit::Done => Ok(true),
                Visit::Skip => Ok(false),
                Visit::Take if messages.len() == size => {
                    more = true;
                    Ok(true)
                }
                Visit::Take => {
                    messages.push(message);
                    last_key = Some(key.to_vec());
                    Ok(false)
                }
            }
        })?;

        let next_page_token =
            if more { last_key.map(|key| key[prefix.len()..].to_vec()) } else { None };
        Ok(MessagesPage { messages, next_page_token })
    }

    /// Messages referenced by a secondary index bucket.
    ///
    /// `index_prefix` is `[root][target]`; rows under it end in
    /// `[fid][ts_hash]`. `value_filter` sees each index row's value.
    pub fn get_by_index(
        &self,
        index_prefix: &[u8],
        page: &PageOptions,
        value_filter: Option<&dyn Fn(&[u8]) -> bool>,
    ) -> StoreResult<MessagesPage> {
        let start = page.start_key(index_prefix, INDEX_SUFFIX_LENGTH)?;
        let size = page.effective_size(self.page_size_max);

        let mut messages = Vec::new();
        let mut last_key: Option<Vec<u8>> = None;
        let mut more = false;

        self.db.for_each_by_prefix(index_prefix, start.as_deref(), page.reverse, &mut |key, value| {
            // Target encodings are prefix-free, so a longer key is corrupt
            if key.len() != index_prefix.len() + INDEX_SUFFIX_LENGTH {
                return Ok(false);
            }
            if let Some(filter) = value_filter {
                if !filter(value) {
                    return Ok(false);
                }
            }
            if messages.len() == size {
                more = true;
                return Ok(true);
            }
            let (fid, ts_hash) = parse_index_suffix(key)?;
            let primary = make_message_primary_key(fid, self.def.postfix(), &ts_hash);
            match self.db.get(&primary)? {
                Some(bytes) => {
                    messages.push(Message::decode(&bytes)?);
                    last_key = Some(key.to_vec());
                }
                None => warn!(
                    store = self.def.name(),
                    fid,
                    ts_hash = ?ts_hash,
                    "index entry points at missing message"
                ),
            }
            Ok(false)
        })?;

        let next_page_token =
            if more { last_key.map(|key| key[index_prefix.len()..].to_vec()) } else { None };
        Ok(MessagesPage { messages, next_page_token })
    }

    /// Number of live messages (adds and removes) for `fid`
    pub fn count_by_fid(&self, fid: Fid) -> StoreResult<usize> {
        let prefix = make_message_prefix(fid, self.def.postfix());
        let mut count = 0usize;
        self.db.for_each_by_prefix(&prefix, None, false, &mut |_, _| {
            count += 1;
            Ok(false)
        })?;
        Ok(count)
    }

    // ===== Pruning =====

    /// Evict the earliest messages of `fid` until both limits hold.
    ///
    /// Adds and removes are evicted in one TsHash order. Each eviction is its
    /// own atomic batch with its own prune event.
    pub fn prune_messages(&self, fid: Fid) -> Result<Vec<HubEvent>, BulkError> {
        let mut events = Vec::new();
        match self.prune_inner(fid, &mut events) {
            Ok(()) => {
                if !events.is_empty() {
                    metrics::record_store_counter(
                        metrics::PRUNE_MESSAGES,
                        self.def.name(),
                        events.len() as u64,
                    );
                    info!(store = self.def.name(), fid, pruned = events.len(), "pruned messages");
                }
                Ok(events)
            }
            Err(e) => {
                warn!(store = self.def.name(), fid, pruned = events.len(), error = %e, "pruning stopped");
                Err(BulkError::new(events, e))
            }
        }
    }

    fn prune_cutoff(&self) -> Option<u32> {
        let limit = self.prune_limits.time_limit?;
        let limit_secs = u32::try_from(limit.as_secs()).unwrap_or(u32::MAX);
        Some(self.clock.now().saturating_sub(limit_secs))
    }

    /// True when a message with `ts_hash` would be the next prune victim.
    ///
    /// Keeps a just-pruned message from coming back on redelivery.
    fn is_prunable(&self, fid: Fid, ts_hash: &TsHash) -> StoreResult<bool> {
        if self.prune_cutoff().is_some_and(|cutoff| ts_hash.timestamp() < cutoff) {
            return Ok(true);
        }
        if self.count_by_fid(fid)? < self.prune_limits.size_limit as usize {
            return Ok(false);
        }
        let prefix = make_message_prefix(fid, self.def.postfix());
        let mut earliest = None;
        self.db.for_each_by_prefix(&prefix, None, false, &mut |key, _| {
            earliest = Some(TsHash::from_bytes(&key[prefix.len()..])?);
            Ok(true)
        })?;
        Ok(earliest.is_some_and(|earliest| *ts_hash < earliest))
    }

    fn prune_inner(&self, fid: Fid, events: &mut Vec<HubEvent>) -> StoreResult<()> {
        let size_limit = self.prune_limits.size_limit as usize;
        let cutoff = self.prune_cutoff();
        let mut live = self.count_by_fid(fid)?;

        let prefix = make_message_prefix(fid, self.def.postfix());
        let mut doomed = Vec::new();
        self.db.for_each_by_prefix(&prefix, None, false, &mut |_, value| {
            let message = Message::decode(value)?;
            let expired = cutoff.is_some_and(|cutoff| message.timestamp() < cutoff);
            if live <= size_limit && !expired {
                return Ok(true);
            }
            live -= 1;
            doomed.push(message);
            Ok(false)
        })?;

        for message in doomed {
            let mut batch = WriteBatch::new();
            self.delete_message_ops(&mut batch, &message)?;
            events.push(self.event_handler.commit_transaction(batch, HubEvent::prune(message))?);
        }
        Ok(())
    }

    // ===== Revocation =====

    /// Delete one stored message because its signer is no longer valid
    pub fn revoke(&self, message: &Message) -> StoreResult<HubEvent> {
        if self.def.message_kind(message.message_type()).is_none() {
            return Err(StoreError::InvalidArgument(format!(
                "{} store does not accept {} messages",
                self.def.name(),
                message.message_type()
            )));
        }
        let key = make_message_primary_key(message.fid(), self.def.postfix(), &message.ts_hash());
        if !self.db.exists(&key)? {
            return Err(StoreError::NotFound(format!(
                "{} message {} is not stored",
                self.def.name(),
                message.hex_hash()
            )));
        }
        let mut batch = WriteBatch::new();
        self.delete_message_ops(&mut batch, message)?;
        self.event_handler.commit_transaction(batch, HubEvent::revoke(message.clone()))
    }

    /// Delete every message of `fid` signed by `signer`, one event each
    pub fn revoke_messages_by_signer(&self, fid: Fid, signer: &[u8]) -> Result<Vec<HubEvent>, BulkError> {
        let mut events = Vec::new();
        let result = self.revoke_inner(fid, signer, &mut events);

        if !events.is_empty() {
            metrics::record_store_counter(metrics::REVOKE_MESSAGES, self.def.name(), events.len() as u64);
            info!(
                store = self.def.name(),
                fid,
                signer = %hex::encode(signer),
                revoked = events.len(),
                "revoked messages by signer"
            );
        }
        match result {
            Ok(()) => Ok(events),
            Err(e) => Err(BulkError::new(events, e)),
        }
    }

    fn revoke_inner(&self, fid: Fid, signer: &[u8], events: &mut Vec<HubEvent>) -> StoreResult<()> {
        let prefix = make_message_prefix(fid, self.def.postfix());
        let mut doomed = Vec::new();
        self.db.for_each_by_prefix(&prefix, None, false, &mut |_, value| {
            let message = Message::decode(value)?;
            if message.signer == signer {
                doomed.push(message);
            }
            Ok(false)
        })?;

        for message in doomed {
            let mut batch = WriteBatch::new();
            self.delete_message_ops(&mut batch, &message)?;
            events.push(self.event_handler.commit_transaction(batch, HubEvent::revoke(message))?);
        }
        Ok(())
    }
}
