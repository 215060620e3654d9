/*
    engine.rs - The five per-kind stores behind one entry point

    `StoreSet` owns a cast, reaction, signer, verification and user data
    store over a single substrate and a single event handler. It:
    - routes each message to its store by type
    - serialises mutations for one fid through striped locks
    - validates envelopes and signer authorisation before merging
    - revokes a signer's messages when a SignerRemove wins its slot
*/

use crate::config::Config;
use crate::core_store::clock::{Clock, SystemClock};
use crate::core_store::crdt::StoreDef;
use crate::core_store::kinds::{
    CastStore, CastStoreDef, ReactionStore, ReactionStoreDef, SignerStore, SignerStoreDef,
    UserDataStore, UserDataStoreDef, VerificationStore, VerificationStoreDef,
};
use crate::core_store::kv::KvStore;
use crate::core_store::model::{Fid, Message, MessageType};
use crate::core_store::store::errors::handle_poison;
use crate::core_store::store::{
    BulkError, HubEvent, PruneLimits, Store, StoreError, StoreEventHandler, StoreResult,
};
use crate::core_store::validation::{MessageValidator, NameRegistry, SignerAuthority};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// Number of lock stripes shared by all fids
pub const FID_LOCKS_COUNT: usize = 16;

pub struct StoreSet {
    casts: CastStore,
    reactions: ReactionStore,
    signers: SignerStore,
    verifications: VerificationStore,
    user_data: UserDataStore,
    event_handler: Arc<StoreEventHandler>,
    validator: Option<MessageValidator>,
    signer_authority: Option<Arc<dyn SignerAuthority>>,
    require_active_signer: bool,
    fid_locks: Vec<Mutex<()>>,
}

pub struct StoreSetBuilder {
    db: Arc<dyn KvStore>,
    config: Config,
    clock: Arc<dyn Clock>,
    validator: Option<MessageValidator>,
    validate: bool,
    signer_authority: Option<Arc<dyn SignerAuthority>>,
    name_registry: Option<Arc<dyn NameRegistry>>,
}

impl StoreSetBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the default blake3/Ed25519 validator
    pub fn validator(mut self, validator: MessageValidator) -> Self {
        self.validator = Some(validator);
        self.validate = true;
        self
    }

    /// Skip envelope checks. Kind-specific checks still run.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    pub fn signer_authority(mut self, authority: Arc<dyn SignerAuthority>) -> Self {
        self.signer_authority = Some(authority);
        self
    }

    pub fn name_registry(mut self, registry: Arc<dyn NameRegistry>) -> Self {
        self.name_registry = Some(registry);
        self
    }

    fn build_store<T: StoreDef>(
        &self,
        def: T,
        event_handler: &Arc<StoreEventHandler>,
        limits: PruneLimits,
    ) -> Store<T> {
        Store::new(def, self.db.clone(), event_handler.clone(), limits)
            .with_clock(self.clock.clone())
            .with_page_size_max(self.config.store.page_size_max)
    }

    pub fn build(self) -> StoreResult<StoreSet> {
        self.config
            .validate()
            .map_err(|e| StoreError::InvalidArgument(e.to_string()))?;

        let event_handler =
            Arc::new(StoreEventHandler::new(self.db.clone(), self.config.events.channel_capacity)?);
        let pruning = &self.config.pruning;

        let casts = self.build_store(CastStoreDef, &event_handler, pruning.casts);
        let reactions = self.build_store(ReactionStoreDef, &event_handler, pruning.reactions);
        let signers = self.build_store(SignerStoreDef, &event_handler, pruning.signers);
        let verifications =
            self.build_store(VerificationStoreDef, &event_handler, pruning.verifications);
        let user_data = self.build_store(
            UserDataStoreDef::new(self.name_registry.clone()),
            &event_handler,
            pruning.user_data,
        );

        let validator = if self.validate {
            let network = self.config.store.network;
            Some(self.validator.clone().unwrap_or_else(|| MessageValidator::new(network)))
        } else {
            None
        };

        info!(
            backend = ?self.config.store.backend,
            network = ?self.config.store.network,
            validate = validator.is_some(),
            last_event_id = event_handler.last_event_id()?,
            "store set ready"
        );

        Ok(StoreSet {
            casts,
            reactions,
            signers,
            verifications,
            user_data,
            event_handler,
            validator,
            signer_authority: self.signer_authority.clone(),
            require_active_signer: self.config.store.require_active_signer,
            fid_locks: (0..FID_LOCKS_COUNT).map(|_| Mutex::new(())).collect(),
        })
    }
}

impl StoreSet {
    pub fn builder(db: Arc<dyn KvStore>) -> StoreSetBuilder {
        StoreSetBuilder {
            db,
            config: Config::default(),
            clock: Arc::new(SystemClock),
            validator: None,
            validate: true,
            signer_authority: None,
            name_registry: None,
        }
    }

    /// Open the substrate named by `config` and build on top of it
    pub fn open(config: Config) -> StoreResult<Self> {
        let db = config.store.open_kv()?;
        Self::builder(db).config(config).build()
    }

    pub fn casts(&self) -> &CastStore {
        &self.casts
    }

    pub fn reactions(&self) -> &ReactionStore {
        &self.reactions
    }

    pub fn signers(&self) -> &SignerStore {
        &self.signers
    }

    pub fn verifications(&self) -> &VerificationStore {
        &self.verifications
    }

    pub fn user_data(&self) -> &UserDataStore {
        &self.user_data
    }

    pub fn event_handler(&self) -> &Arc<StoreEventHandler> {
        &self.event_handler
    }

    fn lock_fid(&self, fid: Fid) -> StoreResult<MutexGuard<'_, ()>> {
        let stripe = (fid % FID_LOCKS_COUNT as u64) as usize;
        self.fid_locks[stripe].lock().map_err(handle_poison)
    }

    /// Validate and merge one message into the store for its type.
    ///
    /// A winning SignerRemove also revokes every message the removed key
    /// signed. If that cascade fails the merge itself stays committed and
    /// the revocation error is returned. Revocations made before the failure
    /// are committed too and can be read back with
    /// [`StoreEventHandler::get_events`].
    pub fn merge_message(&self, message: &Message) -> StoreResult<HubEvent> {
        let _guard = self.lock_fid(message.fid())?;

        if let Some(validator) = &self.validator {
            validator.validate(message)?;
        }
        self.check_signer(message)?;

        let event = match message.message_type() {
            MessageType::CastAdd | MessageType::CastRemove => self.casts.merge(message)?,
            MessageType::ReactionAdd | MessageType::ReactionRemove => self.reactions.merge(message)?,
            MessageType::VerificationAdd | MessageType::VerificationRemove => {
                self.verifications.merge(message)?
            }
            MessageType::SignerAdd | MessageType::SignerRemove => self.signers.merge(message)?,
            MessageType::UserDataAdd => self.user_data.merge(message)?,
        };

        if message.message_type() == MessageType::SignerRemove {
            if let Some(body) = message.signer_body() {
                if let Err(e) = self.revoke_locked(message.fid(), &body.signer) {
                    warn!(
                        fid = message.fid(),
                        signer = %hex::encode(&body.signer),
                        revoked = e.completed.len(),
                        error = %e.source,
                        "signer revocation incomplete"
                    );
                    return Err(e.source);
                }
            }
        }
        Ok(event)
    }

    /// Merge each message independently, in order
    pub fn merge_messages(&self, messages: &[Message]) -> Vec<StoreResult<HubEvent>> {
        messages.iter().map(|message| self.merge_message(message)).collect()
    }

    fn check_signer(&self, message: &Message) -> StoreResult<()> {
        let fid = message.fid();
        match message.message_type() {
            MessageType::SignerAdd | MessageType::SignerRemove => match &self.signer_authority {
                Some(authority) if !authority.is_authorized(fid, &message.signer, message.timestamp())? => {
                    Err(StoreError::Validation(format!(
                        "key {} may not manage signers for fid {}",
                        hex::encode(&message.signer),
                        fid
                    )))
                }
                _ => Ok(()),
            },
            _ if self.require_active_signer && !self.signers.is_active_signer(fid, &message.signer)? => {
                Err(StoreError::Validation(format!(
                    "signer {} is not active for fid {}",
                    hex::encode(&message.signer),
                    fid
                )))
            }
            _ => Ok(()),
        }
    }

    /// Revoke every message `signer` produced for `fid`, across all kinds
    pub fn revoke_messages_by_signer(&self, fid: Fid, signer: &[u8]) -> Result<Vec<HubEvent>, BulkError> {
        let _guard = self.lock_fid(fid).map_err(|e| BulkError::new(Vec::new(), e))?;
        self.revoke_locked(fid, signer)
    }

    fn revoke_locked(&self, fid: Fid, signer: &[u8]) -> Result<Vec<HubEvent>, BulkError> {
        let mut events = Vec::new();
        collect(&mut events, self.casts.revoke_messages_by_signer(fid, signer))?;
        collect(&mut events, self.reactions.revoke_messages_by_signer(fid, signer))?;
        collect(&mut events, self.verifications.revoke_messages_by_signer(fid, signer))?;
        collect(&mut events, self.user_data.revoke_messages_by_signer(fid, signer))?;
        Ok(events)
    }

    /// Apply every store's retention limits to `fid`.
    ///
    /// A pruned SignerAdd ends that signer's grant, so its messages are
    /// revoked right after the signer store is pruned.
    pub fn prune_fid(&self, fid: Fid) -> Result<Vec<HubEvent>, BulkError> {
        let _guard = self.lock_fid(fid).map_err(|e| BulkError::new(Vec::new(), e))?;
        let mut events = Vec::new();
        collect(&mut events, self.casts.prune_messages(fid))?;
        collect(&mut events, self.reactions.prune_messages(fid))?;

        let first_signer_event = events.len();
        collect(&mut events, self.signers.prune_messages(fid))?;
        let lapsed: Vec<Vec<u8>> = events[first_signer_event..]
            .iter()
            .map(|event| event.message())
            .filter(|message| message.message_type() == MessageType::SignerAdd)
            .filter_map(|message| message.signer_body().map(|body| body.signer.clone()))
            .collect();
        for signer in &lapsed {
            collect(&mut events, self.revoke_locked(fid, signer))?;
        }

        collect(&mut events, self.verifications.prune_messages(fid))?;
        collect(&mut events, self.user_data.prune_messages(fid))?;
        Ok(events)
    }

    /// Live message counts per store for `fid`
    pub fn count_by_fid(&self, fid: Fid) -> StoreResult<Vec<(&'static str, usize)>> {
        Ok(vec![
            count(&self.casts, fid)?,
            count(&self.reactions, fid)?,
            count(&self.signers, fid)?,
            count(&self.verifications, fid)?,
            count(&self.user_data, fid)?,
        ])
    }
}

fn count<T: StoreDef>(store: &Store<T>, fid: Fid) -> StoreResult<(&'static str, usize)> {
    Ok((store.def().name(), store.count_by_fid(fid)?))
}

/// Append one store's bulk result, carrying earlier events into the error
fn collect(
    events: &mut Vec<HubEvent>,
    result: Result<Vec<HubEvent>, BulkError>,
) -> Result<(), BulkError> {
    match result {
        Ok(mut done) => {
            events.append(&mut done);
            Ok(())
        }
        Err(mut e) => {
            events.append(&mut e.completed);
            Err(BulkError::new(std::mem::take(events), e.source))
        }
    }
}
