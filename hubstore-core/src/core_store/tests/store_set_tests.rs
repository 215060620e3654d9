/*
    StoreSet tests

    Tests:
    1. Envelope validation (hash, signature, network)
    2. Active-signer and custody checks
    3. Routing by message type
    4. SignerRemove cascades revocation into the other stores
    5. prune_fid across kinds
    6. Pruning a SignerAdd revokes what that signer produced
    7. Parallel merges for one fid stay serialised
*/

use super::helpers::{memory_db, FailingKv};
use crate::config::Config;
use crate::core_store::clock::ManualClock;
use crate::core_store::engine::{StoreSet, StoreSetBuilder};
use crate::core_store::kv::KvStore;
use crate::core_store::model::{
    MessageHash, MessageType, Network, ReactionTarget, ReactionType, UserDataType,
};
use crate::core_store::store::{HubEventType, PageOptions, PruneLimits, StoreError};
use crate::core_store::validation::MemorySignerAuthority;
use crate::test_utils::*;
use std::sync::Arc;

/// Builder whose clock sits close to the fixture timestamps
fn builder_over(db: Arc<dyn KvStore>) -> StoreSetBuilder {
    StoreSet::builder(db).clock(Arc::new(ManualClock::new(10_000)))
}

fn builder() -> StoreSetBuilder {
    builder_over(memory_db())
}

fn store_set() -> StoreSet {
    builder().build().unwrap()
}

fn with_delegate(set: &StoreSet) {
    set.merge_message(&create_signer_add(FID_FOR_TEST, 10, &public_key_bytes(&delegate_key())))
        .unwrap();
}

#[test]
fn test_unknown_signer_rejected() {
    let set = store_set();
    let err = set.merge_message(&create_cast_add(FID_FOR_TEST, 100, "gm")).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(set.event_handler().last_event_id().unwrap(), 0);
}

#[test]
fn test_routes_each_kind_to_its_store() {
    let set = store_set();
    with_delegate(&set);

    let cast = create_cast_add(FID_FOR_TEST, 100, "gm");
    let like = create_reaction_add(FID_FOR_TEST, 101, ReactionType::Like, ReactionTarget::Url("https://a.b".into()));
    let verification = create_verification_add(FID_FOR_TEST, 102, &address_with_seed(1));
    let bio = create_user_data_add(FID_FOR_TEST, 103, UserDataType::Bio, "hello");
    for message in [&cast, &like, &verification, &bio] {
        set.merge_message(message).unwrap();
    }

    assert_eq!(set.casts().get_cast_add(FID_FOR_TEST, &cast.hash).unwrap(), cast);
    assert_eq!(set.reactions().count_by_fid(FID_FOR_TEST).unwrap(), 1);
    assert_eq!(set.verifications().count_by_fid(FID_FOR_TEST).unwrap(), 1);
    assert_eq!(set.user_data().get_user_data_add(FID_FOR_TEST, UserDataType::Bio).unwrap(), bio);
    assert_eq!(set.signers().count_by_fid(FID_FOR_TEST).unwrap(), 1);

    let counts = set.count_by_fid(FID_FOR_TEST).unwrap();
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 5);
}

#[test]
fn test_envelope_validation() {
    let set = store_set();
    with_delegate(&set);
    let cast = create_cast_add(FID_FOR_TEST, 100, "gm");

    let forced = with_forced_hash(&cast, MessageHash::new([1; 20]));
    assert!(matches!(set.merge_message(&forced), Err(StoreError::Validation(_))));

    let mut tampered = cast.clone();
    tampered.signature[0] ^= 0xff;
    assert!(matches!(set.merge_message(&tampered), Err(StoreError::Validation(_))));

    let mut data = cast.data.clone();
    data.network = Network::Mainnet;
    let wrong_network = sign_message(data, &delegate_key());
    assert!(matches!(set.merge_message(&wrong_network), Err(StoreError::Validation(_))));

    set.merge_message(&cast).unwrap();
}

#[test]
fn test_without_validation_accepts_forced_hash() {
    let mut config = Config::default();
    config.store.require_active_signer = false;
    let set = builder().config(config).without_validation().build().unwrap();

    let forced = with_forced_hash(&create_cast_add(FID_FOR_TEST, 100, "gm"), MessageHash::new([1; 20]));
    set.merge_message(&forced).unwrap();
    assert!(set.casts().get_cast_add(FID_FOR_TEST, &forced.hash).is_ok());
}

#[test]
fn test_signer_authority_checks_custody_key() {
    let authority = Arc::new(MemorySignerAuthority::new());
    authority.set_custody_key(FID_FOR_TEST, public_key_bytes(&custody_key())).unwrap();
    let set = builder().signer_authority(authority).build().unwrap();

    set.merge_message(&create_signer_add(FID_FOR_TEST, 10, &[1; 32])).unwrap();

    let by_stranger = resign(&create_signer_add(FID_FOR_TEST, 11, &[2; 32]), &signing_key_with_seed(5));
    assert!(matches!(set.merge_message(&by_stranger), Err(StoreError::Validation(_))));

    let other_fid = create_signer_add(FID_FOR_TEST + 1, 10, &[1; 32]);
    assert!(matches!(set.merge_message(&other_fid), Err(StoreError::Validation(_))));
}

#[test]
fn test_signer_remove_revokes_signed_messages() {
    let set = store_set();
    let delegate = public_key_bytes(&delegate_key());
    with_delegate(&set);

    let cast = create_cast_add(FID_FOR_TEST, 100, "gm");
    let like = create_reaction_add(FID_FOR_TEST, 101, ReactionType::Like, ReactionTarget::Url("https://a.b".into()));
    let bio = create_user_data_add(FID_FOR_TEST, 102, UserDataType::Bio, "hello");
    for message in [&cast, &like, &bio] {
        set.merge_message(message).unwrap();
    }

    let mut subscription = set.event_handler().subscribe().unwrap();
    let event = set.merge_message(&create_signer_remove(FID_FOR_TEST, 200, &delegate)).unwrap();
    assert_eq!(event.event_type(), HubEventType::MergeMessage);

    let mut revoked = Vec::new();
    while let Some(event) = subscription.try_recv().unwrap() {
        if event.event_type() == HubEventType::RevokeMessage {
            revoked.push(event.message().clone());
        }
    }
    assert_eq!(revoked, vec![cast.clone(), like, bio]);

    assert!(set.casts().get_cast_add(FID_FOR_TEST, &cast.hash).is_err());
    assert_eq!(set.user_data().count_by_fid(FID_FOR_TEST).unwrap(), 0);
    assert!(!set.signers().is_active_signer(FID_FOR_TEST, &delegate).unwrap());

    let err = set.merge_message(&create_cast_add(FID_FOR_TEST, 300, "still here?")).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn test_explicit_revoke_by_signer() {
    let set = store_set();
    with_delegate(&set);
    set.merge_message(&create_cast_add(FID_FOR_TEST, 100, "gm")).unwrap();

    let events = set
        .revoke_messages_by_signer(FID_FOR_TEST, &public_key_bytes(&delegate_key()))
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(set.casts().count_by_fid(FID_FOR_TEST).unwrap(), 0);
    assert_eq!(set.signers().count_by_fid(FID_FOR_TEST).unwrap(), 1);
}

#[test]
fn test_prune_fid_applies_every_limit() {
    let mut config = Config::default();
    config.pruning.casts = PruneLimits::new(2);
    config.pruning.user_data = PruneLimits::new(1);
    let set = builder().config(config).build().unwrap();
    with_delegate(&set);

    for i in 0..4 {
        set.merge_message(&create_cast_add(FID_FOR_TEST, 100 + i, &format!("{}", i))).unwrap();
    }
    set.merge_message(&create_user_data_add(FID_FOR_TEST, 100, UserDataType::Bio, "a")).unwrap();
    set.merge_message(&create_user_data_add(FID_FOR_TEST, 101, UserDataType::Pfp, "b")).unwrap();

    let events = set.prune_fid(FID_FOR_TEST).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(set.casts().count_by_fid(FID_FOR_TEST).unwrap(), 2);
    assert_eq!(set.user_data().get_adds_by_fid(FID_FOR_TEST, &PageOptions::default()).unwrap().len(), 1);
}

#[test]
fn test_pruned_signer_add_revokes_its_messages() {
    let mut config = Config::default();
    config.pruning.signers = PruneLimits::new(1);
    let set = builder().config(config).build().unwrap();
    let delegate = public_key_bytes(&delegate_key());

    set.merge_message(&create_signer_add(FID_FOR_TEST, 10, &delegate)).unwrap();
    set.merge_message(&create_signer_add(FID_FOR_TEST, 20, &[7; 32])).unwrap();
    let cast = create_cast_add(FID_FOR_TEST, 100, "gm");
    set.merge_message(&cast).unwrap();

    let events = set.prune_fid(FID_FOR_TEST).unwrap();
    let kinds: Vec<_> = events.iter().map(|e| (e.event_type(), e.message().message_type())).collect();
    assert_eq!(
        kinds,
        vec![
            (HubEventType::PruneMessage, MessageType::SignerAdd),
            (HubEventType::RevokeMessage, MessageType::CastAdd),
        ]
    );

    assert!(!set.signers().is_active_signer(FID_FOR_TEST, &delegate).unwrap());
    assert!(set.signers().is_active_signer(FID_FOR_TEST, &[7; 32]).unwrap());
    assert!(set.casts().get_cast_add(FID_FOR_TEST, &cast.hash).is_err());
    assert_eq!(set.casts().count_by_fid(FID_FOR_TEST).unwrap(), 0);
}

#[test]
fn test_failed_cascade_keeps_completed_revokes_in_log() {
    let failing = Arc::new(FailingKv::new(usize::MAX));
    let set = builder_over(failing.clone()).build().unwrap();
    let delegate = public_key_bytes(&delegate_key());
    with_delegate(&set);

    let cast = create_cast_add(FID_FOR_TEST, 100, "gm");
    let like = create_reaction_add(FID_FOR_TEST, 101, ReactionType::Like, ReactionTarget::Url("https://a.b".into()));
    set.merge_message(&cast).unwrap();
    set.merge_message(&like).unwrap();

    // The remove and one revoke commit, the second revoke fails
    failing.set_commits_left(2);
    let err = set.merge_message(&create_signer_remove(FID_FOR_TEST, 200, &delegate)).unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));

    assert!(!set.signers().is_active_signer(FID_FOR_TEST, &delegate).unwrap());
    let log = set.event_handler().get_events(3, 10).unwrap();
    let kinds: Vec<_> = log.iter().map(|e| (e.event_type(), e.message().message_type())).collect();
    assert_eq!(
        kinds,
        vec![
            (HubEventType::MergeMessage, MessageType::SignerRemove),
            (HubEventType::RevokeMessage, MessageType::CastAdd),
        ]
    );
    let target = ReactionTarget::Url("https://a.b".into());
    assert_eq!(set.reactions().get_reaction_add(FID_FOR_TEST, ReactionType::Like, &target).unwrap(), like);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = Config::default();
    config.events.channel_capacity = 0;
    assert!(matches!(
        builder().config(config).build(),
        Err(StoreError::InvalidArgument(_))
    ));
}

#[test]
fn test_open_memory_backend() {
    let set = StoreSet::open(Config::default()).unwrap();
    with_delegate(&set);
    assert_eq!(set.event_handler().last_event_id().unwrap(), 1);
}

#[test]
fn test_parallel_merges_for_one_fid() {
    let set = store_set();
    with_delegate(&set);
    let casts: Vec<_> = (0..32).map(|i| create_cast_add(FID_FOR_TEST, 100 + i, &format!("{}", i))).collect();

    std::thread::scope(|scope| {
        for chunk in casts.chunks(8) {
            let set = &set;
            scope.spawn(move || {
                for cast in chunk {
                    set.merge_message(cast).unwrap();
                }
            });
        }
    });

    assert_eq!(set.casts().count_by_fid(FID_FOR_TEST).unwrap(), 32);
    assert_eq!(set.event_handler().last_event_id().unwrap(), 33);
    let ids: Vec<u64> = set.event_handler().get_events(0, 100).unwrap().iter().map(|e| e.id).collect();
    assert_eq!(ids, (1..=33).collect::<Vec<_>>());
}
