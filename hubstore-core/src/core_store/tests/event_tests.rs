/*
    Event handler tests

    Tests:
    1. Ids are gap-free across stores sharing one handler
    2. Listeners see only their event type, in commit order
    3. Listener errors reach the caller after the commit
    4. Durable log replay, trimming and resume after restart
    5. Subscriptions: ordering, type filters, lag catch-up
*/

use super::helpers::{event_handler, memory_db};
use crate::core_store::kinds::{CastStoreDef, ReactionStoreDef};
use crate::core_store::model::{ReactionTarget, ReactionType};
use crate::core_store::store::{
    EventListener, HubEvent, HubEventType, PruneLimits, Store, StoreError, StoreEventHandler,
    StoreResult,
};
use crate::test_utils::*;
use std::sync::{Arc, Mutex};

fn recorder() -> (Arc<Mutex<Vec<u64>>>, Arc<dyn EventListener>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener: Arc<dyn EventListener> = Arc::new(move |event: &HubEvent| -> StoreResult<()> {
        sink.lock().unwrap().push(event.id);
        Ok(())
    });
    (seen, listener)
}

#[test]
fn test_ids_are_shared_across_stores() {
    let db = memory_db();
    let handler = event_handler(&db);
    let casts = Store::new(CastStoreDef, db.clone(), handler.clone(), PruneLimits::new(10));
    let reactions = Store::new(ReactionStoreDef, db.clone(), handler.clone(), PruneLimits::new(10));

    let a = casts.merge(&create_cast_add(FID_FOR_TEST, 100, "a")).unwrap();
    let b = reactions
        .merge(&create_reaction_add(
            FID_FOR_TEST,
            100,
            ReactionType::Like,
            ReactionTarget::Url("https://a.b".into()),
        ))
        .unwrap();
    let c = casts.merge(&create_cast_add(FID_FOR_TEST, 101, "c")).unwrap();

    assert_eq!([a.id, b.id, c.id], [1, 2, 3]);
    assert_eq!(handler.last_event_id().unwrap(), 3);
}

#[test]
fn test_listeners_filter_by_type() {
    let db = memory_db();
    let handler = event_handler(&db);
    let store = Store::new(CastStoreDef, db, handler.clone(), PruneLimits::new(1));

    let (merged, merge_listener) = recorder();
    let (pruned, prune_listener) = recorder();
    handler.register_listener(HubEventType::MergeMessage, merge_listener).unwrap();
    handler.register_listener(HubEventType::PruneMessage, prune_listener).unwrap();

    store.merge(&create_cast_add(FID_FOR_TEST, 100, "a")).unwrap();
    store.merge(&create_cast_add(FID_FOR_TEST, 101, "b")).unwrap();
    store.prune_messages(FID_FOR_TEST).unwrap();

    assert_eq!(*merged.lock().unwrap(), vec![1, 2]);
    assert_eq!(*pruned.lock().unwrap(), vec![3]);
}

#[test]
fn test_unregistered_listener_stops_receiving() {
    let db = memory_db();
    let handler = event_handler(&db);
    let store = Store::new(CastStoreDef, db, handler.clone(), PruneLimits::new(10));

    let (seen, listener) = recorder();
    let id = handler.register_listener(HubEventType::MergeMessage, listener).unwrap();
    store.merge(&create_cast_add(FID_FOR_TEST, 100, "a")).unwrap();

    assert!(handler.unregister_listener(id).unwrap());
    assert!(!handler.unregister_listener(id).unwrap());
    store.merge(&create_cast_add(FID_FOR_TEST, 101, "b")).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1]);
}

#[test]
fn test_listener_error_surfaces_after_commit() {
    let db = memory_db();
    let handler = event_handler(&db);
    let store = Store::new(CastStoreDef, db, handler.clone(), PruneLimits::new(10));

    let failing = Arc::new(|_: &HubEvent| -> StoreResult<()> {
        Err(StoreError::Internal("listener exploded".to_string()))
    });
    handler.register_listener(HubEventType::MergeMessage, failing).unwrap();

    let cast = create_cast_add(FID_FOR_TEST, 100, "a");
    let err = store.merge(&cast).unwrap_err();
    assert!(matches!(err, StoreError::Internal(_)));

    assert_eq!(store.get_cast_add(FID_FOR_TEST, &cast.hash).unwrap(), cast);
    assert_eq!(handler.last_event_id().unwrap(), 1);
    assert!(store.merge(&cast).unwrap_err().is_duplicate());
}

#[test]
fn test_event_log_replay_and_trim() {
    let db = memory_db();
    let handler = event_handler(&db);
    let store = Store::new(CastStoreDef, db, handler.clone(), PruneLimits::new(10));
    for i in 0..5 {
        store.merge(&create_cast_add(FID_FOR_TEST, 100 + i, &format!("{}", i))).unwrap();
    }

    let replay = handler.get_events(2, 2).unwrap();
    assert_eq!(replay.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 4]);

    assert_eq!(handler.prune_events(4).unwrap(), 3);
    let remaining = handler.get_events(0, 10).unwrap();
    assert_eq!(remaining.iter().map(|e| e.id).collect::<Vec<_>>(), vec![4, 5]);

    let next = store.merge(&create_cast_add(FID_FOR_TEST, 200, "after trim")).unwrap();
    assert_eq!(next.id, 6);
}

#[test]
fn test_sequence_resumes_after_restart() {
    let db = memory_db();
    {
        let handler = event_handler(&db);
        let store = Store::new(CastStoreDef, db.clone(), handler, PruneLimits::new(10));
        store.merge(&create_cast_add(FID_FOR_TEST, 100, "a")).unwrap();
        store.merge(&create_cast_add(FID_FOR_TEST, 101, "b")).unwrap();
    }

    let handler = event_handler(&db);
    assert_eq!(handler.last_event_id().unwrap(), 2);
    let store = Store::new(CastStoreDef, db, handler, PruneLimits::new(10));
    assert_eq!(store.merge(&create_cast_add(FID_FOR_TEST, 102, "c")).unwrap().id, 3);
}

#[test]
fn test_subscription_receives_in_order() {
    let db = memory_db();
    let handler = event_handler(&db);
    let store = Store::new(CastStoreDef, db, handler.clone(), PruneLimits::new(10));

    let mut subscription = handler.subscribe().unwrap();
    assert_eq!(handler.subscriber_count(), 1);
    for i in 0..3 {
        store.merge(&create_cast_add(FID_FOR_TEST, 100 + i, &format!("{}", i))).unwrap();
    }

    let mut ids = Vec::new();
    while let Some(event) = subscription.try_recv().unwrap() {
        ids.push(event.id);
    }
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(subscription.position(), 3);
}

#[test]
fn test_subscription_type_filter() {
    let db = memory_db();
    let handler = event_handler(&db);
    let store = Store::new(CastStoreDef, db, handler.clone(), PruneLimits::new(1));

    let mut prunes = handler.subscribe_to(&[HubEventType::PruneMessage]).unwrap();
    store.merge(&create_cast_add(FID_FOR_TEST, 100, "a")).unwrap();
    store.merge(&create_cast_add(FID_FOR_TEST, 101, "b")).unwrap();
    store.prune_messages(FID_FOR_TEST).unwrap();

    let event = prunes.try_recv().unwrap().unwrap();
    assert_eq!(event.event_type(), HubEventType::PruneMessage);
    assert_eq!(event.id, 3);
    assert!(prunes.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn test_lagging_subscriber_catches_up_from_log() {
    let db = memory_db();
    let handler = Arc::new(StoreEventHandler::new(db.clone(), 2).unwrap());
    let store = Store::new(CastStoreDef, db, handler.clone(), PruneLimits::new(100));

    let mut subscription = handler.subscribe().unwrap();
    for i in 0..6 {
        store.merge(&create_cast_add(FID_FOR_TEST, 100 + i, &format!("{}", i))).unwrap();
    }

    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(subscription.recv().await.unwrap().id);
    }
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_recv_waits_for_commit() {
    let db = memory_db();
    let handler = event_handler(&db);
    let store = Arc::new(Store::new(CastStoreDef, db, handler.clone(), PruneLimits::new(10)));
    let mut subscription = handler.subscribe().unwrap();

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store.merge(&create_cast_add(FID_FOR_TEST, 100, "late")).unwrap();
        })
    };

    let event = subscription.recv().await.unwrap();
    writer.await.unwrap();
    assert_eq!(event.id, 1);
    assert_eq!(event.event_type(), HubEventType::MergeMessage);
}
