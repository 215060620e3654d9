/*
    Store subsystem - Generic message store, key layout, paging and events
*/

pub mod engine;
pub mod errors;
pub mod event_handler;
pub mod events;
pub mod keys;
pub mod page;
pub mod subscription;

pub use engine::{PruneLimits, Store};
pub use errors::*;
pub use event_handler::{EventListener, ListenerId, StoreEventHandler, DEFAULT_CHANNEL_CAPACITY};
pub use events::{HubEvent, HubEventBody, HubEventType};
pub use page::{MessagesPage, PageOptions, PAGE_SIZE_MAX};
pub use subscription::EventSubscription;
