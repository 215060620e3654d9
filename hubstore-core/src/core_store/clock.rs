/*
    clock.rs - Protocol time source

    Protocol time counts seconds since 2021-01-01T00:00:00Z.
*/

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix time of the protocol epoch
pub const FARCASTER_EPOCH: u64 = 1_609_459_200;

pub trait Clock: Send + Sync {
    /// Current protocol time in seconds
    fn now(&self) -> u32;
}

/// Convert unix seconds to protocol seconds, saturating at both ends
pub fn to_protocol_time(unix_seconds: u64) -> u32 {
    let since_epoch = unix_seconds.saturating_sub(FARCASTER_EPOCH);
    u32::try_from(since_epoch).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u32 {
        // A clock before 1970 reads as the epoch
        let unix = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        to_protocol_time(unix)
    }
}

/// Settable clock for tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn new(now: u32) -> Self {
        ManualClock { now: AtomicU32::new(now) }
    }

    pub fn set(&self, now: u32) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u32) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}
