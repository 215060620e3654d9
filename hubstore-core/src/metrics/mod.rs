//! Metrics for the message stores
//!
//! Counters and histograms go through the `metrics` facade; installing a
//! recorder is left to the embedding process.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const MERGE_SUCCESS: &str = "store.merge.success";
pub const MERGE_DUPLICATE: &str = "store.merge.duplicate";
pub const MERGE_CONFLICT: &str = "store.merge.conflict";
pub const MERGE_PRUNABLE: &str = "store.merge.prunable";
pub const MERGE_DURATION_MS: &str = "store.merge.duration_ms";
pub const PRUNE_MESSAGES: &str = "store.prune.messages";
pub const REVOKE_MESSAGES: &str = "store.revoke.messages";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(MERGE_SUCCESS, "Messages admitted by merge");
    describe_counter!(MERGE_DUPLICATE, "Merges rejected as duplicates");
    describe_counter!(MERGE_CONFLICT, "Merges rejected by conflict resolution");
    describe_counter!(MERGE_PRUNABLE, "Merges rejected because pruning would evict them at once");
    describe_histogram!(MERGE_DURATION_MS, "Merge duration in milliseconds");
    describe_counter!(PRUNE_MESSAGES, "Messages removed by size or age limits");
    describe_counter!(REVOKE_MESSAGES, "Messages removed by signer revocation");
}

/// Count one event for the named store
pub fn record_store_counter(name: &'static str, store: &'static str, value: u64) {
    counter!(name, "store" => store).increment(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    store: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str, store: &'static str) -> Self {
        Self { name, store, start: Instant::now() }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name, "store" => self.store).record(duration.as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_init() {
        // No recorder installed, the facade drops everything
        init_metrics();
        record_store_counter(MERGE_SUCCESS, "casts", 1);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new(MERGE_DURATION_MS, "casts");
        std::thread::sleep(std::time::Duration::from_millis(1));
        timer.stop();
    }
}
