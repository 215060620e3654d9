//! Test utilities and helpers for the hub store
//!
//! Message factories that produce correctly hashed and signed messages, plus
//! deterministic keys and byte generators so runs are reproducible.

pub mod deterministic_rng;
pub mod fixtures;

pub use deterministic_rng::*;
pub use fixtures::*;
