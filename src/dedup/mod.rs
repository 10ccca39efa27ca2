//! Build-aware, time-windowed delivery deduplication
//!
//! [`store::CacheStore`] owns the persisted send history; [`gate::DedupGate`]
//! serializes the check-then-record decision behind a single lock.

pub mod gate;
pub mod store;

pub use gate::{Decision, DedupGate};
pub use store::CacheStore;
