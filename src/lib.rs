//! Courier - Dedup-Gated Artifact Delivery
//!
//! Forwards named byte payloads to a remote collection endpoint through a
//! persistent, build-aware deduplication gate, optionally sealing each
//! payload in a hybrid RSA + AES encryption envelope before it leaves the
//! process.

pub mod build_id;
pub mod config;
pub mod dedup;
pub mod delivery;
pub mod envelope;
pub mod error;
pub mod obfuscate;
pub mod transport;

pub use delivery::{DeliveryService, Outcome};
pub use error::{CourierError, CourierResult};
