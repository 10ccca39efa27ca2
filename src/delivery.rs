//! Delivery composition root
//!
//! Wires the dedup gate, the encryption envelope, and a [`Transport`]
//! together: gate first, seal second, send last. The gate's lock is held
//! only for the send/skip decision; sealing and network transmission run
//! outside it so a slow upload never stalls other artifacts' decisions.

use crate::build_id::BuildId;
use crate::config::CourierConfig;
use crate::dedup::{Decision, DedupGate};
use crate::envelope;
use crate::error::{CourierError, CourierResult};
use crate::obfuscate;
use crate::transport::{Transport, TransportRequest};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Result of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Payload handed to the transport
    Sent,
    /// Suppressed by the dedup gate; nothing transmitted
    Duplicate,
}

/// Artifact delivery pipeline
#[derive(Debug)]
pub struct DeliveryService<T: Transport> {
    config: CourierConfig,
    gate: DedupGate,
    transport: T,
}

impl<T: Transport> DeliveryService<T> {
    /// Build the pipeline for the currently running build.
    ///
    /// Loads the dedup cache once; history recorded under a different
    /// build is discarded here.
    pub fn new(config: CourierConfig, transport: T) -> CourierResult<Self> {
        Self::with_build_id(config, transport, BuildId::current())
    }

    /// Build the pipeline with an explicit build token (primarily for
    /// tests and tooling)
    pub fn with_build_id(
        config: CourierConfig,
        transport: T,
        build_id: BuildId,
    ) -> CourierResult<Self> {
        if config.encryption.enabled && config.encryption.recipient_key_pem.is_none() {
            return Err(CourierError::RecipientKeyMissing);
        }

        let gate = DedupGate::open(
            config.cache_path(),
            build_id,
            Duration::hours(config.cache.window_hours),
        );

        Ok(Self {
            config,
            gate,
            transport,
        })
    }

    /// Deliver `payload` under the artifact name `name`
    pub fn deliver(&self, name: &str, payload: &[u8]) -> CourierResult<Outcome> {
        self.deliver_at(name, payload, Utc::now())
    }

    /// Deliver with an explicit clock, which the dedup window is measured
    /// against.
    ///
    /// The artifact is recorded as sent the moment the gate admits it, so
    /// a sealing or transport failure afterwards is not retried within the
    /// window. Sealing failures abort only this delivery; the payload is
    /// never sent unencrypted as a fallback.
    pub fn deliver_at(
        &self,
        name: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> CourierResult<Outcome> {
        if self.gate.allow(name, now) == Decision::Duplicate {
            return Ok(Outcome::Duplicate);
        }

        let (file_name, payload) = if self.config.encryption.enabled {
            let pem = self
                .config
                .encryption
                .recipient_key_pem
                .as_deref()
                .ok_or(CourierError::RecipientKeyMissing)?;
            (envelope::sealed_name(name), envelope::seal(payload, pem)?)
        } else {
            (name.to_string(), payload.to_vec())
        };

        let form_fields = self
            .config
            .delivery
            .form_fields
            .iter()
            .map(|(key, value)| (key.clone(), obfuscate::reveal(value)))
            .collect();

        let request = TransportRequest {
            endpoint: self.config.delivery.endpoint.clone(),
            field_name: self.config.delivery.field_name.clone(),
            file_name,
            payload,
            form_fields,
        };

        debug!("Sending artifact {} ({} bytes)", name, request.payload.len());
        self.transport.send(&request)?;
        Ok(Outcome::Sent)
    }
}
