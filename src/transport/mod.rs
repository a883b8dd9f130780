//! Voice call transport
//!
//! This module defines the seam between the call controller and the
//! real-time voice channel:
//! - `VoiceTransport` starts and stops calls and hands out event subscriptions
//! - `TransportEvent` is everything the voice channel reports back
//! - `NatsTransport` drives a voice gateway over NATS

mod loopback;
pub mod messages;
mod nats;

pub use loopback::{LoopbackConnector, LoopbackTransport, TransportRequest};
pub use messages::{StartCallMessage, StopCallMessage, TransportEventMessage};
pub use nats::{NatsConnector, NatsTransport};

use crate::call::Role;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Whether an utterance is interim or final
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    Partial,
    Final,
}

/// Events emitted by the voice channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransportEvent {
    /// Connection established
    CallStart,
    /// Connection terminated
    CallEnd,
    /// Utterance recognized on either side of the call
    Transcript {
        role: Role,
        transcript: String,
        transcript_type: TranscriptKind,
    },
    SpeechStart,
    SpeechEnd,
    Error { message: String },
}

/// Variable values passed to the voice gateway when a call starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParams {
    pub variable_values: BTreeMap<String, String>,
}

impl CallParams {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variable_values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variable_values.get(key).map(String::as_str)
    }
}

/// Scoped registration for transport events
///
/// Dropping the subscription deregisters it from the transport.
pub struct EventSubscription {
    rx: broadcast::Receiver<TransportEvent>,
}

impl EventSubscription {
    pub fn new(rx: broadcast::Receiver<TransportEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the transport has gone away. A subscriber that
    /// fell behind may have missed the call ending, so the gap is reported
    /// as `CallEnd`.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(
                    "Event subscription lagged, skipped {} events; treating as call end",
                    skipped
                );
                Some(TransportEvent::CallEnd)
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        debug!("Releasing transport event subscription");
    }
}

/// Real-time voice channel for a single call
#[async_trait::async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Begin a call against `target` (workflow or assistant id)
    ///
    /// Success means the request was accepted, not that the call is up.
    /// Connection progress arrives as `TransportEvent`s.
    async fn start(&self, target: &str, params: CallParams) -> Result<()>;

    /// Request teardown of the current call
    async fn stop(&self) -> Result<()>;

    /// Register for transport events
    fn subscribe(&self) -> EventSubscription;
}

/// Creates a transport for a given call id
#[async_trait::async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, call_id: &str) -> Result<Arc<dyn VoiceTransport>>;
}
