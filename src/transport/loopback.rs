use super::{CallParams, EventSubscription, TransportConnector, TransportEvent, VoiceTransport};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

/// Request received by a `LoopbackTransport`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportRequest {
    Start { target: String, params: CallParams },
    Stop,
}

/// In-process transport: records requests and replays injected events
///
/// Used for local runs without a voice gateway, and in tests.
pub struct LoopbackTransport {
    events_tx: broadcast::Sender<TransportEvent>,
    requests: Mutex<Vec<TransportRequest>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            events_tx,
            requests: Mutex::new(Vec::new()),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    /// Deliver an event to every live subscription
    ///
    /// Returns how many subscriptions received it.
    pub fn emit(&self, event: TransportEvent) -> usize {
        debug!("Loopback emitting {:?}", event);
        self.events_tx.send(event).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Number of live event subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events_tx.receiver_count()
    }

    fn record(&self, request: TransportRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VoiceTransport for LoopbackTransport {
    async fn start(&self, target: &str, params: CallParams) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.record(TransportRequest::Start {
            target: target.to_string(),
            params,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.record(TransportRequest::Stop);
        Ok(())
    }

    fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(self.events_tx.subscribe())
    }
}

/// Hands out a `LoopbackTransport` per call id and keeps them reachable
#[derive(Default)]
pub struct LoopbackConnector {
    transports: Mutex<HashMap<String, Arc<LoopbackTransport>>>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport created for `call_id`, if any
    pub fn transport(&self, call_id: &str) -> Option<Arc<LoopbackTransport>> {
        self.transports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(call_id)
            .cloned()
    }
}

#[async_trait::async_trait]
impl TransportConnector for LoopbackConnector {
    async fn connect(&self, call_id: &str) -> Result<Arc<dyn VoiceTransport>> {
        let transport = Arc::new(LoopbackTransport::new());
        self.transports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call_id.to_string(), Arc::clone(&transport));
        Ok(transport as Arc<dyn VoiceTransport>)
    }
}
