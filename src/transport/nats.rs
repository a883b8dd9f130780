use super::messages::{StartCallMessage, StopCallMessage, TransportEventMessage};
use super::{CallParams, EventSubscription, TransportConnector, TransportEvent, VoiceTransport};
use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the per-call event fan-out
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Voice transport backed by a NATS-connected voice gateway
pub struct NatsTransport {
    client: Client,
    call_id: String,
    web_token: Option<String>,
    events_tx: broadcast::Sender<TransportEvent>,
    event_task: JoinHandle<()>,
}

impl NatsTransport {
    /// Build a transport on an existing NATS connection
    pub async fn with_client(
        client: Client,
        call_id: String,
        web_token: Option<String>,
    ) -> Result<Self> {
        let subject = format!("voice.call.events.{}", call_id);

        info!("Subscribing to call events on {}", subject);

        let mut subscriber = client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to call events")?;

        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let tx = events_tx.clone();
        let expected_call_id = call_id.clone();
        let event_task = tokio::spawn(async move {
            debug!("Call event task started for {}", expected_call_id);

            while let Some(msg) = subscriber.next().await {
                if let Some(event) = parse_call_event(&msg.payload, &expected_call_id) {
                    // No live subscription is fine; the event is simply dropped
                    let _ = tx.send(event);
                }
            }

            debug!("Call event task stopped for {}", expected_call_id);
        });

        Ok(Self {
            client,
            call_id,
            web_token,
            events_tx,
            event_task,
        })
    }
}

fn start_message(
    call_id: &str,
    web_token: Option<String>,
    target: &str,
    params: CallParams,
) -> StartCallMessage {
    StartCallMessage {
        call_id: call_id.to_string(),
        target: target.to_string(),
        params,
        web_token,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Decode an event envelope, keeping only events addressed to `call_id`
fn parse_call_event(payload: &[u8], call_id: &str) -> Option<TransportEvent> {
    match serde_json::from_slice::<TransportEventMessage>(payload) {
        Ok(envelope) if envelope.call_id == call_id => Some(envelope.event),
        Ok(envelope) => {
            debug!("Ignoring event for call {}", envelope.call_id);
            None
        }
        Err(e) => {
            warn!("Failed to parse call event message: {}", e);
            None
        }
    }
}

#[async_trait::async_trait]
impl VoiceTransport for NatsTransport {
    async fn start(&self, target: &str, params: CallParams) -> Result<()> {
        let subject = format!("voice.call.start.{}", self.call_id);

        let message = start_message(&self.call_id, self.web_token.clone(), target, params);

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish call start")?;

        info!("Published call start to {} (target={})", subject, target);

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let subject = format!("voice.call.stop.{}", self.call_id);

        let message = StopCallMessage {
            call_id: self.call_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish call stop")?;

        info!("Published call stop to {}", subject);

        Ok(())
    }

    fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(self.events_tx.subscribe())
    }
}

impl Drop for NatsTransport {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}

/// Opens one `NatsTransport` per call over a shared NATS connection
pub struct NatsConnector {
    client: Client,
    web_token: Option<String>,
}

impl NatsConnector {
    /// Connect to NATS; an empty `web_token` is not sent to the gateway
    pub async fn open(url: &str, web_token: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        let web_token = (!web_token.is_empty()).then(|| web_token.to_string());

        Ok(Self { client, web_token })
    }
}

#[async_trait::async_trait]
impl TransportConnector for NatsConnector {
    async fn connect(&self, call_id: &str) -> Result<Arc<dyn VoiceTransport>> {
        let transport = NatsTransport::with_client(
            self.client.clone(),
            call_id.to_string(),
            self.web_token.clone(),
        )
        .await?;
        Ok(Arc::new(transport) as Arc<dyn VoiceTransport>)
    }
}
