use super::{CallParams, TransportEvent};
use serde::{Deserialize, Serialize};

/// Call start request published to the voice gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct StartCallMessage {
    pub call_id: String,
    pub target: String,
    #[serde(flatten)]
    pub params: CallParams,
    /// Web client token the gateway authenticates the call with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_token: Option<String>,
    pub timestamp: String, // RFC3339 timestamp
}

/// Call teardown request published to the voice gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct StopCallMessage {
    pub call_id: String,
    pub timestamp: String,
}

/// Event envelope received from the voice gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct TransportEventMessage {
    pub call_id: String,
    pub event: TransportEvent,
}
