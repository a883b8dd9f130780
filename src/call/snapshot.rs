use crate::navigation::Route;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one call attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    #[default]
    Inactive,
    Connecting,
    Active,
    Finished,
}

impl CallStatus {
    /// Whether a new call may be started from this status
    pub fn can_start(self) -> bool {
        matches!(self, CallStatus::Inactive | CallStatus::Finished)
    }

    /// Whether the call is in flight and may be ended
    pub fn is_live(self) -> bool {
        matches!(self, CallStatus::Connecting | CallStatus::Active)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallStatus::Inactive => "INACTIVE",
            CallStatus::Connecting => "CONNECTING",
            CallStatus::Active => "ACTIVE",
            CallStatus::Finished => "FINISHED",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a call session, published to observers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub status: CallStatus,

    /// Whether the interviewer is currently speaking
    pub is_speaking: bool,

    /// Number of finalized transcript entries
    pub message_count: usize,

    /// Content of the most recent transcript entry
    pub last_message: Option<String>,

    /// Number of call attempts started on this controller
    pub attempt: u64,

    /// Where the last finalize step sent the user
    pub route: Option<Route>,
}
