//! Call session management
//!
//! This module provides the `CallSessionController` that manages:
//! - The voice call lifecycle (INACTIVE, CONNECTING, ACTIVE, FINISHED)
//! - Transcript collection from finalized utterances
//! - The one-shot feedback step after an evaluation call ends
//! - Snapshot publishing for observers

mod context;
mod controller;
mod snapshot;
mod transcript;

pub use context::{format_questions, CallTargets, SessionContext, SessionKind};
pub use controller::{CallCommand, CallHandle, CallServices, CallSessionController, FinalizeError};
pub use snapshot::{CallSnapshot, CallStatus};
pub use transcript::{Role, Transcript, TranscriptEntry};
