use crate::call::{CallHandle, CallTargets};
use crate::feedback::FeedbackGenerator;
use crate::transport::TransportConnector;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live call sessions (call_id → handle)
    pub calls: Arc<RwLock<HashMap<String, CallHandle>>>,

    /// Call ids claimed by a create request that is still connecting
    pending: Arc<Mutex<HashSet<String>>>,

    /// Opens a voice transport for each new call
    pub connector: Arc<dyn TransportConnector>,

    /// Scores evaluation transcripts
    pub feedback: Arc<dyn FeedbackGenerator>,

    pub targets: CallTargets,
}

impl AppState {
    pub fn new(
        connector: Arc<dyn TransportConnector>,
        feedback: Arc<dyn FeedbackGenerator>,
        targets: CallTargets,
    ) -> Self {
        Self {
            calls: Arc::new(RwLock::new(HashMap::new())),
            pending: Arc::new(Mutex::new(HashSet::new())),
            connector,
            feedback,
            targets,
        }
    }

    /// Claim `call_id` for a new session
    ///
    /// Returns `None` if a session with that id exists or is being created.
    /// The claim is released when the returned reservation is dropped.
    pub(crate) async fn reserve(&self, call_id: &str) -> Option<CallReservation> {
        let calls = self.calls.read().await;
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        if calls.contains_key(call_id) || !pending.insert(call_id.to_string()) {
            return None;
        }

        Some(CallReservation {
            call_id: call_id.to_string(),
            pending: Arc::clone(&self.pending),
        })
    }

    /// Register the session for a reservation and release the claim
    pub(crate) async fn insert(&self, reservation: CallReservation, handle: CallHandle) {
        let mut calls = self.calls.write().await;
        calls.insert(reservation.call_id.clone(), handle);
        drop(reservation);
    }
}

/// Exclusive claim on a call id while its session is being created
pub(crate) struct CallReservation {
    call_id: String,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl Drop for CallReservation {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.call_id);
    }
}
