use super::state::AppState;
use crate::call::{
    CallHandle, CallServices, CallSessionController, CallSnapshot, CallStatus, SessionContext,
};
use crate::navigation::LogNavigator;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCallRequest {
    /// Optional call ID (if not provided, generate UUID)
    pub call_id: Option<String>,

    #[serde(flatten)]
    pub context: SessionContext,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCallResponse {
    pub call_id: String,
    pub status: CallStatus,
}

#[derive(Debug, Serialize)]
pub struct CallStatusResponse {
    pub call_id: String,
    pub status: CallStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn not_found(call_id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Call {} not found", call_id))
}

async fn find_call(state: &AppState, call_id: &str) -> Option<CallHandle> {
    let calls = state.calls.read().await;
    calls.get(call_id).cloned()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /calls
/// Create a call session and start the call
pub async fn create_call(
    State(state): State<AppState>,
    Json(req): Json<CreateCallRequest>,
) -> impl IntoResponse {
    let call_id = req
        .call_id
        .unwrap_or_else(|| format!("call-{}", uuid::Uuid::new_v4()));

    info!("Creating {:?} call: {}", req.context.kind, call_id);

    let Some(reservation) = state.reserve(&call_id).await else {
        return error_response(
            StatusCode::CONFLICT,
            format!("Call {} already exists", call_id),
        );
    };

    let transport = match state.connector.connect(&call_id).await {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to open transport: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to open transport: {}", e),
            );
        }
    };

    let controller = CallSessionController::new(
        req.context,
        state.targets.clone(),
        CallServices {
            transport,
            feedback: Arc::clone(&state.feedback),
            navigator: Arc::new(LogNavigator),
        },
    );
    let (handle, _task) = controller.spawn();

    let status = match handle.start_call().await {
        Ok(status) => status,
        Err(e) => {
            error!("Failed to start call: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start call: {}", e),
            );
        }
    };

    state.insert(reservation, handle).await;

    info!("Call {} is {}", call_id, status);

    (StatusCode::OK, Json(CreateCallResponse { call_id, status })).into_response()
}

/// POST /calls/:call_id/start
/// Start a new attempt on an existing call session
pub async fn start_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = find_call(&state, &call_id).await else {
        return not_found(&call_id);
    };

    match handle.start_call().await {
        Ok(status) => (StatusCode::OK, Json(CallStatusResponse { call_id, status })).into_response(),
        Err(e) => {
            error!("Failed to start call: {:#}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start call: {}", e),
            )
        }
    }
}

/// POST /calls/:call_id/end
/// End the call for a specific session
pub async fn end_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    info!("Ending call: {}", call_id);

    let Some(handle) = find_call(&state, &call_id).await else {
        return not_found(&call_id);
    };

    match handle.end_call().await {
        Ok(status) => (StatusCode::OK, Json(CallStatusResponse { call_id, status })).into_response(),
        Err(e) => {
            error!("Failed to end call: {:#}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to end call: {}", e),
            )
        }
    }
}

/// DELETE /calls/:call_id
/// Dispose of a call session
pub async fn remove_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let removed = {
        let mut calls = state.calls.write().await;
        calls.remove(&call_id)
    };

    match removed {
        Some(_) => {
            info!("Removed call {}", call_id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(&call_id),
    }
}

/// GET /calls/:call_id/status
/// Get the latest snapshot of a call session
pub async fn get_call_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    match find_call(&state, &call_id).await {
        Some(handle) => {
            let snapshot: CallSnapshot = handle.snapshot();
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        None => not_found(&call_id),
    }
}

/// GET /calls/:call_id/transcript
/// Get the transcript of the current attempt
pub async fn get_call_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = find_call(&state, &call_id).await else {
        return not_found(&call_id);
    };

    match handle.transcript().await {
        Ok(transcript) => (StatusCode::OK, Json(transcript)).into_response(),
        Err(e) => {
            error!("Failed to get transcript: {:#}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to get transcript: {}", e),
            )
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
