//! HTTP API for driving call sessions from a front end
//!
//! This module provides a REST API over call session controllers:
//! - POST /calls - Create a call session and start the call
//! - POST /calls/:id/start - Start a new attempt after the call finished
//! - POST /calls/:id/end - End the call
//! - DELETE /calls/:id - Dispose of a call session
//! - GET /calls/:id/status - Query the call snapshot
//! - GET /calls/:id/transcript - Get the transcript of the current attempt
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::CreateCallResponse;
pub use routes::create_router;
pub use state::AppState;
