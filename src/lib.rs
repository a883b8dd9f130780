pub mod call;
pub mod config;
pub mod feedback;
pub mod http;
pub mod navigation;
pub mod transport;

pub use call::{
    CallHandle, CallServices, CallSessionController, CallSnapshot, CallStatus, CallTargets, Role,
    SessionContext, SessionKind, Transcript, TranscriptEntry,
};
pub use config::Config;
pub use feedback::{CreateFeedbackRequest, CreateFeedbackResponse, FeedbackGenerator, HttpFeedbackClient};
pub use http::{create_router, AppState};
pub use navigation::{LogNavigator, Navigator, Route};
pub use transport::{
    CallParams, EventSubscription, NatsConnector, TransportConnector, TransportEvent, VoiceTransport,
};
