//! Route changes issued after a call finishes

#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Views the controller can send the user to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Route {
    Home,
    Feedback { interview_id: String },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Feedback { interview_id } => format!("/interview/{}/feedback", interview_id),
        }
    }
}

/// Fire-and-forget redirect primitive
#[cfg_attr(test, automock)]
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &Route);
}

/// Navigator that only logs the redirect
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &Route) {
        info!("Redirecting to {}", route.path());
    }
}
