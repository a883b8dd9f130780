use crate::call::CallTargets;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub voice: VoiceConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct VoiceConfig {
    /// Workflow used for question generation calls
    #[serde(default)]
    pub workflow_id: String,
    /// Assistant used for evaluation interviews
    pub interviewer_id: String,
    /// Token the voice gateway expects from web clients
    #[serde(default)]
    pub web_token: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackConfig {
    pub endpoint: String,
    #[serde(default = "default_feedback_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_feedback_timeout_secs() -> u64 {
    60
}

impl FeedbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load from `path` (extension optional), then apply
    /// `INTERVIEW_AGENT__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("INTERVIEW_AGENT").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Report values a call start depends on; returns how many are missing
    pub fn validate(&self) -> usize {
        let mut missing = 0;

        if self.voice.workflow_id.is_empty() {
            error!("Missing voice.workflow_id; generate calls will fail to start");
            missing += 1;
        }
        if self.voice.interviewer_id.is_empty() {
            error!("Missing voice.interviewer_id; evaluate calls will fail to start");
            missing += 1;
        }
        if self.voice.web_token.is_empty() {
            error!("Missing voice.web_token; the gateway will not authenticate calls");
            missing += 1;
        }

        missing
    }

    pub fn call_targets(&self) -> CallTargets {
        CallTargets {
            workflow_id: self.voice.workflow_id.clone(),
            interviewer_id: self.voice.interviewer_id.clone(),
        }
    }
}
