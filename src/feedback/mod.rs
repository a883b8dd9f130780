//! Feedback generation collaborator
//!
//! After an evaluation call ends, the transcript is submitted to an external
//! service that scores it and stores a feedback record.

mod client;

pub use client::HttpFeedbackClient;

use crate::call::TranscriptEntry;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Request to score a finished interview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    pub interview_id: String,
    pub user_id: String,
    pub transcript: Vec<TranscriptEntry>,

    /// Existing feedback record to overwrite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<String>,
}

/// Result reported by the feedback service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackResponse {
    pub success: bool,
    pub feedback_id: Option<String>,
    pub error: Option<String>,
}

impl CreateFeedbackResponse {
    pub fn created(feedback_id: impl Into<String>) -> Self {
        Self {
            success: true,
            feedback_id: Some(feedback_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            feedback_id: None,
            error: Some(error.into()),
        }
    }
}

/// Service that turns a transcript into a stored feedback record
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn create_feedback(&self, request: CreateFeedbackRequest)
        -> Result<CreateFeedbackResponse>;
}
