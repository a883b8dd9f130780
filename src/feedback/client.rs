use super::{CreateFeedbackRequest, CreateFeedbackResponse, FeedbackGenerator};
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Feedback generator reached over HTTP
pub struct HttpFeedbackClient {
    client: Client,
    endpoint: String,
}

impl HttpFeedbackClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build feedback HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl FeedbackGenerator for HttpFeedbackClient {
    async fn create_feedback(
        &self,
        request: CreateFeedbackRequest,
    ) -> Result<CreateFeedbackResponse> {
        info!(
            "Submitting feedback for interview {} ({} transcript entries)",
            request.interview_id,
            request.transcript.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Failed to reach feedback service")?
            .error_for_status()
            .context("Feedback service returned an error status")?;

        let body = response
            .json::<CreateFeedbackResponse>()
            .await
            .context("Failed to parse feedback service response")?;

        debug!("Feedback service response: {:?}", body);

        Ok(body)
    }
}
