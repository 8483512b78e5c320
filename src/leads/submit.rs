//! How the wizard hands a finished lead off.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::model::{LeadSubmission, SubmitResponse};
use crate::error::SubmissionError;

/// Accepts a finished lead. Called exactly once per successful contact submit.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, submission: &LeadSubmission) -> Result<SubmitResponse, SubmissionError>;
}

/// Posts submissions as JSON to the intake endpoint.
///
/// No timeout is set here; the client's own transport settings apply.
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSubmitter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, submission: &LeadSubmission) -> Result<SubmitResponse, SubmissionError> {
        debug!(endpoint = %self.endpoint, "Posting lead submission");

        let response = self
            .client
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(parsed) if !status.is_success() && parsed.success => {
                warn!(%status, "Submission endpoint reported success with an error status");
                Err(SubmissionError::InvalidResponse(format!(
                    "HTTP {status} with success=true"
                )))
            }
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => {
                Err(SubmissionError::Rejected(format!("HTTP {status}")))
            }
            Err(e) => Err(SubmissionError::InvalidResponse(e.to_string())),
        }
    }
}
