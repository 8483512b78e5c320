//! Lead intake — save first, notify best-effort.
//!
//! The hosted database and the alert email are external collaborators; this
//! module only fixes the order they run in and which failures matter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{ClientInfo, LeadSubmission, SubmissionRecord};
use crate::error::LeadError;

/// Event name stored alongside each saved submission.
pub const SUBMISSION_EVENT: &str = "playbook_submission";

/// Persistence for leads and intake analytics.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn insert_submission(&self, record: &SubmissionRecord) -> Result<(), LeadError>;

    async fn mark_email_sent(&self, id: Uuid) -> Result<(), LeadError>;

    async fn record_event(&self, name: &str, data: Value, page_url: &str)
    -> Result<(), LeadError>;
}

/// Sends the internal "new lead" alert. Returns the provider's message id if any.
#[async_trait]
pub trait LeadNotifier: Send + Sync {
    async fn send_lead_alert(&self, record: &SubmissionRecord) -> Result<Option<String>, LeadError>;
}

/// A stored intake analytics event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub name: String,
    pub data: Value,
    pub page_url: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory repository.
#[derive(Default)]
pub struct MemoryLeadRepository {
    submissions: RwLock<Vec<SubmissionRecord>>,
    events: RwLock<Vec<StoredEvent>>,
}

impl MemoryLeadRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn submissions(&self) -> Vec<SubmissionRecord> {
        self.submissions.read().await.clone()
    }

    pub async fn events(&self) -> Vec<StoredEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl LeadRepository for MemoryLeadRepository {
    async fn insert_submission(&self, record: &SubmissionRecord) -> Result<(), LeadError> {
        self.submissions.write().await.push(record.clone());
        Ok(())
    }

    async fn mark_email_sent(&self, id: Uuid) -> Result<(), LeadError> {
        let mut submissions = self.submissions.write().await;
        let record = submissions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| LeadError::NotFound { id: id.to_string() })?;
        record.email_sent = true;
        Ok(())
    }

    async fn record_event(
        &self,
        name: &str,
        data: Value,
        page_url: &str,
    ) -> Result<(), LeadError> {
        self.events.write().await.push(StoredEvent {
            name: name.to_string(),
            data,
            page_url: page_url.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

/// Notifier that only logs the alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl LeadNotifier for LogNotifier {
    async fn send_lead_alert(&self, record: &SubmissionRecord) -> Result<Option<String>, LeadError> {
        info!(
            submission_id = %record.id,
            company = record.company_name.as_deref().unwrap_or("unknown"),
            revenue = record.ttm_revenue.as_deref().unwrap_or("unknown"),
            "New playbook lead"
        );
        Ok(None)
    }
}

/// Coordinates saving a lead and sending its alert.
pub struct LeadIntake {
    repo: Arc<dyn LeadRepository>,
    notifier: Arc<dyn LeadNotifier>,
}

impl LeadIntake {
    pub fn new(repo: Arc<dyn LeadRepository>, notifier: Arc<dyn LeadNotifier>) -> Self {
        Self { repo, notifier }
    }

    /// Save the submission, then record analytics and send the alert.
    ///
    /// Only the save can fail the call. Analytics and alert failures are
    /// logged and swallowed; the record is marked `email_sent` only when the
    /// alert went out.
    pub async fn accept(
        &self,
        submission: &LeadSubmission,
        client: &ClientInfo,
    ) -> Result<SubmissionRecord, LeadError> {
        let mut record = SubmissionRecord::from_submission(submission, client);

        self.repo.insert_submission(&record).await?;
        info!(submission_id = %record.id, "Playbook submission saved");

        let event = json!({
            "submission_id": record.id,
            "company_name": record.company_name,
            "challenge": record.biggest_challenge,
        });
        let page_url = client.referer.as_deref().unwrap_or("/");
        if let Err(e) = self.repo.record_event(SUBMISSION_EVENT, event, page_url).await {
            warn!(submission_id = %record.id, error = %e, "Failed to record submission event");
        }

        match self.notifier.send_lead_alert(&record).await {
            Ok(email_id) => {
                info!(
                    submission_id = %record.id,
                    email_id = email_id.as_deref().unwrap_or("-"),
                    "Lead alert sent"
                );
                match self.repo.mark_email_sent(record.id).await {
                    Ok(()) => record.email_sent = true,
                    Err(e) => {
                        warn!(submission_id = %record.id, error = %e, "Failed to mark alert as sent")
                    }
                }
            }
            Err(e) => {
                warn!(submission_id = %record.id, error = %e, "Lead alert failed");
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait]
    impl LeadNotifier for FailingNotifier {
        async fn send_lead_alert(
            &self,
            _record: &SubmissionRecord,
        ) -> Result<Option<String>, LeadError> {
            Err(LeadError::Notify("smtp down".into()))
        }
    }

    struct FailingRepo;

    #[async_trait]
    impl LeadRepository for FailingRepo {
        async fn insert_submission(&self, _record: &SubmissionRecord) -> Result<(), LeadError> {
            Err(LeadError::Save("db unavailable".into()))
        }
        async fn mark_email_sent(&self, _id: Uuid) -> Result<(), LeadError> {
            unreachable!("nothing saved")
        }
        async fn record_event(
            &self,
            _name: &str,
            _data: Value,
            _page_url: &str,
        ) -> Result<(), LeadError> {
            unreachable!("nothing saved")
        }
    }

    fn submission() -> LeadSubmission {
        serde_json::from_str(
            r#"{"companyName":"Acme Inc","websiteUrl":"acme.com","biggestChallenge":"Not enough leads","contactEmail":"a@b.com"}"#,
        )
        .unwrap()
    }

    fn client() -> ClientInfo {
        ClientInfo {
            user_agent: "test".into(),
            ip_address: "127.0.0.1".into(),
            referer: Some("https://example.com/".into()),
        }
    }

    #[tokio::test]
    async fn accepted_lead_is_saved_and_marked_sent() {
        let repo = MemoryLeadRepository::new();
        let intake = LeadIntake::new(repo.clone(), Arc::new(LogNotifier));

        let record = intake.accept(&submission(), &client()).await.unwrap();
        assert!(record.email_sent);

        let saved = repo.submissions().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, record.id);
        assert!(saved[0].email_sent);
        assert_eq!(saved[0].website_url, "https://acme.com");

        let events = repo.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "playbook_submission");
        assert_eq!(events[0].page_url, "https://example.com/");
    }

    #[tokio::test]
    async fn alert_failure_does_not_fail_the_lead() {
        let repo = MemoryLeadRepository::new();
        let intake = LeadIntake::new(repo.clone(), Arc::new(FailingNotifier));

        let record = intake.accept(&submission(), &client()).await.unwrap();
        assert!(!record.email_sent);
        assert_eq!(repo.submissions().await.len(), 1);
        assert!(!repo.submissions().await[0].email_sent);
    }

    #[tokio::test]
    async fn save_failure_is_an_error() {
        let intake = LeadIntake::new(Arc::new(FailingRepo), Arc::new(LogNotifier));
        let err = intake.accept(&submission(), &client()).await.unwrap_err();
        assert!(matches!(err, LeadError::Save(_)));
    }
}
