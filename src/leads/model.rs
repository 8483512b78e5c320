//! Lead submission payloads and records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::wizard::model::WizardAnswers;

/// Answer keys the intake side reads out of a submission.
pub mod answer_keys {
    pub const COMPANY_NAME: &str = "companyName";
    pub const WEBSITE_URL: &str = "websiteUrl";
    pub const TTM_REVENUE: &str = "ttmRevenue";
    pub const CURRENT_GROWTH_RATE: &str = "currentGrowthRate";
    pub const TARGET_GROWTH_RATE: &str = "targetGrowthRate";
    pub const BIGGEST_CHALLENGE: &str = "biggestChallenge";
}

/// What the wizard sends: flattened answers plus the contact email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    #[serde(flatten)]
    pub answers: BTreeMap<String, String>,
    pub contact_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LeadSubmission {
    pub fn from_answers(answers: &WizardAnswers, contact_email: &str, now: DateTime<Utc>) -> Self {
        Self {
            answers: answers.flatten(),
            contact_email: contact_email.to_string(),
            timestamp: Some(now),
        }
    }

    pub fn answer(&self, key: &str) -> Option<&str> {
        self.answers.get(key).map(String::as_str)
    }
}

/// Response from the submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SubmitResponse {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            error: None,
            message: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Request metadata captured alongside a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: String,
    pub ip_address: String,
    pub referer: Option<String>,
}

/// A saved lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub company_name: Option<String>,
    pub website_url: String,
    pub contact_email: String,
    pub ttm_revenue: Option<String>,
    pub current_growth_rate: Option<String>,
    pub target_growth_rate: Option<String>,
    pub biggest_challenge: Option<String>,
    /// Every answer as submitted, for later analysis.
    pub answers: BTreeMap<String, String>,
    pub user_agent: String,
    pub ip_address: String,
    pub email_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn from_submission(submission: &LeadSubmission, client: &ClientInfo) -> Self {
        let owned = |key: &str| submission.answer(key).map(String::from);
        Self {
            id: Uuid::new_v4(),
            company_name: owned(answer_keys::COMPANY_NAME),
            website_url: normalize_website_url(
                submission.answer(answer_keys::WEBSITE_URL).unwrap_or(""),
            ),
            contact_email: submission.contact_email.clone(),
            ttm_revenue: owned(answer_keys::TTM_REVENUE),
            current_growth_rate: owned(answer_keys::CURRENT_GROWTH_RATE),
            target_growth_rate: owned(answer_keys::TARGET_GROWTH_RATE),
            biggest_challenge: owned(answer_keys::BIGGEST_CHALLENGE),
            answers: submission.answers.clone(),
            user_agent: client.user_agent.clone(),
            ip_address: client.ip_address.clone(),
            email_sent: false,
            created_at: Utc::now(),
        }
    }
}

/// Prefix `https://` when the URL has no http(s) scheme. Empty stays empty.
pub fn normalize_website_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}
