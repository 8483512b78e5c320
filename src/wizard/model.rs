//! Wizard answers and the persisted in-progress session.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::state::WizardPosition;

/// A single answer: either a plain value (select questions) or a small
/// sub-object for multi-field questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Fields(BTreeMap<String, String>),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn fields<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fields(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Fields(_) => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Fields(map) => map.get(name).map(String::as_str),
            Self::Text(_) => None,
        }
    }
}

/// Answers keyed by question key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WizardAnswers(BTreeMap<String, AnswerValue>);

impl WizardAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an answer in, replacing any earlier answer for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: AnswerValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&AnswerValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Flatten into a single-level map. Multi-field answers contribute their
    /// fields directly (e.g. `companyInfo.companyName` becomes `companyName`).
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut flat = BTreeMap::new();
        for (key, value) in &self.0 {
            match value {
                AnswerValue::Text(s) => {
                    flat.insert(key.clone(), s.clone());
                }
                AnswerValue::Fields(fields) => {
                    flat.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
        flat
    }
}

/// Snapshot of an in-progress wizard, written to the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub answers: WizardAnswers,
    pub position: WizardPosition,
    pub saved_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn new(answers: WizardAnswers, position: WizardPosition, saved_at: DateTime<Utc>) -> Self {
        Self {
            answers,
            position,
            saved_at,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.saved_at
    }

    /// A session is only usable while strictly younger than the window.
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) >= window
    }
}

/// Keys used in the tab-scoped session store.
pub mod storage_keys {
    /// In-progress wizard snapshot.
    pub const WIZARD_SESSION: &str = "playbookWizardData";
    /// Auxiliary recovery blob (email captured by the exit-intent offer).
    pub const RECOVERY: &str = "playbookRecovery";
    /// Debug log of recent analytics events.
    pub const ANALYTICS_EVENTS: &str = "analyticsEvents";
    /// JSON object of feature-flag overrides.
    pub const FLAG_OVERRIDES: &str = "featureFlags";
    /// Prefix for sticky A/B variant assignments.
    pub const AB_PREFIX: &str = "ab_";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_value_serde_is_untagged() {
        let text: AnswerValue = serde_json::from_str("\"$1-5M\"").unwrap();
        assert_eq!(text, AnswerValue::text("$1-5M"));

        let fields: AnswerValue =
            serde_json::from_str(r#"{"companyName":"Acme Inc","websiteUrl":"https://acme.com"}"#)
                .unwrap();
        assert_eq!(fields.field("companyName"), Some("Acme Inc"));
        assert!(fields.as_text().is_none());
    }

    #[test]
    fn flatten_lifts_sub_fields() {
        let mut answers = WizardAnswers::new();
        answers.insert(
            "companyInfo",
            AnswerValue::fields([("companyName", "Acme Inc"), ("websiteUrl", "https://acme.com")]),
        );
        answers.insert("ttmRevenue", AnswerValue::text("$1-5M"));

        let flat = answers.flatten();
        assert_eq!(flat.get("companyName").map(String::as_str), Some("Acme Inc"));
        assert_eq!(flat.get("ttmRevenue").map(String::as_str), Some("$1-5M"));
        assert!(!flat.contains_key("companyInfo"));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let saved_at = Utc::now();
        let session = PersistedSession::new(
            WizardAnswers::new(),
            WizardPosition::initial(),
            saved_at,
        );
        let window = Duration::hours(24);

        assert!(!session.is_expired(saved_at + Duration::hours(23), window));
        assert!(session.is_expired(saved_at + Duration::hours(24), window));
        assert!(session.is_expired(saved_at + Duration::hours(30), window));
    }

    #[test]
    fn persisted_session_uses_camel_case() {
        let session = PersistedSession::new(
            WizardAnswers::new(),
            WizardPosition::questioning(2),
            Utc::now(),
        );
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("savedAt").is_some());
        assert_eq!(json["position"]["phase"], "questioning");
        assert_eq!(json["position"]["index"], 2);
    }
}
