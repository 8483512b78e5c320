//! Recovery banner: offers to resume an unfinished wizard session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::machine::WizardMachine;
use super::model::storage_keys;
use super::session::SessionRecovery;
use super::state::WizardPosition;

/// Email left through the exit-intent "save for later" offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedContact {
    pub email: String,
    pub saved_at: DateTime<Utc>,
}

/// What the banner shows about the session it offers to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryNotice {
    pub position: WizardPosition,
    pub answered: usize,
    pub saved_at: DateTime<Utc>,
    pub age: Duration,
    pub email: Option<String>,
}

pub struct RecoveryBanner {
    recovery: SessionRecovery,
}

impl RecoveryBanner {
    pub fn new(recovery: SessionRecovery) -> Self {
        Self { recovery }
    }

    /// Look for a resumable session.
    ///
    /// Expired and unreadable sessions are purged and yield `None`.
    pub fn check(&self, now: DateTime<Utc>) -> Option<RecoveryNotice> {
        let session = self.recovery.load(now)?;
        if session.position.is_terminal() {
            return None;
        }
        let email = self
            .recovery
            .store()
            .get(storage_keys::RECOVERY)
            .and_then(|raw| serde_json::from_str::<SavedContact>(&raw).ok())
            .map(|contact| contact.email);

        Some(RecoveryNotice {
            position: session.position,
            answered: session.answers.len(),
            saved_at: session.saved_at,
            age: session.age(now),
            email,
        })
    }

    /// Open the wizard, which hydrates from the persisted session.
    pub fn resume(&self, machine: &mut WizardMachine) {
        debug!("Resuming wizard from recovery banner");
        machine.open();
    }

    /// Forget the unfinished session without opening the wizard.
    pub fn dismiss(&self) {
        debug!("Recovery banner dismissed");
        self.recovery.clear();
        self.recovery.store().remove(storage_keys::RECOVERY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WizardConfig;
    use crate::wizard::model::{AnswerValue, PersistedSession, WizardAnswers};
    use crate::wizard::session::{MemorySessionStore, SessionStore};
    use std::sync::Arc;

    fn banner_with_session(saved_at: DateTime<Utc>) -> (Arc<MemorySessionStore>, RecoveryBanner) {
        let store = MemorySessionStore::new();
        let recovery = SessionRecovery::new(store.clone(), &WizardConfig::default());
        let mut answers = WizardAnswers::new();
        answers.insert(
            "companyInfo",
            AnswerValue::fields([("companyName", "Acme Inc"), ("websiteUrl", "https://acme.com")]),
        );
        recovery.save(&PersistedSession::new(
            answers,
            WizardPosition::questioning(1),
            saved_at,
        ));
        (store, RecoveryBanner::new(recovery))
    }

    #[test]
    fn fresh_session_shows_banner() {
        let now = Utc::now();
        let (_store, banner) = banner_with_session(now - Duration::hours(2));

        let notice = banner.check(now).unwrap();
        assert_eq!(notice.position, WizardPosition::questioning(1));
        assert_eq!(notice.answered, 1);
        assert_eq!(notice.age, Duration::hours(2));
        assert!(notice.email.is_none());
    }

    #[test]
    fn expired_session_is_purged() {
        let now = Utc::now();
        let (store, banner) = banner_with_session(now - Duration::hours(24));

        assert!(banner.check(now).is_none());
        assert!(store.get(storage_keys::WIZARD_SESSION).is_none());
    }

    #[test]
    fn saved_email_is_surfaced() {
        let now = Utc::now();
        let (store, banner) = banner_with_session(now);
        let contact = SavedContact {
            email: "a@b.com".into(),
            saved_at: now,
        };
        store.set(storage_keys::RECOVERY, &serde_json::to_string(&contact).unwrap());

        assert_eq!(banner.check(now).unwrap().email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn dismiss_clears_both_keys() {
        let now = Utc::now();
        let (store, banner) = banner_with_session(now);
        store.set(storage_keys::RECOVERY, "{}");

        banner.dismiss();
        assert!(store.is_empty());
        assert!(banner.check(now).is_none());
    }
}
