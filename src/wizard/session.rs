//! Tab-scoped session storage and the recovery protocol on top of it.
//!
//! The wizard, the recovery banner and the exit-intent detector all share one
//! store, handed to each as an `Arc<dyn SessionStore>`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::model::PersistedSession;
use crate::config::WizardConfig;

/// Key-value string storage scoped to a browser tab.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store. Backs tests and non-browser hosts.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reads, writes and expires the persisted wizard session.
#[derive(Clone)]
pub struct SessionRecovery {
    store: Arc<dyn SessionStore>,
    key: String,
    window: Duration,
}

impl SessionRecovery {
    pub fn new(store: Arc<dyn SessionStore>, config: &WizardConfig) -> Self {
        Self {
            store,
            key: config.session_key.clone(),
            window: config.recovery_window,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Load the session if present and younger than the recovery window.
    ///
    /// Expired or unreadable blobs are removed and reported as absent.
    pub fn load(&self, now: DateTime<Utc>) -> Option<PersistedSession> {
        let raw = self.store.get(&self.key)?;
        let session = match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(session) => session,
            Err(e) => {
                debug!(key = %self.key, error = %e, "Discarding unreadable wizard session");
                self.store.remove(&self.key);
                return None;
            }
        };

        if session.is_expired(now, self.window) {
            debug!(
                key = %self.key,
                saved_at = %session.saved_at,
                "Discarding expired wizard session"
            );
            self.store.remove(&self.key);
            return None;
        }

        Some(session)
    }

    /// Overwrite the stored session.
    pub fn save(&self, session: &PersistedSession) {
        match serde_json::to_string(session) {
            Ok(json) => self.store.set(&self.key, &json),
            Err(e) => warn!(error = %e, "Failed to serialize wizard session"),
        }
    }

    pub fn clear(&self) {
        self.store.remove(&self.key);
    }

    /// Whether there is an unexpired in-progress session to resume.
    pub fn has_incomplete(&self, now: DateTime<Utc>) -> bool {
        self.load(now)
            .is_some_and(|session| !session.position.is_terminal())
    }
}
