//! Analytics sink — fire-and-forget event recording.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::wizard::model::storage_keys;
use crate::wizard::session::SessionStore;

/// How many events the session debug log retains.
const MAX_LOGGED_EVENTS: usize = 50;

/// Event names emitted by the funnel.
pub mod events {
    pub const WIZARD_OPEN: &str = "wizard_open";
    pub const WIZARD_CLOSE: &str = "wizard_close";
    pub const WIZARD_RESTART: &str = "wizard_restart";
    pub const WIZARD_STEP_COMPLETED: &str = "wizard_step_completed";
    pub const LEAD_CREATED: &str = "lead_created";
    pub const EXIT_INTENT_SHOWN: &str = "exit_intent_shown";
    pub const EXIT_INTENT_CLICK: &str = "exit_intent_click";
    pub const AB_TEST_ASSIGNED: &str = "ab_test_assigned";
    pub const AB_TEST_CONVERSION: &str = "ab_test_conversion";
}

/// Fire-and-forget analytics. Implementations must not fail the caller.
pub trait Analytics: Send + Sync {
    fn record(&self, event: &str, properties: Value);
}

/// Writes every event to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl Analytics for TracingAnalytics {
    fn record(&self, event: &str, properties: Value) {
        info!(event, properties = %properties, "Analytics event");
    }
}

/// A recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event: String,
    #[serde(default)]
    pub properties: Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Keeps the most recent events in the session store for debugging, and
/// optionally forwards them to another sink.
pub struct SessionEventLog {
    store: Arc<dyn SessionStore>,
    forward: Option<Arc<dyn Analytics>>,
}

impl SessionEventLog {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            forward: None,
        }
    }

    pub fn forward_to(mut self, sink: Arc<dyn Analytics>) -> Self {
        self.forward = Some(sink);
        self
    }

    /// Logged events, oldest first. A malformed log reads as empty.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.store
            .get(storage_keys::ANALYTICS_EVENTS)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

impl Analytics for SessionEventLog {
    fn record(&self, event: &str, properties: Value) {
        let mut logged = self.events();
        logged.push(AnalyticsEvent {
            event: event.to_string(),
            properties: properties.clone(),
            timestamp: Utc::now().timestamp_millis(),
        });
        if logged.len() > MAX_LOGGED_EVENTS {
            let excess = logged.len() - MAX_LOGGED_EVENTS;
            logged.drain(..excess);
        }
        match serde_json::to_string(&logged) {
            Ok(json) => self.store.set(storage_keys::ANALYTICS_EVENTS, &json),
            Err(e) => debug!(error = %e, "Failed to write analytics log"),
        }

        if let Some(ref sink) = self.forward {
            sink.record(event, properties);
        }
    }
}

/// Short, non-reversible tag for an email address.
///
/// 32-bit rolling hash over UTF-16 code units (`h = h * 31 + c`), rendered
/// as the absolute value in base 36.
pub fn hash_email(email: &str) -> String {
    let hash = email.encode_utf16().fold(0i32, |h, c| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(c))
    });
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::session::MemorySessionStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<String>>);

    impl Analytics for Capture {
        fn record(&self, event: &str, _properties: Value) {
            self.0.lock().unwrap().push(event.to_string());
        }
    }

    #[test]
    fn hash_email_matches_rolling_hash() {
        assert_eq!(hash_email(""), "0");
        assert_eq!(hash_email("abc"), "22ci");
        assert_eq!(hash_email("a@b.com"), hash_email("a@b.com"));
        assert_ne!(hash_email("a@b.com"), hash_email("b@b.com"));
    }

    #[test]
    fn event_log_keeps_last_fifty() {
        let store = MemorySessionStore::new();
        let log = SessionEventLog::new(store.clone());
        for i in 0..60 {
            log.record("wizard_step_completed", serde_json::json!({ "step": i }));
        }

        let events = log.events();
        assert_eq!(events.len(), 50);
        assert_eq!(events[0].properties["step"], 10);
        assert_eq!(events[49].properties["step"], 59);
    }

    #[test]
    fn event_log_recovers_from_malformed_json() {
        let store = MemorySessionStore::new();
        store.set("analyticsEvents", "garbage");
        let log = SessionEventLog::new(store.clone());

        log.record(events::WIZARD_OPEN, Value::Null);
        assert_eq!(log.events().len(), 1);
    }

    #[test]
    fn event_log_forwards() {
        let capture = Arc::new(Capture::default());
        let log = SessionEventLog::new(MemorySessionStore::new()).forward_to(capture.clone());

        log.record(events::WIZARD_OPEN, Value::Null);
        assert_eq!(*capture.0.lock().unwrap(), vec!["wizard_open".to_string()]);
    }
}
