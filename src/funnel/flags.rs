//! Feature flags for funnel experiments.

use std::collections::BTreeMap;

use tracing::debug;

use crate::wizard::model::storage_keys;
use crate::wizard::session::SessionStore;

/// Synchronous flag lookup, read at render time.
pub trait FeatureFlags: Send + Sync {
    fn is_enabled(&self, flag: &str) -> bool;
}

pub mod flag_names {
    pub const SINGLE_PATH_HERO: &str = "single_path_hero";
    pub const PROOF_STRIP_HERO: &str = "proof_strip_hero";
    pub const MODAL_WIZARD_EMAIL_FIRST: &str = "modal_wizard_email_first";
    pub const PRICE_GATE_POST_PREVIEW: &str = "price_gate_post_preview";
    pub const RISK_REVERSAL_BADGE: &str = "risk_reversal_badge";
    pub const STICKY_CTA: &str = "sticky_cta";
    pub const EXIT_INTENT_OFFER: &str = "exit_intent_offer";

    pub const ALL: [&str; 7] = [
        SINGLE_PATH_HERO,
        PROOF_STRIP_HERO,
        MODAL_WIZARD_EMAIL_FIRST,
        PRICE_GATE_POST_PREVIEW,
        RISK_REVERSAL_BADGE,
        STICKY_CTA,
        EXIT_INTENT_OFFER,
    ];
}

/// A concrete set of flag values. Every known flag defaults to on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet {
    flags: BTreeMap<String, bool>,
}

impl Default for FlagSet {
    fn default() -> Self {
        Self {
            flags: flag_names::ALL
                .iter()
                .map(|name| (name.to_string(), true))
                .collect(),
        }
    }
}

impl FlagSet {
    /// Defaults overridden by `FLAG_<NAME>` environment variables.
    ///
    /// A variable that is set but not `"true"` turns the flag off.
    pub fn from_env() -> Self {
        let mut set = Self::default();
        for name in flag_names::ALL {
            let var = format!("FLAG_{}", name.to_uppercase());
            if let Ok(value) = std::env::var(&var) {
                set.set(name, value == "true");
            }
        }
        set
    }

    /// Merge a JSON object of overrides. Invalid JSON leaves the set unchanged.
    pub fn with_overrides_json(mut self, json: &str) -> Self {
        match serde_json::from_str::<BTreeMap<String, bool>>(json) {
            Ok(overrides) => self.flags.extend(overrides),
            Err(e) => debug!(error = %e, "Ignoring invalid flag overrides"),
        }
        self
    }

    /// Apply overrides saved in the session store, if any.
    pub fn with_session_overrides(self, store: &dyn SessionStore) -> Self {
        match store.get(storage_keys::FLAG_OVERRIDES) {
            Some(json) => self.with_overrides_json(&json),
            None => self,
        }
    }

    pub fn set(&mut self, flag: &str, enabled: bool) {
        self.flags.insert(flag.to_string(), enabled);
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.flags).unwrap_or_else(|_| "{}".to_string())
    }
}

impl FeatureFlags for FlagSet {
    fn is_enabled(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_on() {
        let flags = FlagSet::default();
        for name in flag_names::ALL {
            assert!(flags.is_enabled(name), "{name} should default on");
        }
        assert!(!flags.is_enabled("unknown_flag"));
    }

    #[test]
    fn overrides_merge() {
        let flags = FlagSet::default().with_overrides_json(r#"{"sticky_cta": false}"#);
        assert!(!flags.is_enabled(flag_names::STICKY_CTA));
        assert!(flags.is_enabled(flag_names::EXIT_INTENT_OFFER));
    }

    #[test]
    fn invalid_overrides_ignored() {
        let flags = FlagSet::default().with_overrides_json("{nope");
        assert_eq!(flags, FlagSet::default());
    }

    #[test]
    fn session_overrides_apply() {
        let store = crate::wizard::session::MemorySessionStore::new();
        store.set(storage_keys::FLAG_OVERRIDES, r#"{"exit_intent_offer": false}"#);
        let flags = FlagSet::default().with_session_overrides(&*store);
        assert!(!flags.is_enabled(flag_names::EXIT_INTENT_OFFER));
        assert!(flags.is_enabled(flag_names::STICKY_CTA));
    }

    #[test]
    fn json_roundtrip_through_overrides() {
        let mut flags = FlagSet::default();
        flags.set(flag_names::EXIT_INTENT_OFFER, false);
        let restored = FlagSet::default().with_overrides_json(&flags.to_json());
        assert_eq!(restored, flags);
    }
}
