//! Exit-intent detection.
//!
//! The host forwards pointer, scroll and navigation events and polls the
//! detector from its timer loop. The detector fires at most once per page
//! load, and only for visitors with an unfinished wizard session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

use super::model::storage_keys;
use super::questions::validate_email;
use super::recovery::SavedContact;
use super::session::SessionRecovery;
use crate::config::ExitIntentConfig;
use crate::error::WizardError;
use crate::funnel::analytics::{Analytics, events};
use crate::funnel::flags::{FeatureFlags, flag_names};

/// Page state the detector needs at trigger time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageContext {
    pub lead_created: bool,
    pub wizard_open: bool,
}

/// The visitor's choice in the exit-intent offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitIntentResponse {
    Continue,
    SaveForLater(String),
}

/// What the host should do after a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitIntentAction {
    /// Open the wizard; it resumes from the persisted session.
    ResumeWizard,
    /// Email saved; close the offer.
    ProgressSaved,
}

pub struct ExitIntentDetector {
    config: ExitIntentConfig,
    recovery: SessionRecovery,
    flags: Arc<dyn FeatureFlags>,
    analytics: Arc<dyn Analytics>,
    loaded_at: DateTime<Utc>,
    mobile: bool,
    shown: bool,
    pending_at: Option<DateTime<Utc>>,
    scrolls: u32,
}

impl ExitIntentDetector {
    pub fn new(
        config: ExitIntentConfig,
        recovery: SessionRecovery,
        flags: Arc<dyn FeatureFlags>,
        analytics: Arc<dyn Analytics>,
        loaded_at: DateTime<Utc>,
        mobile: bool,
    ) -> Self {
        Self {
            config,
            recovery,
            flags,
            analytics,
            loaded_at,
            mobile,
            shown: false,
            pending_at: None,
            scrolls: 0,
        }
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn pending_at(&self) -> Option<DateTime<Utc>> {
        self.pending_at
    }

    /// Pointer left the viewport at vertical offset `y`.
    pub fn on_pointer_leave(&mut self, y: i32, at: DateTime<Utc>) {
        if self.mobile || self.shown || self.pending_at.is_some() {
            return;
        }
        if y <= self.config.leave_threshold_px {
            self.pending_at = Some(at + self.config.confirm_delay);
        }
    }

    /// Pointer came back before the confirm delay elapsed.
    pub fn on_pointer_enter(&mut self) {
        if !self.mobile {
            self.pending_at = None;
        }
    }

    pub fn on_scroll(&mut self, at: DateTime<Utc>) {
        if !self.mobile || self.shown || self.pending_at.is_some() {
            return;
        }
        self.scrolls = self.scrolls.saturating_add(1);
        if self.scrolls >= self.config.mobile_scroll_count {
            self.pending_at = Some(at + self.config.mobile_dwell);
        }
    }

    /// Mobile back navigation triggers immediately.
    pub fn on_back_navigation(&mut self, ctx: PageContext, at: DateTime<Utc>) -> bool {
        if !self.mobile {
            return false;
        }
        self.pending_at = None;
        self.try_trigger(ctx, at)
    }

    /// Fire a pending trigger whose time has come. Returns whether the offer
    /// should be shown now.
    pub fn poll(&mut self, ctx: PageContext, now: DateTime<Utc>) -> bool {
        match self.pending_at {
            Some(at) if at <= now => {
                self.pending_at = None;
                self.try_trigger(ctx, now)
            }
            _ => false,
        }
    }

    /// Handle the visitor's choice in the offer.
    pub fn respond(
        &self,
        response: ExitIntentResponse,
        now: DateTime<Utc>,
    ) -> Result<ExitIntentAction, WizardError> {
        match response {
            ExitIntentResponse::Continue => {
                self.analytics
                    .record(events::EXIT_INTENT_CLICK, json!({ "action": "continue" }));
                Ok(ExitIntentAction::ResumeWizard)
            }
            ExitIntentResponse::SaveForLater(email) => {
                let email = email.trim();
                validate_email(email).map_err(WizardError::InvalidEmail)?;
                self.analytics
                    .record(events::EXIT_INTENT_CLICK, json!({ "action": "email_capture" }));

                let contact = SavedContact {
                    email: email.to_string(),
                    saved_at: now,
                };
                match serde_json::to_string(&contact) {
                    Ok(json) => self.recovery.store().set(storage_keys::RECOVERY, &json),
                    Err(e) => debug!(error = %e, "Failed to save recovery contact"),
                }
                Ok(ExitIntentAction::ProgressSaved)
            }
        }
    }

    fn try_trigger(&mut self, ctx: PageContext, now: DateTime<Utc>) -> bool {
        if self.shown || ctx.lead_created || ctx.wizard_open {
            return false;
        }
        if !self.flags.is_enabled(flag_names::EXIT_INTENT_OFFER) {
            return false;
        }
        if !self.mobile && now - self.loaded_at < self.config.min_dwell {
            debug!("Exit intent suppressed: minimum dwell not reached");
            return false;
        }
        if !self.recovery.has_incomplete(now) {
            return false;
        }

        self.shown = true;
        self.analytics.record(events::EXIT_INTENT_SHOWN, json!({}));
        debug!(mobile = self.mobile, "Exit intent shown");
        true
    }
}
