//! WizardMachine — drives the lead-capture flow and keeps the session store
//! in step with it.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::model::{AnswerValue, PersistedSession, WizardAnswers};
use super::questions::{QUESTIONS, Question, validate_email};
use super::session::{Clock, SessionRecovery, SessionStore};
use super::state::WizardPosition;
use crate::config::WizardConfig;
use crate::error::{FieldError, SubmissionError, WizardError};
use crate::funnel::ab::{AbTests, test_ids};
use crate::funnel::analytics::{Analytics, events, hash_email};
use crate::leads::model::{LeadSubmission, SubmitResponse};
use crate::leads::submit::Submitter;

pub const RESTART_PROMPT: &str =
    "Are you sure you want to start over? Your current progress will be lost.";
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit. Please try again.";
const DEFAULT_TITLE: &str = "Get Your Custom 90-Day Growth Plan";
const DEFAULT_EMAIL_CTA: &str = "Get My Growth Plan";
const CONTACT_EMAIL_FIELD: &str = "contactEmail";

/// Blocking yes/no prompt shown before destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Collaborators the wizard talks to.
#[derive(Clone)]
pub struct WizardDeps {
    pub store: Arc<dyn SessionStore>,
    pub submitter: Arc<dyn Submitter>,
    pub analytics: Arc<dyn Analytics>,
    pub confirm: Arc<dyn Confirm>,
    pub clock: Arc<dyn Clock>,
    /// Copy experiments for the modal title and submit button.
    pub ab_tests: Option<Arc<AbTests>>,
}

/// A submission that has been validated and handed out for sending.
///
/// Returned by [`WizardMachine::begin_submit`]; pass it back to
/// [`WizardMachine::finish_submit`] with the collaborator's outcome.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    submission: LeadSubmission,
}

impl PendingSubmission {
    pub fn submission(&self) -> &LeadSubmission {
        &self.submission
    }
}

type LeadCallback = Box<dyn Fn(&str) + Send + Sync>;

/// The lead-capture wizard.
///
/// Owns the answers and position exclusively. Every answer or navigation
/// while open overwrites the persisted session; restart and a successful
/// submission remove it.
pub struct WizardMachine {
    deps: WizardDeps,
    recovery: SessionRecovery,
    position: WizardPosition,
    answers: WizardAnswers,
    contact_email: Option<String>,
    open: bool,
    submitting: bool,
    field_errors: Vec<FieldError>,
    submit_error: Option<String>,
    lead_id: Option<String>,
    title: String,
    email_cta: String,
    on_lead_created: Option<LeadCallback>,
}

impl WizardMachine {
    pub fn new(config: WizardConfig, deps: WizardDeps) -> Self {
        let recovery = SessionRecovery::new(Arc::clone(&deps.store), &config);
        Self {
            deps,
            recovery,
            position: WizardPosition::initial(),
            answers: WizardAnswers::new(),
            contact_email: None,
            open: false,
            submitting: false,
            field_errors: Vec::new(),
            submit_error: None,
            lead_id: None,
            title: DEFAULT_TITLE.to_string(),
            email_cta: DEFAULT_EMAIL_CTA.to_string(),
            on_lead_created: None,
        }
    }

    /// Register the upward "lead created" signal. Receives the lead id.
    pub fn on_lead_created(&mut self, callback: impl Fn(&str) + Send + Sync + 'static) {
        self.on_lead_created = Some(Box::new(callback));
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn position(&self) -> WizardPosition {
        self.position
    }

    pub fn answers(&self) -> &WizardAnswers {
        &self.answers
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn lead_id(&self) -> Option<&str> {
        self.lead_id.as_deref()
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn email_cta(&self) -> &str {
        &self.email_cta
    }

    pub fn question_count(&self) -> usize {
        QUESTIONS.len()
    }

    pub fn current_question(&self) -> Option<&'static Question> {
        self.position.question_index().and_then(|i| QUESTIONS.get(i))
    }

    pub fn progress_percent(&self) -> u8 {
        self.position.progress_percent(QUESTIONS.len())
    }

    pub fn can_go_back(&self) -> bool {
        !self.submitting && self.position.back(QUESTIONS.len()).is_some()
    }

    pub fn has_progress(&self) -> bool {
        self.position.has_progress()
    }

    /// Collaborator to send a [`PendingSubmission`] through, for hosts that
    /// drive the request themselves.
    pub fn submitter(&self) -> Arc<dyn Submitter> {
        Arc::clone(&self.deps.submitter)
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Show the wizard, resuming the persisted session when there is one.
    pub fn open(&mut self) {
        let total = QUESTIONS.len();
        match self.recovery.load(self.deps.clock.now()) {
            Some(session)
                if session.position.is_valid_for(total) && !session.position.is_terminal() =>
            {
                debug!(
                    position = %session.position,
                    answered = session.answers.len(),
                    "Resuming wizard session"
                );
                self.answers = session.answers;
                self.position = session.position;
                self.contact_email = None;
                self.field_errors.clear();
                self.submit_error = None;
                self.lead_id = None;
            }
            Some(session) => {
                warn!(position = %session.position, "Discarding wizard session with invalid position");
                self.recovery.clear();
                self.reset_progress();
            }
            None if !self.position.is_terminal() => self.reset_progress(),
            None => {}
        }

        if let Some(ref ab) = self.deps.ab_tests {
            self.title = ab
                .test_text(test_ids::MODAL_TITLE)
                .unwrap_or_else(|| DEFAULT_TITLE.to_string());
            self.email_cta = ab
                .test_text(test_ids::EMAIL_CTA)
                .unwrap_or_else(|| DEFAULT_EMAIL_CTA.to_string());
        }

        self.open = true;
        self.deps.analytics.record(events::WIZARD_OPEN, Value::Null);
    }

    /// Answer the current question and advance.
    pub fn answer(&mut self, key: &str, value: AnswerValue) -> Result<WizardPosition, WizardError> {
        if !self.open {
            return Err(WizardError::NotOpen);
        }
        let Some(index) = self.position.question_index() else {
            return Err(self.invalid("answer"));
        };
        let question = &QUESTIONS[index];
        if question.key != key {
            return Err(WizardError::WrongQuestion {
                expected: question.key.to_string(),
                got: key.to_string(),
            });
        }
        if let Err(errors) = question.validate(&value) {
            self.field_errors = errors.clone();
            return Err(WizardError::InvalidAnswer(errors));
        }

        self.answers.insert(key, value);
        self.field_errors.clear();
        let next = self
            .position
            .advance(QUESTIONS.len())
            .ok_or_else(|| self.invalid("answer"))?;
        self.position = next;

        self.deps
            .analytics
            .record(events::WIZARD_STEP_COMPLETED, json!({ "step": index }));
        self.persist();
        Ok(next)
    }

    /// Validate the email and mark the wizard busy.
    ///
    /// While busy, further submits are rejected and back/restart are
    /// disabled.
    pub fn begin_submit(&mut self, email: &str) -> Result<PendingSubmission, WizardError> {
        if !self.open {
            return Err(WizardError::NotOpen);
        }
        if self.position != WizardPosition::CapturingContact {
            return Err(self.invalid("submit contact"));
        }
        if self.submitting {
            return Err(WizardError::SubmissionInFlight);
        }
        let email = email.trim();
        if let Err(message) = validate_email(email) {
            self.field_errors = vec![FieldError::new(CONTACT_EMAIL_FIELD, message.clone())];
            return Err(WizardError::InvalidEmail(message));
        }

        self.field_errors.clear();
        self.submit_error = None;
        self.submitting = true;
        Ok(PendingSubmission {
            submission: LeadSubmission::from_answers(&self.answers, email, self.deps.clock.now()),
        })
    }

    /// Apply the collaborator's outcome for a pending submission.
    ///
    /// Runs whether or not the wizard is still open; closing does not cancel
    /// an in-flight request.
    pub fn finish_submit(
        &mut self,
        pending: PendingSubmission,
        outcome: Result<SubmitResponse, SubmissionError>,
    ) -> Result<String, WizardError> {
        self.submitting = false;

        let response = match outcome {
            Ok(response) if response.success => response,
            Ok(response) => {
                warn!(
                    error = response.error.as_deref().unwrap_or("unknown"),
                    "Lead submission rejected"
                );
                return Err(self.fail_submit());
            }
            Err(e) => {
                warn!(error = %e, "Lead submission failed");
                return Err(self.fail_submit());
            }
        };

        let lead_id = response.id.unwrap_or_default();
        let submission = pending.submission;

        self.contact_email = Some(submission.contact_email.clone());
        self.lead_id = Some(lead_id.clone());
        self.submit_error = None;
        self.position = WizardPosition::ShowingResult;
        self.recovery.clear();
        info!(lead_id = %lead_id, "Lead created");

        let mut properties = serde_json::Map::new();
        properties.insert(
            "email_hash".to_string(),
            Value::String(hash_email(&submission.contact_email)),
        );
        for (key, value) in &submission.answers {
            properties.insert(key.clone(), Value::String(value.clone()));
        }
        self.deps
            .analytics
            .record(events::LEAD_CREATED, Value::Object(properties));

        if let Some(ref ab) = self.deps.ab_tests {
            ab.track_conversion(test_ids::EMAIL_CTA, "email_captured");
        }
        if let Some(ref callback) = self.on_lead_created {
            callback(&lead_id);
        }

        Ok(lead_id)
    }

    /// Validate, send, and apply the outcome in one step.
    ///
    /// Failures are only retried by calling this again.
    pub async fn submit_contact(&mut self, email: &str) -> Result<String, WizardError> {
        let pending = self.begin_submit(email)?;
        let submitter = self.submitter();
        let outcome = submitter.submit(pending.submission()).await;
        self.finish_submit(pending, outcome)
    }

    /// Step back one screen. Returns whether the position changed.
    pub fn back(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        let Some(previous) = self.position.back(QUESTIONS.len()) else {
            return false;
        };
        self.position = previous;
        self.field_errors.clear();
        self.submit_error = None;
        self.persist();
        true
    }

    /// Start over. Asks for confirmation first when there is progress to lose.
    ///
    /// Returns `false` (and changes nothing) when declined or while a
    /// submission is in flight.
    pub fn restart(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        if self.position.has_progress() && !self.deps.confirm.confirm(RESTART_PROMPT) {
            debug!(position = %self.position, "Restart declined");
            return false;
        }

        self.reset_progress();
        self.recovery.clear();
        self.deps.analytics.record(events::WIZARD_RESTART, Value::Null);
        true
    }

    /// Hide the wizard. The persisted session stays so it can be resumed.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        let step = self.position.close_step(QUESTIONS.len());
        self.deps
            .analytics
            .record(events::WIZARD_CLOSE, json!({ "step": step }));
        self.open = false;
    }

    // ── Internals ───────────────────────────────────────────────────

    fn reset_progress(&mut self) {
        self.answers.clear();
        self.position = WizardPosition::initial();
        self.contact_email = None;
        self.field_errors.clear();
        self.submit_error = None;
        self.lead_id = None;
    }

    fn fail_submit(&mut self) -> WizardError {
        self.submit_error = Some(SUBMIT_FAILED_MESSAGE.to_string());
        WizardError::SubmitFailed(SUBMIT_FAILED_MESSAGE.to_string())
    }

    fn invalid(&self, action: &str) -> WizardError {
        WizardError::InvalidTransition {
            action: action.to_string(),
            position: self.position.to_string(),
        }
    }

    /// Overwrite the stored session with the current state.
    fn persist(&self) {
        if !self.open || self.position.is_terminal() || self.answers.is_empty() {
            return;
        }
        let session =
            PersistedSession::new(self.answers.clone(), self.position, self.deps.clock.now());
        self.recovery.save(&session);
    }
}
