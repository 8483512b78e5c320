//! Error types for the playbook funnel.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by wizard transitions.
///
/// None of these are fatal: the wizard stays usable after every one of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Cannot {action} while {position}")]
    InvalidTransition { action: String, position: String },

    #[error("Answer for {got} does not match the current question {expected}")]
    WrongQuestion { expected: String, got: String },

    #[error("Invalid answer: {}", format_fields(.0))]
    InvalidAnswer(Vec<FieldError>),

    #[error("{0}")]
    InvalidEmail(String),

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("{0}")]
    SubmitFailed(String),

    #[error("Wizard is not open")]
    NotOpen,
}

/// A field-level validation message, shown inline next to its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from the submission collaborator, as seen by the wizard.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Submission request failed: {0}")]
    Transport(String),

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Invalid response from submission endpoint: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SubmissionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Errors on the intake side (repository and notifier).
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("Failed to save submission: {0}")]
    Save(String),

    #[error("Submission {id} not found")]
    NotFound { id: String },

    #[error("Failed to record analytics event: {0}")]
    Event(String),

    #[error("Lead alert failed: {0}")]
    Notify(String),
}
