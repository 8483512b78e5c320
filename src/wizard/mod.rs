//! Lead-capture wizard: a fixed question sequence, contact capture, and the
//! session-recovery protocol around it.
//!
//! The wizard, the recovery banner and the exit-intent detector share one
//! [`SessionStore`]. Only the wizard writes the session blob; the other two
//! read it and may purge it.

pub mod exit_intent;
pub mod machine;
pub mod model;
pub mod questions;
pub mod recovery;
pub mod session;
pub mod state;

pub use exit_intent::{ExitIntentAction, ExitIntentDetector, ExitIntentResponse, PageContext};
pub use machine::{Confirm, PendingSubmission, WizardDeps, WizardMachine};
pub use model::{AnswerValue, PersistedSession, WizardAnswers};
pub use questions::{QUESTIONS, Question};
pub use recovery::{RecoveryBanner, RecoveryNotice, SavedContact};
pub use session::{Clock, MemorySessionStore, SessionRecovery, SessionStore, SystemClock};
pub use state::WizardPosition;
