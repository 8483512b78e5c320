//! Lead hand-off, on both sides of the wire.
//!
//! The wizard side posts a finished lead through a [`Submitter`]; the intake
//! side saves it and fires the alert through [`LeadIntake`].

pub mod intake;
pub mod model;
pub mod routes;
pub mod submit;

pub use intake::{LeadIntake, LeadNotifier, LeadRepository, LogNotifier, MemoryLeadRepository};
pub use model::{ClientInfo, LeadSubmission, SubmissionRecord, SubmitResponse};
pub use routes::{IntakeRouteState, intake_routes};
pub use submit::{HttpSubmitter, Submitter};
