//! Lead-capture wizard, funnel instrumentation and lead intake for the growth playbook funnel.

pub mod config;
pub mod error;
pub mod funnel;
pub mod leads;
pub mod wizard;
