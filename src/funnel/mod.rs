//! Funnel instrumentation: analytics, feature flags and copy experiments.

pub mod ab;
pub mod analytics;
pub mod flags;

pub use ab::{AbTest, AbTests, Variant};
pub use analytics::{Analytics, SessionEventLog, TracingAnalytics, hash_email};
pub use flags::{FeatureFlags, FlagSet};
