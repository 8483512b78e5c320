//! Configuration types.

use std::net::SocketAddr;

use chrono::Duration;

use crate::error::ConfigError;

/// Wizard configuration.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Storage key for the in-progress session blob.
    pub session_key: String,
    /// Sessions older than this are ignored and purged on read.
    pub recovery_window: Duration,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            session_key: crate::wizard::model::storage_keys::WIZARD_SESSION.to_string(),
            recovery_window: Duration::hours(24),
        }
    }
}

/// Exit-intent thresholds. These are product tuning knobs, not invariants.
#[derive(Debug, Clone)]
pub struct ExitIntentConfig {
    /// Minimum time on page before desktop exit intent can fire.
    pub min_dwell: Duration,
    /// Pointer must leave at or above this many pixels from the top.
    pub leave_threshold_px: i32,
    /// Delay between leaving the viewport and showing the offer.
    pub confirm_delay: Duration,
    /// Mobile: wait this long after enough scrolling.
    pub mobile_dwell: Duration,
    /// Mobile: number of scroll events before the dwell timer is armed.
    pub mobile_scroll_count: u32,
}

impl Default for ExitIntentConfig {
    fn default() -> Self {
        Self {
            min_dwell: Duration::seconds(20),
            leave_threshold_px: 30,
            confirm_delay: Duration::milliseconds(750),
            mobile_dwell: Duration::seconds(60),
            mobile_scroll_count: 2,
        }
    }
}

impl ExitIntentConfig {
    /// Build from `PLAYBOOK_EXIT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_dwell: env_parse::<i64>("PLAYBOOK_EXIT_MIN_DWELL_SECS")
                .map(Duration::seconds)
                .unwrap_or(defaults.min_dwell),
            leave_threshold_px: env_parse("PLAYBOOK_EXIT_LEAVE_THRESHOLD_PX")
                .unwrap_or(defaults.leave_threshold_px),
            confirm_delay: env_parse::<i64>("PLAYBOOK_EXIT_CONFIRM_DELAY_MS")
                .map(Duration::milliseconds)
                .unwrap_or(defaults.confirm_delay),
            mobile_dwell: env_parse::<i64>("PLAYBOOK_EXIT_MOBILE_DWELL_SECS")
                .map(Duration::seconds)
                .unwrap_or(defaults.mobile_dwell),
            mobile_scroll_count: env_parse("PLAYBOOK_EXIT_MOBILE_SCROLLS")
                .unwrap_or(defaults.mobile_scroll_count),
        }
    }
}

/// Intake server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Allowed CORS origin; `None` allows any origin.
    pub allowed_origin: Option<String>,
}

impl ServerConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = std::env::var("PLAYBOOK_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let host = std::env::var("PLAYBOOK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "PLAYBOOK_HOST".to_string(),
                    message: format!("{e}"),
                })?;

        let allowed_origin = std::env::var("PLAYBOOK_ALLOWED_ORIGIN")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            bind_addr,
            allowed_origin,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
