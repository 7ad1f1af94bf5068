//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ScoreConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ScoreConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend.dial_timeout_ms must be greater than zero")]
    ZeroDialTimeout,

    #[error("backend.report_timeout_ms must be greater than zero when set")]
    ZeroReportTimeout,

    #[error("probe.address must not be empty")]
    EmptyAddress,

    #[error("probe.interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("probe.backoff_base_ms ({base}) exceeds probe.backoff_max_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check value ranges across the whole config.
pub fn validate_config(config: &ScoreConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backend.dial_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDialTimeout);
    }
    if config.backend.report_timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroReportTimeout);
    }

    if config.probe.address.trim().is_empty() {
        errors.push(ValidationError::EmptyAddress);
    }
    if config.probe.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if config.probe.backoff_base_ms > config.probe.backoff_max_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.probe.backoff_base_ms,
            max: config.probe.backoff_max_ms,
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
