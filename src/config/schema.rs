//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ScoreConfig {
    /// Settings shared by every backend unit.
    pub backend: BackendUnitConfig,

    /// The backend probed by the `lb-score` binary.
    pub probe: ProbeConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Per-unit settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendUnitConfig {
    /// Consecutive recoverable failures before eviction (0 = never).
    pub max_failures: u32,

    /// Bound on the initial dial.
    pub dial_timeout_ms: u64,

    /// Optional bound on each load report call.
    pub report_timeout_ms: Option<u64>,
}

impl Default for BackendUnitConfig {
    fn default() -> Self {
        Self {
            max_failures: 0,
            dial_timeout_ms: 2_000,
            report_timeout_ms: None,
        }
    }
}

impl BackendUnitConfig {
    /// Config with the given failure threshold and default timeouts.
    pub fn with_max_failures(max_failures: u32) -> Self {
        Self {
            max_failures,
            ..Self::default()
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn report_timeout(&self) -> Option<Duration> {
        self.report_timeout_ms.map(Duration::from_millis)
    }
}

/// Refresh driver settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Logical service name, used in diagnostics.
    pub target: String,

    /// Backend address (e.g., "127.0.0.1:9000").
    pub address: String,

    /// Seconds between refreshes.
    pub interval_secs: u64,

    /// Base delay before replacing an evicted unit.
    pub backoff_base_ms: u64,

    /// Upper bound for the replacement delay.
    pub backoff_max_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target: "default".to_string(),
            address: "127.0.0.1:9000".to_string(),
            interval_secs: 5,
            backoff_base_ms: 200,
            backoff_max_ms: 10_000,
        }
    }
}

impl ProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9100".to_string(),
        }
    }
}
