//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! BackendUnit / RefreshDriver produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
