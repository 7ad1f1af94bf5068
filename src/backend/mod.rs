//! Backend score tracking.
//!
//! # Data Flow
//! ```text
//! Pool discovers address
//!     → BackendUnit::connect (dial, first refresh)
//!     → periodic BackendUnit::refresh
//!         → LoadReporter::load
//!         → success: store score, reset failures
//!         → error: classify.rs → Ok (keep) or Err (evict)
//!     → BackendUnit::score / snapshot at routing time
//!     → BackendUnit::close on eviction
//! ```
//!
//! # Design Decisions
//! - Unreachable backends are tracked in degraded mode instead of rejected
//! - Classification is a pure function, testable without a connection
//! - The unit never retries; retry cadence belongs to the caller

pub mod classify;
pub mod error;
pub mod unit;

pub use classify::{classify, Decision, ErrorKind};
pub use error::BackendError;
pub use unit::{BackendUnit, ServerSnapshot, UnitState};
