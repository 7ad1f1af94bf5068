//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Unit evicted (fatal refresh)
//!     → backoff.rs (jittered, exponentially growing delay)
//!     → fresh BackendUnit dialed
//! ```
//!
//! # Design Decisions
//! - Backend units never retry on their own; only the driver backs off
//! - Jitter spreads reconnects of many drivers over time

pub mod backoff;

pub use backoff::{calculate_backoff, Backoff};
