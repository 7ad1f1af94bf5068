//! Per-backend load score tracking for client-side gRPC load balancing.

pub mod backend;
pub mod config;
pub mod driver;
pub mod lifecycle;
pub mod observability;
pub mod report;
pub mod resilience;

pub use backend::{BackendError, BackendUnit, Decision, ServerSnapshot};
pub use config::{BackendUnitConfig, ScoreConfig};
pub use driver::{RefreshDriver, UnitWatch};
pub use lifecycle::Shutdown;
