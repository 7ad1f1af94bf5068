//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ScoreConfig (validated, immutable)
//!     → BackendUnitConfig handed to every BackendUnit
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BackendUnitConfig, ObservabilityConfig, ProbeConfig, ScoreConfig};
pub use validation::ValidationError;
