//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Ctrl-C → Shutdown::trigger → RefreshDriver loop exits → unit closed
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
