//! Load report transport.
//!
//! # Data Flow
//! ```text
//! BackendUnit::connect
//!     → Dialer::dial (bounded timeout, blocks until ready)
//!     → LoadReporter (one per backend)
//!
//! BackendUnit::refresh
//!     → LoadReporter::load
//!     → score or tonic::Status
//! ```
//!
//! # Design Decisions
//! - The unit only sees these traits; grpc.rs is the production transport
//! - Errors are plain `tonic::Status` so the classifier works on gRPC codes
//! - Reporters are shared behind `Arc` and must tolerate `&self` calls

pub mod grpc;
pub mod proto;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tonic::Status;

pub use grpc::{GrpcDialer, GrpcLoadReporter};

/// A live handle able to fetch the current load score from one backend.
#[async_trait]
pub trait LoadReporter: Send + Sync {
    /// Issue one load report call.
    async fn load(&self) -> Result<i64, Status>;
}

/// Opens reporters for backend addresses.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connect to `address`, giving up after `timeout`.
    async fn dial(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn LoadReporter>, DialError>;
}

/// Reasons a backend could not be dialed.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("dial to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("dial to {address} failed: {source}")]
    Transport {
        address: String,
        #[source]
        source: tonic::transport::Error,
    },
}
