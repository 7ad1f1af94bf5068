//! Backend unit errors.

use thiserror::Error;
use tonic::Status;

use super::classify::ErrorKind;

/// Fatal outcomes surfaced by [`BackendUnit`](super::BackendUnit).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection to {address} is closing")]
    ConnectionClosing { address: String },

    #[error("load report from {address} failed: {status}")]
    Report {
        address: String,
        #[source]
        status: Status,
    },
}

impl BackendError {
    /// Classifier input for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::ConnectionClosing { .. } => ErrorKind::Closing,
            BackendError::Report { status, .. } => ErrorKind::Status(status.code()),
        }
    }

    /// Free-form detail reported by the transport.
    pub fn detail(&self) -> &str {
        match self {
            BackendError::ConnectionClosing { .. } => "connection is closing",
            BackendError::Report { status, .. } => status.message(),
        }
    }

    /// Address of the backend that produced the error.
    pub fn address(&self) -> &str {
        match self {
            BackendError::ConnectionClosing { address } | BackendError::Report { address, .. } => {
                address
            }
        }
    }
}
