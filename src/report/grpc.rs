//! tonic transport for the load report service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::uri::PathAndQuery;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

use super::proto::{LoadRequest, LoadResponse, LOAD_METHOD_PATH};
use super::{DialError, Dialer, LoadReporter};

/// Dials plaintext HTTP/2 channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcDialer;

impl GrpcDialer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialer for GrpcDialer {
    async fn dial(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn LoadReporter>, DialError> {
        let reporter = GrpcLoadReporter::connect(address, timeout).await?;
        Ok(Arc::new(reporter))
    }
}

/// Client side of `grpclb.backend.v1.LoadReport`.
#[derive(Debug, Clone)]
pub struct GrpcLoadReporter {
    inner: Grpc<Channel>,
}

impl GrpcLoadReporter {
    /// Connect and wait until the channel is ready or `timeout` elapses.
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self, DialError> {
        let endpoint = Endpoint::from_shared(endpoint_uri(address))
            .map_err(|e| DialError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })?
            .connect_timeout(timeout);

        let channel = match tokio::time::timeout(timeout, endpoint.connect()).await {
            Ok(Ok(channel)) => channel,
            Ok(Err(source)) => {
                return Err(DialError::Transport {
                    address: address.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(DialError::Timeout {
                    address: address.to_string(),
                    timeout,
                })
            }
        };

        Ok(Self::from_channel(channel))
    }

    /// Wrap an already established channel.
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }
}

#[async_trait]
impl LoadReporter for GrpcLoadReporter {
    async fn load(&self) -> Result<i64, Status> {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::unknown(format!("service was not ready: {e}")))?;

        let codec: ProstCodec<LoadRequest, LoadResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static(LOAD_METHOD_PATH);
        let response = grpc.unary(Request::new(LoadRequest {}), path, codec).await?;

        Ok(response.into_inner().score)
    }
}

/// Backends are addressed as `host:port`; tonic wants a URI.
fn endpoint_uri(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}
