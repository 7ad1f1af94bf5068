//! Wire messages of the `grpclb.backend.v1.LoadReport` service.

/// Fully-qualified path of the unary `Load` method.
pub const LOAD_METHOD_PATH: &str = "/grpclb.backend.v1.LoadReport/Load";

/// Empty request body.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct LoadRequest {}

/// Current load score of the backend.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct LoadResponse {
    #[prost(int64, tag = "1")]
    pub score: i64,
}
