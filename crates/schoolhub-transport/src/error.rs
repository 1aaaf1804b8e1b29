use std::time::Duration;

/// Errors that can occur in the transport layer.
///
/// A transport error means no usable HTTP response arrived. A response
/// with a 4xx/5xx status is NOT a transport error; it comes back as an
/// [`ApiResponse`](crate::ApiResponse) and is classified by the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached (DNS, refused, reset, TLS).
    #[error("network unreachable: {0}")]
    Unreachable(String),

    /// No response within the per-request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be built (bad base URL, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response started but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}
