//! Error types for the protocol layer.
//!
//! Every response body crosses this layer before the rest of the client
//! sees it, so a `ProtocolError` always means "the bytes were not what the
//! endpoint promised", never "the network failed".

/// Errors that can occur while encoding requests or validating responses.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a request body failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The response body is not valid JSON, or does not match the
    /// schema of the endpoint (missing fields, wrong types, an
    /// `administration` that is neither a name nor an id, ...).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body decoded, but a field failed validation.
    ///
    /// Used for values serde accepts but the client cannot use, such as a
    /// login link that is not an absolute http(s) URL.
    #[error("malformed response: {0}")]
    Malformed(String),
}
