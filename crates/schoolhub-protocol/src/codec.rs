//! Codec trait and implementations for request and response bodies.
//!
//! The transport moves raw bytes; the codec is the only place where those
//! bytes become typed requests and responses. Swapping the body format
//! means implementing [`Codec`] again, nothing else.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ErrorBody, ProtocolError};

/// Encodes request bodies and decodes response bodies.
///
/// `Send + Sync + 'static` so a single codec can live inside the client
/// and be shared by every in-flight request.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a request body into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a response body.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do not
    /// match the schema of `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Extracts the human-readable `message` from an error body, if any.
    ///
    /// Never fails: error bodies are best-effort, and an unreadable one is
    /// simply a rejection without a message.
    fn error_message(&self, data: &[u8]) -> Option<String> {
        self.decode::<ErrorBody>(data)
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. The API speaks JSON exclusively.
///
/// ```rust
/// use schoolhub_protocol::{Codec, JsonCodec, TokenResponse};
///
/// let codec = JsonCodec;
/// let body: TokenResponse = codec.decode(br#"{"token":"abc"}"#).unwrap();
/// assert_eq!(body.token.as_str(), "abc");
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
