//! Transport abstraction layer for the SchoolHub client.
//!
//! Provides the [`Transport`] trait: send one [`ApiRequest`], get one
//! [`ApiResponse`] back. Everything above this crate talks to the API only
//! through that trait, so flows can be tested against a scripted transport
//! and run against a real one unchanged.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpTransport`] via `reqwest`
//! - `mock`: [`mock::ScriptedTransport`] for tests of higher layers

mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::future::Future;
use std::time::Duration;

use schoolhub_protocol::{Endpoint, Method, SessionToken};

/// A single HTTP request, already encoded.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer: Option<SessionToken>,
    /// Overrides the transport's default timeout for this request only.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Starts a request for the given endpoint with no body and no token.
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            method: endpoint.method,
            path: endpoint.path.clone(),
            query: endpoint.query.clone(),
            body: None,
            bearer: None,
            timeout: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: SessionToken) -> Self {
        self.bearer = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A response with any status code. Classification (success, rejection,
/// malformed body) is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` for 401, the server's "token no longer valid" signal.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Sends requests to the API.
///
/// The returned future must be `Send` so flows built on top (the login
/// poller in particular) can run inside spawned Tokio tasks.
pub trait Transport: Send + Sync + 'static {
    /// Sends one request and waits for its response.
    ///
    /// # Errors
    /// Returns a [`TransportError`] only when no HTTP response was received.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}
