//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use rand::{Rng, distr::Alphanumeric};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use schoolhub_protocol::Method;
use url::Url;

use crate::{ApiRequest, ApiResponse, Transport, TransportError};

/// Correlation header attached to every request.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// A [`Transport`] that talks to the API over HTTP(S).
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    default_timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport with its own connection pool.
    ///
    /// `default_timeout` applies to every request that does not carry its
    /// own [`ApiRequest::timeout`].
    pub fn new(
        base_url: Url,
        default_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url, default_timeout))
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client, base_url: Url, default_timeout: Duration) -> Self {
        Self {
            client,
            base_url: normalize_base(base_url),
            default_timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidRequest(format!("invalid path '{path}': {e}")))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let request_id = request_id();

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .timeout(timeout)
            .header(HEADER_REQUEST_ID, request_id.as_str());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        tracing::debug!(
            %request_id,
            method = %request.method,
            path = %request.path,
            authenticated = request.bearer.is_some(),
            "sending request"
        );

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(timeout)
                } else {
                    TransportError::Body(e.to_string())
                }
            })?;

        tracing::debug!(%request_id, status, bytes = body.len(), "response received");

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn classify(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Unreachable(error.to_string())
    }
}

/// `Url::join` drops the last path segment unless it ends with `/`, so
/// `https://host/api` must become `https://host/api/` first.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn request_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}
