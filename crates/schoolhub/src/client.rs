//! `SchoolHubClient` builder and the shared request pipeline.
//!
//! Every call goes through the same path:
//!
//! ```text
//! flow → Api::execute → (token from SessionStore) → Transport::send
//!      → status check → Codec::decode → typed response
//! ```
//!
//! The client is cheap to clone; clones share the transport, the session
//! store and the notice board.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use schoolhub_protocol::{
    Codec, Endpoint, JsonCodec, Lesson, NewsFeed, NewsItem, PasswordReset,
};
use schoolhub_session::{FileTokenStorage, SessionStore, TokenStorage};
use schoolhub_state::{Notice, NoticeId, Notices};
use schoolhub_transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::clubs::ClubsDirectory;
use crate::external_login::{ExternalLoginFlow, LinkOpener};
use crate::feeds;
use crate::login::CredentialLogin;
use crate::profile::ProfileSettings;
use crate::{ClientConfig, ClientError};

// ---------------------------------------------------------------------------
// Api: the shared request pipeline
// ---------------------------------------------------------------------------

/// State shared by the client and every flow it hands out.
pub(crate) struct Api<T, S> {
    pub(crate) transport: T,
    pub(crate) session: SessionStore<S>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ClientConfig,
    notices: Mutex<Notices>,
}

impl<T: Transport, S: TokenStorage> Api<T, S> {
    /// Sends one request and classifies the response.
    ///
    /// Authenticated endpoints read the token right before sending; a
    /// missing token fails here without touching the network.
    pub(crate) async fn execute(
        &self,
        endpoint: &Endpoint,
        body: Option<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> Result<ApiResponse, ClientError> {
        let mut request = ApiRequest::new(endpoint)
            .with_timeout(timeout.unwrap_or(self.config.request_timeout));
        if endpoint.authenticated {
            request = request.with_bearer(self.session.require()?);
        }
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::debug!(%endpoint, error = %e, "request failed");
            e
        })?;

        if response.is_success() {
            return Ok(response);
        }

        let message = self.codec.error_message(&response.body);
        if response.is_unauthorized() {
            tracing::warn!(%endpoint, "session token rejected by server");
        } else {
            tracing::debug!(%endpoint, status = response.status, "request rejected");
        }
        Err(ClientError::Rejected {
            status: response.status,
            message,
        })
    }

    pub(crate) fn encode<B: Serialize>(&self, body: &B) -> Result<Vec<u8>, ClientError> {
        Ok(self.codec.encode(body)?)
    }

    pub(crate) fn decode<R: DeserializeOwned>(&self, response: &ApiResponse) -> Result<R, ClientError> {
        Ok(self.codec.decode(&response.body)?)
    }

    /// `GET`-style call with no body and a typed response.
    pub(crate) async fn fetch<R: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<R, ClientError> {
        let response = self.execute(endpoint, None, None).await?;
        self.decode(&response)
    }

    /// Call with a JSON body and a typed response.
    pub(crate) async fn call<B: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        body: &B,
    ) -> Result<R, ClientError> {
        let response = self.execute(endpoint, Some(self.encode(body)?), None).await?;
        self.decode(&response)
    }

    /// Call whose success carries no meaningful body.
    pub(crate) async fn call_unit<B: Serialize>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<ApiResponse, ClientError> {
        let body = body.map(|b| self.encode(b)).transpose()?;
        self.execute(endpoint, body, None).await
    }

    pub(crate) fn notices(&self) -> MutexGuard<'_, Notices> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raises a transient error notice naming the failed action.
    pub(crate) fn report_failure(&self, action: &str, error: &ClientError) {
        tracing::warn!(action, error = %error, "action failed");
        let message = match error.server_message() {
            Some(server) => format!("{action}: {server}"),
            None => format!("{action}: {error}"),
        };
        self.notices().error(message);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`SchoolHubClient`].
///
/// # Example
///
/// ```rust,no_run
/// use schoolhub::prelude::*;
///
/// # fn main() -> Result<(), ClientError> {
/// let client = SchoolHubClient::builder()
///     .config(ClientConfig::from_env()?)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchoolHubClientBuilder {
    config: ClientConfig,
}

impl SchoolHubClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: Url) -> Self {
        self.config.base_url = url;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn poll(mut self, poll: schoolhub_poll::PollConfig) -> Self {
        self.config.poll = poll;
        self
    }

    pub fn notice_ttl(mut self, ttl: Duration) -> Self {
        self.config.notice_ttl = ttl;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Builds a client that talks HTTP and keeps the token in the platform
    /// data directory.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built or no data directory exists.
    pub fn build(self) -> Result<SchoolHubClient<HttpTransport, FileTokenStorage>, ClientError> {
        let storage = FileTokenStorage::default_location()?;
        self.build_with_storage(storage)
    }

    /// Builds an HTTP client with custom token storage.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn build_with_storage<S: TokenStorage>(
        self,
        storage: S,
    ) -> Result<SchoolHubClient<HttpTransport, S>, ClientError> {
        let config = self.config.validated();
        let transport = HttpTransport::new(
            config.base_url.clone(),
            config.request_timeout,
            &config.user_agent,
        )?;
        Ok(SchoolHubClient::from_parts(config, transport, storage))
    }

    /// Builds a client over any transport and storage.
    pub fn build_with<T: Transport, S: TokenStorage>(
        self,
        transport: T,
        storage: S,
    ) -> SchoolHubClient<T, S> {
        SchoolHubClient::from_parts(self.config.validated(), transport, storage)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Entry point to the SchoolHub API.
///
/// Hands out one object per screen-level flow ([`CredentialLogin`],
/// [`ExternalLoginFlow`], [`ClubsDirectory`], [`ProfileSettings`]) and
/// serves the read-only feeds directly.
pub struct SchoolHubClient<T, S> {
    api: Arc<Api<T, S>>,
}

impl<T, S> Clone for SchoolHubClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl SchoolHubClient<HttpTransport, FileTokenStorage> {
    pub fn builder() -> SchoolHubClientBuilder {
        SchoolHubClientBuilder::new()
    }
}

impl<T: Transport, S: TokenStorage> SchoolHubClient<T, S> {
    fn from_parts(config: ClientConfig, transport: T, storage: S) -> Self {
        tracing::debug!(base_url = %config.base_url, "client created");
        let notices = Notices::new(config.notice_ttl);
        Self {
            api: Arc::new(Api {
                transport,
                session: SessionStore::new(storage),
                codec: JsonCodec,
                config,
                notices: Mutex::new(notices),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.api.config
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.api.session
    }

    // -- flows --------------------------------------------------------------

    pub fn credential_login(&self) -> CredentialLogin<T, S> {
        CredentialLogin::new(Arc::clone(&self.api))
    }

    pub fn external_login<O: LinkOpener>(&self, opener: O) -> ExternalLoginFlow<T, S, O> {
        ExternalLoginFlow::new(Arc::clone(&self.api), opener)
    }

    pub fn clubs(&self) -> ClubsDirectory<T, S> {
        ClubsDirectory::new(Arc::clone(&self.api))
    }

    pub fn profile(&self) -> ProfileSettings<T, S> {
        ProfileSettings::new(Arc::clone(&self.api))
    }

    // -- feeds --------------------------------------------------------------

    /// Lessons for one day. A failure also raises an error notice.
    pub async fn schedule(&self, date: chrono::NaiveDate) -> Result<Vec<Lesson>, ClientError> {
        feeds::schedule(&self.api, date).await
    }

    /// One news feed. A failure also raises an error notice.
    pub async fn news(&self, feed: NewsFeed) -> Result<Vec<NewsItem>, ClientError> {
        feeds::news(&self.api, feed).await
    }

    // -- account ------------------------------------------------------------

    /// Sets a new password for `identifier` without signing in.
    ///
    /// # Errors
    /// [`ClientError::Validation`] for blank fields, otherwise whatever the
    /// request returns.
    pub async fn reset_password(
        &self,
        identifier: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        if identifier.trim().is_empty() || new_password.is_empty() {
            return Err(ClientError::Validation(
                "login and new password are required".into(),
            ));
        }
        let body = PasswordReset {
            identifier: identifier.trim().to_string(),
            new_password: new_password.to_string(),
        };
        match self
            .api
            .call_unit(&Endpoint::forgot_password(), Some(&body))
            .await
        {
            Ok(_) => {
                tracing::info!("password reset accepted");
                self.api.notices().success("Password changed, sign in with the new one");
                Ok(())
            }
            Err(e) => {
                self.api.report_failure("Password reset failed", &e);
                Err(e)
            }
        }
    }

    /// Forgets the stored token. Session subscribers see `SignedOut`.
    ///
    /// # Errors
    /// [`ClientError::Session`] if the token could not be removed.
    pub fn sign_out(&self) -> Result<(), ClientError> {
        self.api.session.clear()?;
        Ok(())
    }

    // -- notices ------------------------------------------------------------

    /// Notices currently on screen; expired ones are dropped first.
    pub fn notices(&self) -> Vec<Notice> {
        self.api.notices().active()
    }

    pub fn dismiss_notice(&self, id: NoticeId) -> bool {
        self.api.notices().dismiss(id)
    }
}
