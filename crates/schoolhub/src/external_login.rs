//! External (Telegram) login: deep link + polling handshake.
//!
//! ```text
//! Idle → LinkRequested → LinkOpened → Polling → Succeeded
//!             │               │          ├────→ TimedOut
//!             └───────────────┴──────────┴────→ Failed / Cancelled
//! ```
//!
//! 1. `GET /auth/telegram/url` returns a deep link and a temporary token.
//! 2. The link is handed to the platform ([`LinkOpener`]); the user
//!    confirms the login in the other app.
//! 3. `POST /auth/telegram {token}` is polled through a
//!    [`PollScheduler`] until it answers with a session token or the
//!    attempt budget runs out.
//!
//! Link and opener failures are terminal for the attempt. Poll failures are
//! counted and swallowed. Starting a new run cancels the previous one, and a
//! token that arrives after cancellation is never stored.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use schoolhub_poll::{AttemptOutcome, PollScheduler, PollStop};
use schoolhub_protocol::{
    Endpoint, ExternalLoginLink, ExternalLoginPoll, SessionToken, TemporaryToken, TokenResponse,
};
use schoolhub_session::TokenStorage;
use schoolhub_transport::Transport;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::ClientError;
use crate::client::Api;

// ---------------------------------------------------------------------------
// LinkOpener
// ---------------------------------------------------------------------------

/// Hands a URL to whatever on this device can open it.
///
/// Closures `Fn(&Url) -> io::Result<()>` implement this trait.
pub trait LinkOpener: Send + Sync + 'static {
    /// # Errors
    /// Any error means no handler could take the URL.
    fn open(&self, url: &Url) -> io::Result<()>;
}

impl<F> LinkOpener for F
where
    F: Fn(&Url) -> io::Result<()> + Send + Sync + 'static,
{
    fn open(&self, url: &Url) -> io::Result<()> {
        self(url)
    }
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalLoginState {
    Idle,
    LinkRequested,
    LinkOpened,
    Polling { attempt: u32, remaining: u32 },
    Succeeded,
    TimedOut,
    /// Terminal failure before polling started, or the token could not be
    /// stored.
    Failed(String),
    Cancelled,
}

impl ExternalLoginState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::LinkRequested | Self::LinkOpened | Self::Polling { .. }
        )
    }
}

/// How a completed run ended. Failures are returned as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A session token was issued and stored.
    Succeeded,
    /// Every poll attempt failed; start over to try again.
    TimedOut,
    Cancelled,
}

/// The in-flight handshake. Lives only in memory and is discarded when the
/// run ends, whatever the outcome.
#[derive(Debug, Clone)]
pub struct PendingLoginAttempt {
    pub temporary_token: TemporaryToken,
    pub deep_link: Url,
    pub started_at: Instant,
    pub attempts_remaining: u32,
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// Runs the external-login handshake. One instance per login screen.
pub struct ExternalLoginFlow<T, S, O> {
    api: Arc<Api<T, S>>,
    opener: O,
    state: watch::Sender<ExternalLoginState>,
    /// Incremented by every run; a run only publishes states while it is
    /// the latest one.
    generation: AtomicU64,
    cancel: Mutex<CancellationToken>,
    pending: Mutex<Option<PendingLoginAttempt>>,
}

impl<T: Transport, S: TokenStorage, O: LinkOpener> ExternalLoginFlow<T, S, O> {
    pub(crate) fn new(api: Arc<Api<T, S>>, opener: O) -> Self {
        let (state, _) = watch::channel(ExternalLoginState::Idle);
        Self {
            api,
            opener,
            state,
            generation: AtomicU64::new(0),
            cancel: Mutex::new(CancellationToken::new()),
            pending: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ExternalLoginState {
        self.state.borrow().clone()
    }

    /// Receives every state change, for progress display.
    pub fn subscribe(&self) -> watch::Receiver<ExternalLoginState> {
        self.state.subscribe()
    }

    /// Snapshot of the handshake in progress, if any.
    pub fn pending_attempt(&self) -> Option<PendingLoginAttempt> {
        self.pending_lock().clone()
    }

    /// Stops the current run. No further poll is sent and a response that
    /// is already on its way is ignored. Safe to call at any time.
    pub fn cancel(&self) {
        let token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if !token.is_cancelled() {
            tracing::info!("external login cancelled");
            token.cancel();
        }
    }

    /// Runs the whole handshake, cancelling any previous run first.
    ///
    /// # Errors
    /// - the request error if the link could not be fetched
    /// - [`ClientError::LinkUnavailable`] if the link response is malformed
    ///   or its URL is not an absolute http(s) URL
    /// - [`ClientError::NoHandlerAvailable`] if the opener refuses the link
    /// - [`ClientError::Session`] if the issued token cannot be stored
    pub async fn run(&self) -> Result<LoginOutcome, ClientError> {
        let (generation, cancel) = self.restart();
        let result = self.handshake(generation, &cancel).await;
        if self.is_current(generation) {
            *self.pending_lock() = None;
        }

        match &result {
            Ok(LoginOutcome::Succeeded) => self.publish(generation, ExternalLoginState::Succeeded),
            Ok(LoginOutcome::TimedOut) => self.publish(generation, ExternalLoginState::TimedOut),
            Ok(LoginOutcome::Cancelled) => self.publish(generation, ExternalLoginState::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "external login failed");
                self.publish(generation, ExternalLoginState::Failed(e.to_string()));
            }
        }
        result
    }

    fn restart(&self) -> (u64, CancellationToken) {
        let mut current = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        let fresh = CancellationToken::new();
        *current = fresh.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        (generation, fresh)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn publish(&self, generation: u64, state: ExternalLoginState) {
        if self.is_current(generation) {
            tracing::debug!(?state, "external login state");
            self.state.send_replace(state);
        }
    }

    fn pending_lock(&self) -> MutexGuard<'_, Option<PendingLoginAttempt>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn handshake(
        &self,
        generation: u64,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome, ClientError> {
        // -- Idle → LinkRequested ---------------------------------------------
        self.publish(generation, ExternalLoginState::LinkRequested);
        let endpoint = Endpoint::external_login_link();
        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(LoginOutcome::Cancelled),
            fetched = self.api.fetch::<ExternalLoginLink>(&endpoint) => fetched,
        };
        let link = fetched.map_err(|e| match e {
            ClientError::Protocol(p) => ClientError::LinkUnavailable(p.to_string()),
            other => other,
        })?;
        let url = link
            .validated_url()
            .map_err(|e| ClientError::LinkUnavailable(e.to_string()))?;

        // -- LinkRequested → LinkOpened ---------------------------------------
        self.opener
            .open(&url)
            .map_err(|e| ClientError::NoHandlerAvailable(e.to_string()))?;
        tracing::info!(host = url.host_str().unwrap_or_default(), "login link opened");
        self.publish(generation, ExternalLoginState::LinkOpened);

        let poll_config = self.api.config.poll.clone();
        *self.pending_lock() = Some(PendingLoginAttempt {
            temporary_token: link.token.clone(),
            deep_link: url,
            started_at: Instant::now(),
            attempts_remaining: poll_config.max_attempts,
        });

        // -- LinkOpened → Polling ---------------------------------------------
        let body = self.api.encode(&ExternalLoginPoll { token: link.token })?;
        let endpoint = Endpoint::external_login_poll();
        let mut scheduler = PollScheduler::new(poll_config, cancel.clone());

        while let Some(info) = scheduler.wait_for_attempt().await {
            self.publish(
                generation,
                ExternalLoginState::Polling {
                    attempt: info.attempt,
                    remaining: info.remaining,
                },
            );
            if let Some(pending) = self.pending_lock().as_mut() {
                pending.attempts_remaining = info.remaining;
            }

            let attempt = self.api.execute(
                &endpoint,
                Some(body.clone()),
                Some(scheduler.config().attempt_timeout),
            );
            let response = match scheduler.run(attempt).await {
                AttemptOutcome::Done(Ok(response)) => response,
                AttemptOutcome::Done(Err(e)) => {
                    scheduler.record_failure(&e.to_string());
                    continue;
                }
                AttemptOutcome::TimedOut => continue,
                AttemptOutcome::Cancelled => break,
            };

            let token = match self.api.decode::<TokenResponse>(&response) {
                Ok(TokenResponse { token }) if !token.is_blank() => token,
                Ok(_) => {
                    scheduler.record_failure("no token yet");
                    continue;
                }
                Err(e) => {
                    scheduler.record_failure(&e.to_string());
                    continue;
                }
            };

            if scheduler.is_cancelled() {
                tracing::debug!("discarding token that arrived after cancellation");
                return Ok(LoginOutcome::Cancelled);
            }
            scheduler.finish();
            self.complete(token, info.attempt)?;
            return Ok(LoginOutcome::Succeeded);
        }

        match scheduler.stop_reason() {
            Some(PollStop::Exhausted) => {
                tracing::warn!(attempts = scheduler.attempts(), "external login timed out");
                Ok(LoginOutcome::TimedOut)
            }
            _ => Ok(LoginOutcome::Cancelled),
        }
    }

    fn complete(&self, token: SessionToken, attempt: u32) -> Result<(), ClientError> {
        self.api.session.save(token)?;
        tracing::info!(attempt, "signed in via external login");
        Ok(())
    }
}
