//! Credential login: identifier + password in, session token out.
//!
//! ```text
//!   Idle ──submit──→ Submitting ──200 {token}──→ Authenticated
//!                         │
//!                         └──anything else──→ Rejected(reason)
//! ```
//!
//! `Rejected` keeps the "invalid login" indicator up until the next
//! submission, together with a persistent error notice that goes away at
//! the same moment. The reason tells a wrong password (the server answered 4xx)
//! apart from a server that could not be reached or answered nonsense, so
//! the UI can word the message differently while showing one indicator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use schoolhub_protocol::{Credentials, Endpoint, TokenResponse};
use schoolhub_session::TokenStorage;
use schoolhub_state::NoticeId;
use schoolhub_transport::Transport;

use crate::ClientError;
use crate::client::Api;

/// Why a login attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The server refused the credentials (any 4xx).
    InvalidCredentials { message: Option<String> },
    /// No usable answer: network failure, timeout, 5xx, malformed body or
    /// a token that could not be stored.
    Unavailable,
}

impl RejectReason {
    fn message(&self) -> String {
        match self {
            Self::InvalidCredentials {
                message: Some(message),
            } => message.clone(),
            Self::InvalidCredentials { message: None } => "Invalid login or password".into(),
            Self::Unavailable => "Could not sign in, try again later".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Submitting,
    Authenticated,
    Rejected(RejectReason),
}

/// Drives one login form.
pub struct CredentialLogin<T, S> {
    api: Arc<Api<T, S>>,
    state: Mutex<LoginState>,
    indicator: Mutex<Option<NoticeId>>,
}

impl<T: Transport, S: TokenStorage> CredentialLogin<T, S> {
    pub(crate) fn new(api: Arc<Api<T, S>>) -> Self {
        Self {
            api,
            state: Mutex::new(LoginState::Idle),
            indicator: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoginState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LoginState {
        self.lock().clone()
    }

    /// Whether the form should show its "invalid login or password"
    /// indicator.
    pub fn show_invalid_indicator(&self) -> bool {
        matches!(*self.lock(), LoginState::Rejected(_))
    }

    /// Submits the credentials. On success the token is persisted before
    /// this returns, so the next authenticated call already uses it.
    ///
    /// The store is left untouched on any failure.
    ///
    /// # Errors
    /// - [`ClientError::State`] with `MutationInFlight` if a submission is
    ///   already running
    /// - otherwise the error that caused the rejection
    pub async fn submit(&self, credentials: Credentials) -> Result<(), ClientError> {
        {
            let mut state = self.lock();
            if *state == LoginState::Submitting {
                return Err(schoolhub_state::StateError::MutationInFlight("login".into()).into());
            }
            *state = LoginState::Submitting;
        }
        self.clear_indicator();
        tracing::debug!(identifier = %credentials.identifier, "submitting credentials");

        let result = self.exchange(&credentials).await;

        let next = match &result {
            Ok(()) => {
                tracing::info!(identifier = %credentials.identifier, "signed in with credentials");
                LoginState::Authenticated
            }
            Err(e) => {
                let reason = classify(e);
                tracing::info!(
                    identifier = %credentials.identifier,
                    error = %e,
                    ?reason,
                    "credential login rejected"
                );
                let notice = self.api.notices().persistent_error(reason.message());
                *self.indicator_slot() = Some(notice);
                LoginState::Rejected(reason)
            }
        };
        *self.lock() = next;
        result
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<(), ClientError> {
        let response: TokenResponse = self
            .api
            .call(&Endpoint::credential_login(), credentials)
            .await?;
        self.api.session.save(response.token)?;
        Ok(())
    }

    /// Back to `Idle`, clearing the indicator. Does nothing while a
    /// submission is running.
    pub fn reset(&self) {
        let mut state = self.lock();
        if *state != LoginState::Submitting {
            *state = LoginState::Idle;
            drop(state);
            self.clear_indicator();
        }
    }

    fn indicator_slot(&self) -> MutexGuard<'_, Option<NoticeId>> {
        self.indicator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear_indicator(&self) {
        if let Some(id) = self.indicator_slot().take() {
            self.api.notices().dismiss(id);
        }
    }
}

fn classify(error: &ClientError) -> RejectReason {
    match error {
        ClientError::Rejected { status, message } if (400..500).contains(status) => {
            RejectReason::InvalidCredentials {
                message: message.clone(),
            }
        }
        _ => RejectReason::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_transport::TransportError;

    #[test]
    fn test_classify_4xx_is_invalid_credentials() {
        let err = ClientError::Rejected {
            status: 401,
            message: Some("wrong password".into()),
        };
        assert_eq!(
            classify(&err),
            RejectReason::InvalidCredentials {
                message: Some("wrong password".into())
            }
        );
    }

    #[test]
    fn test_classify_5xx_and_network_are_unavailable() {
        let server = ClientError::Rejected {
            status: 503,
            message: None,
        };
        let network: ClientError = TransportError::Unreachable("refused".into()).into();
        assert_eq!(classify(&server), RejectReason::Unavailable);
        assert_eq!(classify(&network), RejectReason::Unavailable);
    }
}
