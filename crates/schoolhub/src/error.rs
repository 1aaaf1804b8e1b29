//! Unified error type for the SchoolHub client.

use schoolhub_protocol::ProtocolError;
use schoolhub_session::SessionError;
use schoolhub_state::StateError;
use schoolhub_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Callers that only need to decide what to show the user match on
/// [`ClientError::kind`] instead of on the variants.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No HTTP response was received (connection, timeout, body).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body could not be encoded, or a response did not match its schema.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Token storage failed, or a call needed a token and there was none.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An optimistic change could not be started or settled.
    #[error(transparent)]
    State(#[from] StateError),

    /// The server answered with a non-success status.
    #[error("server rejected the request ({status}){}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// The external-login link was missing or not a usable web URL.
    #[error("login link unavailable: {0}")]
    LinkUnavailable(String),

    /// Nothing on this device could open the login link.
    #[error("no application can open the login link: {0}")]
    NoHandlerAvailable(String),

    /// Input was refused before anything was sent.
    #[error("{0}")]
    Validation(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// What went wrong, from the user's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkUnreachable,
    Timeout,
    ServerRejected {
        status: u16,
        message: Option<String>,
    },
    MalformedResponse,
    StorageUnavailable,
    LinkUnavailable,
    NoHandlerAvailable,
    NotAuthenticated,
    Validation,
    MutationInFlight,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(TransportError::Timeout(_)) => ErrorKind::Timeout,
            Self::Transport(_) => ErrorKind::NetworkUnreachable,
            Self::Protocol(_) => ErrorKind::MalformedResponse,
            Self::Session(SessionError::StorageUnavailable(_)) => ErrorKind::StorageUnavailable,
            Self::Session(SessionError::NotAuthenticated) => ErrorKind::NotAuthenticated,
            // The only way to get here is a blank token from the server.
            Self::Session(SessionError::InvalidToken) => ErrorKind::MalformedResponse,
            Self::State(StateError::MutationInFlight(_)) => ErrorKind::MutationInFlight,
            Self::State(_) => ErrorKind::Validation,
            Self::Rejected { status, message } => ErrorKind::ServerRejected {
                status: *status,
                message: message.clone(),
            },
            Self::LinkUnavailable(_) => ErrorKind::LinkUnavailable,
            Self::NoHandlerAvailable(_) => ErrorKind::NoHandlerAvailable,
            Self::Validation(_) | Self::Config(_) => ErrorKind::Validation,
        }
    }

    /// `true` for a 401: the server no longer accepts the stored token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status: 401, .. })
    }

    /// `true` when retrying later could help (network trouble or a 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The server's own message, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
