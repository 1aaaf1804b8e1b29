//! The session store: the single owner of the persisted bearer token.
//!
//! Every authenticated request reads the token through [`SessionStore::get`]
//! right before it is sent, so a sign-out in one part of the app is seen by
//! the next request everywhere else. There is no in-memory cache that could
//! drift from storage.

use schoolhub_protocol::SessionToken;
use tokio::sync::watch;

use crate::{SessionError, TokenStorage};

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Sign-in state as broadcast to subscribers.
///
/// ```text
///   SignedOut ──(save)──→ SignedIn ──(clear)──→ SignedOut
/// ```
///
/// Subscribers of [`SessionStore::subscribe`] see every transition; a UI
/// shell uses the move to `SignedOut` to return to the sign-in screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedOut,
    SignedIn,
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Persists the session token and broadcasts sign-in / sign-out.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct SessionStore<S> {
    storage: S,
    state: watch::Sender<SessionEvent>,
}

impl<S: TokenStorage> SessionStore<S> {
    /// Wraps `storage`. The initial state reflects whatever the storage
    /// already holds; an unreadable storage starts out signed out.
    pub fn new(storage: S) -> Self {
        let initial = match storage.load() {
            Ok(Some(_)) => SessionEvent::SignedIn,
            Ok(None) => SessionEvent::SignedOut,
            Err(e) => {
                tracing::warn!(error = %e, "session storage unreadable at startup");
                SessionEvent::SignedOut
            }
        };
        let (state, _) = watch::channel(initial);
        Self { storage, state }
    }

    /// Persists `token`, replacing any previous one.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] for a blank token
    /// - [`SessionError::StorageUnavailable`] if the write fails
    pub fn save(&self, token: SessionToken) -> Result<(), SessionError> {
        if token.is_blank() {
            return Err(SessionError::InvalidToken);
        }
        self.storage.store(&token)?;
        self.state.send_replace(SessionEvent::SignedIn);
        tracing::info!("session started");
        Ok(())
    }

    /// Reads the current token. `Ok(None)` means "not signed in".
    ///
    /// # Errors
    /// Only [`SessionError::StorageUnavailable`].
    pub fn get(&self) -> Result<Option<SessionToken>, SessionError> {
        self.storage.load()
    }

    /// Like [`get`](Self::get), but a missing token is an error.
    ///
    /// # Errors
    /// [`SessionError::NotAuthenticated`] when no token is stored.
    pub fn require(&self) -> Result<SessionToken, SessionError> {
        self.get()?.ok_or(SessionError::NotAuthenticated)
    }

    pub fn is_signed_in(&self) -> Result<bool, SessionError> {
        Ok(self.get()?.is_some())
    }

    /// Removes the token and moves to [`SessionEvent::SignedOut`].
    ///
    /// Subscribers are notified even if no token was stored, so a UI that
    /// got out of step always lands on the sign-in screen.
    ///
    /// # Errors
    /// [`SessionError::StorageUnavailable`] if the token could not be
    /// removed. The state is left unchanged in that case.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.storage.remove()?;
        self.state.send_replace(SessionEvent::SignedOut);
        tracing::info!("session cleared");
        Ok(())
    }

    /// The last broadcast state. Does not touch storage.
    pub fn state(&self) -> SessionEvent {
        *self.state.borrow()
    }

    /// Receives every state transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionEvent> {
        self.state.subscribe()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
