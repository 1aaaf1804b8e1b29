//! A single optimistically-updated value.
//!
//! ```text
//!             begin(delta)                 commit(server?)
//!   Confirmed ───────────────→ Pending ─────────────────────→ Confirmed
//!       ↑                         │
//!       └──────(rollback)─────────┘
//! ```
//!
//! While pending, [`Optimistic::view`] shows the value with the delta
//! applied and [`Optimistic::confirmed`] still shows the last value the
//! server agreed to. A failed mutation restores the confirmed value, so the
//! delta is never visible afterwards. A [`refresh`](Optimistic::refresh)
//! that lands mid-flight re-applies the delta to the new snapshot.

use std::fmt;
use std::sync::Arc;

use crate::StateError;

type Delta<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

struct Pending<T> {
    value: T,
    delta: Delta<T>,
}

impl<T: Clone> Clone for Pending<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            delta: Arc::clone(&self.delta),
        }
    }
}

/// Confirmed server snapshot plus an optional pending local change.
#[derive(Clone)]
pub struct Optimistic<T> {
    confirmed: T,
    pending: Option<Pending<T>>,
}

impl<T: fmt::Debug> fmt::Debug for Optimistic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimistic")
            .field("confirmed", &self.confirmed)
            .field("pending", &self.pending.as_ref().map(|p| &p.value))
            .finish()
    }
}

impl<T: Clone> Optimistic<T> {
    pub fn new(confirmed: T) -> Self {
        Self {
            confirmed,
            pending: None,
        }
    }

    /// Applies `delta` to a copy of the confirmed value and shows it. The
    /// delta is kept until the mutation settles.
    ///
    /// `label` names the entity in the error.
    ///
    /// # Errors
    /// [`StateError::MutationInFlight`] if a mutation is already pending.
    /// Nothing changes in that case.
    pub fn begin(
        &mut self,
        label: impl Into<String>,
        delta: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Result<&T, StateError> {
        if self.pending.is_some() {
            return Err(StateError::MutationInFlight(label.into()));
        }
        let delta: Delta<T> = Arc::new(delta);
        let mut value = self.confirmed.clone();
        delta(&mut value);
        let pending = self.pending.insert(Pending { value, delta });
        Ok(&pending.value)
    }

    /// Ends the pending mutation successfully.
    ///
    /// The server's object, when it sent one, becomes the new confirmed
    /// value. Otherwise the delta applied to the latest confirmed snapshot
    /// is confirmed.
    ///
    /// # Errors
    /// [`StateError::NothingPending`] if no mutation was started.
    pub fn commit(
        &mut self,
        label: impl Into<String>,
        server: Option<T>,
    ) -> Result<&T, StateError> {
        let optimistic = self
            .pending
            .take()
            .ok_or_else(|| StateError::NothingPending(label.into()))?;
        self.confirmed = server.unwrap_or(optimistic.value);
        Ok(&self.confirmed)
    }

    /// Discards the pending mutation and shows the confirmed value again.
    ///
    /// # Errors
    /// [`StateError::NothingPending`] if no mutation was started.
    pub fn rollback(&mut self, label: impl Into<String>) -> Result<&T, StateError> {
        self.pending
            .take()
            .ok_or_else(|| StateError::NothingPending(label.into()))?;
        Ok(&self.confirmed)
    }

    /// Replaces the confirmed value with a fresh server snapshot. A pending
    /// mutation stays pending, its delta re-applied on top of the new value.
    pub fn refresh(&mut self, confirmed: T) {
        self.confirmed = confirmed;
        if let Some(pending) = &mut self.pending {
            let mut value = self.confirmed.clone();
            (pending.delta)(&mut value);
            pending.value = value;
        }
    }

    /// What the user should see right now.
    pub fn view(&self) -> &T {
        self.pending
            .as_ref()
            .map_or(&self.confirmed, |pending| &pending.value)
    }

    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        joined: bool,
        members: u32,
    }

    fn counter() -> Optimistic<Counter> {
        Optimistic::new(Counter {
            joined: false,
            members: 3,
        })
    }

    fn join(c: &mut Counter) {
        c.joined = true;
        c.members += 1;
    }

    #[test]
    fn test_begin_shows_delta_and_keeps_confirmed() {
        let mut slot = counter();

        slot.begin("counter", join).unwrap();

        assert_eq!(slot.view().members, 4);
        assert!(slot.view().joined);
        assert_eq!(slot.confirmed().members, 3);
        assert!(slot.is_pending());
    }

    #[test]
    fn test_begin_while_pending_is_rejected() {
        let mut slot = counter();
        slot.begin("counter", join).unwrap();

        let err = slot.begin("counter", join).unwrap_err();

        assert_eq!(err, StateError::MutationInFlight("counter".into()));
        // The second delta was not applied on top of the first.
        assert_eq!(slot.view().members, 4);
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let mut slot = counter();
        slot.begin("counter", join).unwrap();

        slot.rollback("counter").unwrap();

        assert_eq!(
            slot.view(),
            &Counter {
                joined: false,
                members: 3
            }
        );
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_commit_without_server_object_confirms_delta() {
        let mut slot = counter();
        slot.begin("counter", join).unwrap();

        slot.commit("counter", None).unwrap();

        assert_eq!(slot.confirmed().members, 4);
        assert_eq!(slot.view().members, 4);
    }

    #[test]
    fn test_commit_with_server_object_replaces_snapshot() {
        let mut slot = counter();
        slot.begin("counter", join).unwrap();

        // Someone else joined meanwhile; the server knows better.
        slot.commit(
            "counter",
            Some(Counter {
                joined: true,
                members: 7,
            }),
        )
        .unwrap();

        assert_eq!(slot.view().members, 7);
    }

    #[test]
    fn test_commit_without_pending_fails() {
        let mut slot = counter();
        assert_eq!(
            slot.commit("counter", None).unwrap_err(),
            StateError::NothingPending("counter".into())
        );
        assert!(slot.rollback("counter").is_err());
    }

    // =====================================================================
    // Refresh while pending
    // =====================================================================

    #[test]
    fn test_refresh_during_pending_reapplies_delta() {
        let mut slot = counter();
        slot.begin("counter", join).unwrap();

        slot.refresh(Counter {
            joined: false,
            members: 10,
        });

        assert!(slot.is_pending());
        assert_eq!(slot.view().members, 11);
        assert_eq!(slot.confirmed().members, 10);
        slot.rollback("counter").unwrap();
        assert_eq!(slot.view().members, 10);
    }

    #[test]
    fn test_commit_after_refresh_keeps_refreshed_snapshot() {
        let mut slot = counter();
        slot.begin("counter", join).unwrap();
        slot.refresh(Counter {
            joined: false,
            members: 10,
        });

        let confirmed = slot.commit("counter", None).unwrap();

        assert_eq!(
            confirmed,
            &Counter {
                joined: true,
                members: 11
            }
        );
    }
}
