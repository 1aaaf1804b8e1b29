//! User-facing notices: transient banners and persistent indicators.
//!
//! Transient notices expire on their own after the board's TTL (5 s by
//! default). Persistent ones stay until dismissed. Expiry is measured on the
//! Tokio clock, so paused-time tests can step over it.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Default lifetime of a transient notice.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

/// Upper bound on queued notices; the oldest is dropped first.
const MAX_NOTICES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeId(u64);

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notice-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
    Info,
}

/// One message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub kind: NoticeKind,
    pub message: String,
    /// `None` for persistent notices.
    pub expires_at: Option<Instant>,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// The queue of notices currently on screen.
#[derive(Debug)]
pub struct Notices {
    ttl: Duration,
    next_id: u64,
    entries: VecDeque<Notice>,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            entries: VecDeque::new(),
        }
    }

    /// Queues an error banner that dismisses itself after the TTL.
    pub fn error(&mut self, message: impl Into<String>) -> NoticeId {
        self.push(NoticeKind::Error, message.into(), true)
    }

    /// Queues a success banner that dismisses itself after the TTL.
    pub fn success(&mut self, message: impl Into<String>) -> NoticeId {
        self.push(NoticeKind::Success, message.into(), true)
    }

    /// Queues an informational banner ("nothing changed") that dismisses
    /// itself after the TTL.
    pub fn info(&mut self, message: impl Into<String>) -> NoticeId {
        self.push(NoticeKind::Info, message.into(), true)
    }

    /// Queues an error that stays until [`dismiss`](Self::dismiss)ed.
    pub fn persistent_error(&mut self, message: impl Into<String>) -> NoticeId {
        self.push(NoticeKind::Error, message.into(), false)
    }

    fn push(&mut self, kind: NoticeKind, message: String, transient: bool) -> NoticeId {
        let id = NoticeId(self.next_id);
        self.next_id += 1;
        let expires_at = transient.then(|| Instant::now() + self.ttl);

        tracing::debug!(%id, ?kind, message = %message, "notice raised");
        if self.entries.len() == MAX_NOTICES {
            self.entries.pop_front();
        }
        self.entries.push_back(Notice {
            id,
            kind,
            message,
            expires_at,
        });
        id
    }

    /// Removes a notice. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// Drops every expired notice and returns the rest, oldest first.
    pub fn active(&mut self) -> Vec<Notice> {
        self.prune();
        self.entries.iter().cloned().collect()
    }

    /// Most recent active notice, if any.
    pub fn latest(&mut self) -> Option<Notice> {
        self.prune();
        self.entries.back().cloned()
    }

    /// When the next transient notice expires, for UI refresh timers.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.entries.iter().filter_map(|n| n.expires_at).min()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn prune(&mut self) {
        let now = Instant::now();
        self.entries.retain(|n| !n.is_expired(now));
    }
}
