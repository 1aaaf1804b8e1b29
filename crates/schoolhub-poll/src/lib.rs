//! Bounded fixed-delay attempt scheduler for SchoolHub.
//!
//! Drives "ask again later" loops such as the external-login handshake:
//! a fixed number of attempts, a fixed pause before each one, a hard
//! timeout per attempt, and a cancellation token that stops everything.
//!
//! Attempts are strictly sequential. Attempt *n+1* is not scheduled until
//! the caller has the outcome of attempt *n*, and nothing fires after the
//! budget is spent.
//!
//! # Integration
//!
//! ```ignore
//! let mut scheduler = PollScheduler::new(PollConfig::default(), cancel.clone());
//! while let Some(info) = scheduler.wait_for_attempt().await {
//!     match scheduler.run(send_poll(info)).await {
//!         AttemptOutcome::Done(Ok(token)) => return Ok(token),
//!         AttemptOutcome::Done(Err(_)) | AttemptOutcome::TimedOut => continue,
//!         AttemptOutcome::Cancelled => break,
//!     }
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the poll scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Attempts before giving up. Default: 15.
    pub max_attempts: u32,
    /// Pause before every attempt, including the first. Default: 2 s.
    pub interval: Duration,
    /// Hard limit on a single attempt. Default: 5 s.
    pub attempt_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            interval: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl PollConfig {
    /// Upper bound on `max_attempts`; every loop stays bounded.
    pub const MAX_ATTEMPTS: u32 = 120;
    /// Lower bound on `attempt_timeout`.
    pub const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(100);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`PollScheduler::new`]. Rules:
    /// - `max_attempts` forced into `1..=MAX_ATTEMPTS`.
    /// - `attempt_timeout` raised to at least [`Self::MIN_ATTEMPT_TIMEOUT`].
    pub fn validated(mut self) -> Self {
        if self.max_attempts == 0 {
            warn!("max_attempts is 0, using 1");
            self.max_attempts = 1;
        } else if self.max_attempts > Self::MAX_ATTEMPTS {
            warn!(
                attempts = self.max_attempts,
                max = Self::MAX_ATTEMPTS,
                "max_attempts exceeds maximum, clamping"
            );
            self.max_attempts = Self::MAX_ATTEMPTS;
        }
        if self.attempt_timeout < Self::MIN_ATTEMPT_TIMEOUT {
            warn!(
                timeout_ms = self.attempt_timeout.as_millis() as u64,
                "attempt_timeout too small, raising"
            );
            self.attempt_timeout = Self::MIN_ATTEMPT_TIMEOUT;
        }
        self
    }

    /// Upper bound on how long a full run can take.
    pub fn worst_case(&self) -> Duration {
        (self.interval + self.attempt_timeout) * self.max_attempts
    }
}

// ---------------------------------------------------------------------------
// Per-attempt types
// ---------------------------------------------------------------------------

/// Returned by [`PollScheduler::wait_for_attempt`] when an attempt is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptInfo {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Attempts left after this one.
    pub remaining: u32,
}

/// How an attempt run through [`PollScheduler::run`] ended.
#[derive(Debug, PartialEq, Eq)]
pub enum AttemptOutcome<T> {
    /// The attempt's future finished in time. `T` may itself be an error.
    Done(T),
    /// The attempt exceeded `attempt_timeout` and was dropped.
    TimedOut,
    /// The token was cancelled while the attempt was in flight. Any result
    /// the attempt would have produced is discarded.
    Cancelled,
}

/// Why the scheduler stopped handing out attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStop {
    /// All `max_attempts` were used.
    Exhausted,
    /// The cancellation token fired.
    Cancelled,
    /// The caller reported success via [`PollScheduler::finish`].
    Finished,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters for one polling run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollMetrics {
    pub attempts_started: u32,
    pub attempts_timed_out: u32,
    /// Attempts the caller reported as failed via
    /// [`PollScheduler::record_failure`].
    pub attempts_failed: u32,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Hands out at most `max_attempts` attempts, `interval` apart.
///
/// One scheduler per polling run; start over with a fresh scheduler.
pub struct PollScheduler {
    config: PollConfig,
    cancel: CancellationToken,
    attempts: u32,
    stopped: Option<PollStop>,
    last_attempt_at: Option<Instant>,
    metrics: PollMetrics,
}

impl PollScheduler {
    pub fn new(config: PollConfig, cancel: CancellationToken) -> Self {
        let config = config.validated();
        debug!(
            max_attempts = config.max_attempts,
            interval_ms = config.interval.as_millis() as u64,
            timeout_ms = config.attempt_timeout.as_millis() as u64,
            "poll scheduler created"
        );
        Self {
            config,
            cancel,
            attempts: 0,
            stopped: None,
            last_attempt_at: None,
            metrics: PollMetrics::default(),
        }
    }

    /// Waits out the interval and returns the next attempt, or `None` once
    /// the run is over (budget spent, cancelled or finished).
    ///
    /// Cancellation is checked both before and after the wait, so a token
    /// cancelled during the pause never yields another attempt.
    pub async fn wait_for_attempt(&mut self) -> Option<AttemptInfo> {
        if self.check_stopped() {
            return None;
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {}
            () = time::sleep(self.config.interval) => {}
        }

        if self.check_stopped() {
            return None;
        }

        self.attempts += 1;
        self.metrics.attempts_started += 1;
        self.last_attempt_at = Some(Instant::now());
        let info = AttemptInfo {
            attempt: self.attempts,
            remaining: self.config.max_attempts - self.attempts,
        };
        trace!(attempt = info.attempt, remaining = info.remaining, "attempt due");
        Some(info)
    }

    /// Runs one attempt under the per-attempt timeout, abandoning it if the
    /// token is cancelled first.
    pub async fn run<F: Future>(&mut self, attempt: F) -> AttemptOutcome<F::Output> {
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => AttemptOutcome::Cancelled,
            result = time::timeout(self.config.attempt_timeout, attempt) => match result {
                Ok(value) => AttemptOutcome::Done(value),
                Err(_) => AttemptOutcome::TimedOut,
            },
        };

        match &outcome {
            AttemptOutcome::TimedOut => {
                self.metrics.attempts_timed_out += 1;
                warn!(
                    attempt = self.attempts,
                    timeout_ms = self.config.attempt_timeout.as_millis() as u64,
                    "poll attempt timed out"
                );
            }
            AttemptOutcome::Cancelled => {
                self.stopped = Some(PollStop::Cancelled);
                debug!(attempt = self.attempts, "poll attempt abandoned on cancel");
            }
            AttemptOutcome::Done(_) => {}
        }
        outcome
    }

    /// Counts an attempt that completed but did not succeed.
    pub fn record_failure(&mut self, reason: &str) {
        self.metrics.attempts_failed += 1;
        warn!(
            attempt = self.attempts,
            remaining = self.remaining(),
            reason,
            "poll attempt failed"
        );
    }

    /// Marks the run as successfully finished; no further attempts.
    pub fn finish(&mut self) {
        self.stopped = Some(PollStop::Finished);
    }

    /// Cancels the run. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `true` once the token fired, even if the scheduler has not noticed
    /// yet. Check this before applying a result that arrived late.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Why the run ended, `None` while it is still going.
    pub fn stop_reason(&self) -> Option<PollStop> {
        self.stopped
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining(&self) -> u32 {
        self.config.max_attempts - self.attempts
    }

    pub fn last_attempt_at(&self) -> Option<Instant> {
        self.last_attempt_at
    }

    pub fn metrics(&self) -> &PollMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Updates `stopped` from the token and the budget.
    fn check_stopped(&mut self) -> bool {
        if self.stopped.is_some() {
            return true;
        }
        if self.cancel.is_cancelled() {
            debug!(attempts = self.attempts, "poll run cancelled");
            self.stopped = Some(PollStop::Cancelled);
            return true;
        }
        if self.attempts >= self.config.max_attempts {
            debug!(attempts = self.attempts, "poll budget exhausted");
            self.stopped = Some(PollStop::Exhausted);
            return true;
        }
        false
    }
}
