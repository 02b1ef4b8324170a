//! Cancellation of blocked lock waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A shared flag a caller sets to abandon a pending lock wait.
///
/// Clones observe the same flag. A cancellation request is consumed by the
/// wait it interrupts, so the token can govern later waits again. A token
/// built with [`CancelToken::with_timeout`] also abandons any single wait
/// that lasts longer than its timeout; the clock restarts for every wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    timeout: Option<Duration>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that gives up on any wait longer than `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            timeout: Some(timeout),
        }
    }

    /// Requests cancellation of the current or next blocked wait.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if a cancellation request is pending.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the per-wait timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Starts timing one wait.
    pub(crate) fn start_wait(&self) -> Wait<'_> {
        Wait {
            token: self,
            deadline: self
                .timeout
                .and_then(|timeout| Instant::now().checked_add(timeout)),
        }
    }
}

/// One lock wait governed by a [`CancelToken`].
#[derive(Debug)]
pub(crate) struct Wait<'a> {
    token: &'a CancelToken,
    deadline: Option<Instant>,
}

impl Wait<'_> {
    /// Returns true if the wait should be abandoned, consuming a pending
    /// cancellation request.
    pub(crate) fn should_abandon(&self) -> bool {
        self.token.cancelled.swap(false, Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns how long to block before checking again, at most `interval`.
    pub(crate) fn slice(&self, interval: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => interval.min(deadline.saturating_duration_since(Instant::now())),
            None => interval,
        }
    }
}
