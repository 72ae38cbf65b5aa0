//! Quiet-period debouncer
//!
//! An owned deadline rather than a spawned timer: the host loop asks for
//! [`Debouncer::deadline`] and sleeps until it, or polls [`Debouncer::is_due`].
//! Time is `tokio::time::Instant`, so tests drive it with a paused clock.

use std::time::Duration;
use tokio::time::Instant;

/// Debouncer with a fixed quiet period
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet_period: Duration,
    deadline: Option<Instant>,
    pending: usize,
}

impl Debouncer {
    /// Create debouncer
    #[inline]
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            deadline: None,
            pending: 0,
        }
    }

    /// Configured quiet period
    #[inline]
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Record an event and (re)start the quiet period from `now`
    ///
    /// Returns the new deadline.
    pub fn schedule(&mut self, now: Instant) -> Instant {
        let deadline = now + self.quiet_period;
        self.deadline = Some(deadline);
        self.pending += 1;
        deadline
    }

    /// Discard the pending deadline and event count
    ///
    /// Returns `true` if something was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending = 0;
        self.deadline.take().is_some()
    }

    /// Take the pending events regardless of the deadline
    ///
    /// Returns the number of coalesced events, `None` if nothing was pending.
    pub fn flush(&mut self) -> Option<usize> {
        self.deadline.take()?;
        Some(std::mem::take(&mut self.pending))
    }

    /// Pending deadline
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Events recorded since the last flush/cancel
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Check if the quiet period has elapsed
    #[inline]
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}
