//! Single-slot rearmable debounce timer.
//!
//! The timer is either idle or armed with exactly one deadline. Rearming
//! replaces the deadline, so repeated rearms never stack up pending
//! expiries. The timer itself never sleeps: the owner awaits
//! [`DebounceTimer::wait`] alongside its other inputs and calls
//! [`DebounceTimer::fire`] when the wait completes.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// A debounce timer with a fixed delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    /// Create an idle timer.
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// The configured quiet period.
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether an expiry is pending.
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any.
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel any pending expiry and schedule a new one `delay` from now.
    pub fn rearm(&mut self) {
        let now = Instant::now();
        self.deadline = Some(now.checked_add(self.delay).unwrap_or(now));
    }

    /// Cancel the pending expiry. Returns whether one was pending.
    pub const fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Transition to idle after [`DebounceTimer::wait`] completed.
    ///
    /// Returns `false` if the timer was not armed, which lets callers
    /// ignore a wait that raced with a cancel.
    pub const fn fire(&mut self) -> bool {
        self.cancel()
    }

    /// A future that completes at the current deadline, or never when
    /// idle.
    ///
    /// The future owns a copy of the deadline, so the timer may be rearmed
    /// while it is pending; callers re-create it on every loop iteration.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + use<> {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        }
    }
}
