//! Fixed-delay, bounded reconnection policy.
//!
//! When the connection drops unexpectedly the driver asks the policy to
//! schedule a retry. The policy decides whether one is allowed and when it
//! is due; the driver owns the timer (it polls [`ReconnectPolicy::deadline`])
//! and decides at fire time whether the retry still makes sense.

use std::time::Duration;
use tokio::time::Instant;

/// Default number of retries before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default delay before each retry.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Snapshot of the policy's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectState {
    /// A retry is scheduled and has not fired yet.
    pub is_reconnecting: bool,
    /// Retries scheduled since the last successful CONNECTED.
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub delay_ms: u64,
}

/// What [`ReconnectPolicy::schedule`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Retry number `attempt` fires after `delay`.
    Scheduled { attempt: u32, delay: Duration },
    /// A retry is already pending; nothing changed.
    AlreadyPending,
    /// `max_attempts` retries have been used up.
    Exhausted,
}

pub struct ReconnectPolicy {
    max_attempts: u32,
    delay: Duration,
    attempt_count: u32,
    deadline: Option<Instant>,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempt_count: 0,
            deadline: None,
        }
    }

    pub fn state(&self) -> ReconnectState {
        ReconnectState {
            is_reconnecting: self.deadline.is_some(),
            attempt_count: self.attempt_count,
            max_attempts: self.max_attempts,
            delay_ms: self.delay.as_millis() as u64,
        }
    }

    /// When the pending retry is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Schedule the next retry unless one is pending or the budget is spent.
    pub fn schedule(&mut self, now: Instant) -> ScheduleOutcome {
        if self.deadline.is_some() {
            tracing::debug!("reconnect already pending");
            return ScheduleOutcome::AlreadyPending;
        }
        if self.attempt_count >= self.max_attempts {
            tracing::error!(
                attempts = self.attempt_count,
                "max reconnect attempts reached; giving up"
            );
            return ScheduleOutcome::Exhausted;
        }

        self.attempt_count += 1;
        self.deadline = Some(now + self.delay);
        tracing::info!(
            attempt = self.attempt_count,
            max = self.max_attempts,
            delay_ms = self.delay.as_millis() as u64,
            "reconnect scheduled"
        );
        ScheduleOutcome::Scheduled {
            attempt: self.attempt_count,
            delay: self.delay,
        }
    }

    /// The pending retry is firing. Clears it so a failure of this attempt
    /// can schedule the next one; the attempt count is kept.
    pub fn fire(&mut self) {
        self.deadline = None;
    }

    /// Drop any pending retry and start counting from zero again.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.attempt_count = 0;
    }

    /// A session reached CONNECTED.
    pub fn on_connected(&mut self) {
        self.cancel();
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RECONNECT_DELAY)
    }
}
