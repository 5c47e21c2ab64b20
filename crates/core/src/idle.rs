//! Idle-timeout tracking for admin sessions.
//!
//! [`IdleTracker`] is a pure state machine: callers feed it interaction events
//! and clock ticks (with the current [`Instant`]) and it reports when the
//! expiry warning should appear, how long the countdown has left, and when the
//! session has run out. Driving it from a timer is the caller's business; see
//! `mp-cli session watch` for the terminal driver.
//!
//! The deadline is the earlier of "last activity + idle window" and an optional
//! hard deadline, normally the server session's `expiresAt`, so the client can
//! never outlive the server-side session.

use std::time::{Duration, Instant};

use thiserror::Error;

/// Default idle window before automatic logout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default lead time at which the expiry warning appears.
pub const DEFAULT_WARNING_LEAD: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdlePolicyError {
    #[error("idle timeout must be greater than zero")]
    ZeroTimeout,
    #[error("warning lead ({lead:?}) must be shorter than the idle timeout ({timeout:?})")]
    WarningTooLong { lead: Duration, timeout: Duration },
}

/// Idle window and warning lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlePolicy {
    idle_timeout: Duration,
    warning_lead: Duration,
}

impl IdlePolicy {
    /// # Errors
    ///
    /// Rejects a zero timeout and a warning lead that is not shorter than the timeout.
    pub fn new(idle_timeout: Duration, warning_lead: Duration) -> Result<Self, IdlePolicyError> {
        if idle_timeout.is_zero() {
            return Err(IdlePolicyError::ZeroTimeout);
        }
        if warning_lead >= idle_timeout {
            return Err(IdlePolicyError::WarningTooLong {
                lead: warning_lead,
                timeout: idle_timeout,
            });
        }
        Ok(Self {
            idle_timeout,
            warning_lead,
        })
    }

    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    #[must_use]
    pub const fn warning_lead(&self) -> Duration {
        self.warning_lead
    }
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            warning_lead: DEFAULT_WARNING_LEAD,
        }
    }
}

/// Where the session stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Warning { remaining: Duration },
    Expired,
}

/// Something the UI has to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// The warning just became visible.
    WarningShown { remaining: Duration },
    /// The visible countdown moved.
    Countdown { remaining: Duration },
    /// Interaction hid the warning.
    WarningHidden,
    /// Time ran out; the caller must log out. Reported once.
    Expired,
}

/// Tracks the last interaction and turns clock ticks into [`IdleEvent`]s.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    policy: IdlePolicy,
    last_activity: Instant,
    hard_deadline: Option<Instant>,
    warning_visible: bool,
    expired: bool,
}

impl IdleTracker {
    /// Start tracking with `now` counted as the latest interaction.
    #[must_use]
    pub const fn new(policy: IdlePolicy, now: Instant) -> Self {
        Self {
            policy,
            last_activity: now,
            hard_deadline: None,
            warning_visible: false,
            expired: false,
        }
    }

    /// Cap the deadline at `deadline` regardless of activity.
    #[must_use]
    pub const fn with_hard_deadline(mut self, deadline: Instant) -> Self {
        self.hard_deadline = Some(deadline);
        self
    }

    #[must_use]
    pub const fn policy(&self) -> IdlePolicy {
        self.policy
    }

    /// The instant at which the session runs out.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        let idle_deadline = self.last_activity + self.policy.idle_timeout;
        self.hard_deadline
            .map_or(idle_deadline, |hard| hard.min(idle_deadline))
    }

    /// Time left before expiry, zero once it has passed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline().saturating_duration_since(now)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    #[must_use]
    pub fn state(&self, now: Instant) -> IdleState {
        if self.expired {
            return IdleState::Expired;
        }
        let remaining = self.remaining(now);
        if remaining.is_zero() {
            IdleState::Expired
        } else if remaining <= self.policy.warning_lead {
            IdleState::Warning { remaining }
        } else {
            IdleState::Active
        }
    }

    /// Record a user interaction. Restarts the idle window and hides the
    /// warning if it was showing. Ignored once expired.
    pub fn record_activity(&mut self, now: Instant) -> Option<IdleEvent> {
        if self.expired {
            return None;
        }
        self.last_activity = now;
        if self.warning_visible {
            self.warning_visible = false;
            Some(IdleEvent::WarningHidden)
        } else {
            None
        }
    }

    /// The explicit "stay logged in" action. Same effect as an interaction.
    pub fn stay_logged_in(&mut self, now: Instant) -> Option<IdleEvent> {
        self.record_activity(now)
    }

    /// Advance to `now` and report what changed.
    pub fn poll(&mut self, now: Instant) -> Option<IdleEvent> {
        match self.state(now) {
            IdleState::Expired if self.expired => None,
            IdleState::Expired => {
                self.expired = true;
                self.warning_visible = false;
                Some(IdleEvent::Expired)
            }
            IdleState::Warning { remaining } if self.warning_visible => {
                Some(IdleEvent::Countdown { remaining })
            }
            IdleState::Warning { remaining } => {
                self.warning_visible = true;
                Some(IdleEvent::WarningShown { remaining })
            }
            IdleState::Active if self.warning_visible => {
                self.warning_visible = false;
                Some(IdleEvent::WarningHidden)
            }
            IdleState::Active => None,
        }
    }
}

/// Render a countdown as `m:ss`, rounding partial seconds up so the display
/// only reads `0:00` at expiry.
#[must_use]
pub fn format_countdown(remaining: Duration) -> String {
    let mut secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs += 1;
    }
    format!("{}:{:02}", secs / 60, secs % 60)
}
