//! Lock state machine
//!
//! Pure transition logic, free of timers and shared state, so every rule can
//! be checked against plain values. The driver in [`crate::autolock`] feeds
//! it events and applies the resulting transitions.
//!
//! # Transitions
//!
//! | From | Event | Result |
//! |---|---|---|
//! | Unlocked | check with idle >= threshold | Lock (inactivity) |
//! | Unlocked | host enters inactive/background | Lock (backgrounded) |
//! | Unlocked | host returns to active | reset activity clock |
//! | Locked | unlock succeeded | Unlock |
//! | Locked | host returns to active | stay locked |
//! | any | logout | clear session |
//!
//! Nothing ever locks an unauthenticated session.

use std::fmt;
use std::time::Duration;

use crate::lifecycle::AppLifecycleState;
use crate::session::LockStatus;

/// Why a session was locked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockReason {
    /// No activity for at least the threshold
    Inactivity,
    /// The app left the foreground
    Backgrounded,
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockReason::Inactivity => write!(f, "inactivity"),
            LockReason::Backgrounded => write!(f, "backgrounded"),
        }
    }
}

/// Input to the state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockEvent {
    /// Periodic inactivity check
    Check {
        /// Time since the last recorded activity
        idle: Duration,
    },
    /// Host lifecycle transition
    Lifecycle {
        previous: AppLifecycleState,
        next: AppLifecycleState,
    },
    /// Biometric or password unlock completed successfully
    UnlockSucceeded,
    /// User logged out
    Logout,
}

/// Effect the driver must apply
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to do
    Stay,
    /// Lock the session
    Lock(LockReason),
    /// Unlock the session and reset the activity clock
    Unlock,
    /// Reset the activity clock without changing the lock state
    ResetActivity,
    /// Clear the session entirely
    Clear,
}

/// Inactivity lock policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockMachine {
    threshold: Duration,
}

impl LockMachine {
    /// Create a machine that locks after `threshold` of inactivity
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// Inactivity threshold
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Whether the periodic check needs to run in this status
    pub fn polls(status: LockStatus) -> bool {
        status == LockStatus::Unlocked
    }

    /// Compute the transition for `event` in `status`
    pub fn step(&self, status: LockStatus, event: LockEvent) -> Transition {
        match event {
            LockEvent::Logout => Transition::Clear,

            LockEvent::Check { idle } => {
                if status == LockStatus::Unlocked && idle >= self.threshold {
                    Transition::Lock(LockReason::Inactivity)
                } else {
                    Transition::Stay
                }
            }

            LockEvent::Lifecycle { previous, next } => {
                if status != LockStatus::Unlocked {
                    // Foreground alone never unlocks
                    return Transition::Stay;
                }
                if !next.is_foreground() {
                    Transition::Lock(LockReason::Backgrounded)
                } else if !previous.is_foreground() {
                    Transition::ResetActivity
                } else {
                    Transition::Stay
                }
            }

            LockEvent::UnlockSucceeded => {
                if status == LockStatus::Locked {
                    Transition::Unlock
                } else {
                    Transition::Stay
                }
            }
        }
    }
}
