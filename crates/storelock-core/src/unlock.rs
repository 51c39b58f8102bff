//! Lock screen unlock flow
//!
//! Drives biometric and password unlock against an [`UnlockAuthenticator`].
//! Every biometric attempt carries an id; the prompt state records which
//! attempt is in flight, and a result is only applied while its attempt is
//! still the one shown. Switching to the password path, resetting the flow or
//! starting a new attempt makes any late biometric result stale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use crate::activity::ActivityClock;
use crate::authenticator::UnlockAuthenticator;
use crate::autolock::apply_transition;
use crate::config::LockConfig;
use crate::error::Result;
use crate::machine::{LockEvent, LockMachine, Transition};
use crate::session::{LockStatus, SessionStore};

/// Message shown after a rejected password
pub const INCORRECT_PASSWORD_MESSAGE: &str = "Incorrect password. Please try again.";

/// Why the password entry is being offered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// No usable biometric sensor
    Unavailable,
    /// The user dismissed the biometric prompt
    Cancelled,
    /// The biometric check did not match
    Failed(Option<String>),
    /// The authenticator did not answer in time
    TimedOut,
    /// The user picked "use password" explicitly
    UserChoice,
}

/// What the lock screen should display
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PromptState {
    /// Nothing in progress
    #[default]
    Idle,
    /// Spinner while a biometric attempt runs
    Authenticating { attempt: u64 },
    /// Password field
    PasswordEntry {
        reason: FallbackReason,
        /// Validation message from the last rejected password
        last_error: Option<String>,
    },
}

impl PromptState {
    fn password(reason: FallbackReason) -> Self {
        PromptState::PasswordEntry {
            reason,
            last_error: None,
        }
    }
}

/// Result of an unlock action
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Session unlocked
    Unlocked,
    /// Biometric path ended; offer the password
    PasswordRequired(FallbackReason),
    /// Password did not match; retry allowed
    IncorrectPassword,
    /// A newer action replaced this attempt; its result was ignored
    Superseded,
    /// Session was not locked (already unlocked or logged out)
    NotLocked,
}

struct FlowInner {
    authenticator: Arc<dyn UnlockAuthenticator>,
    session: Arc<dyn SessionStore>,
    clock: ActivityClock,
    machine: LockMachine,
    biometric_timeout: Duration,
    next_attempt: AtomicU64,
    prompt: watch::Sender<PromptState>,
}

/// Unlock actions for the lock screen
#[derive(Clone)]
pub struct UnlockFlow {
    inner: Arc<FlowInner>,
}

impl UnlockFlow {
    pub fn new(
        config: &LockConfig,
        authenticator: Arc<dyn UnlockAuthenticator>,
        session: Arc<dyn SessionStore>,
        clock: ActivityClock,
    ) -> Result<Self> {
        config.validate()?;
        let (prompt, _) = watch::channel(PromptState::Idle);
        Ok(Self {
            inner: Arc::new(FlowInner {
                authenticator,
                session,
                clock,
                machine: LockMachine::new(config.inactivity_timeout()),
                biometric_timeout: config.biometric_timeout(),
                next_attempt: AtomicU64::new(1),
                prompt,
            }),
        })
    }

    /// Current prompt state
    pub fn prompt(&self) -> PromptState {
        self.inner.prompt.borrow().clone()
    }

    /// Observe prompt state changes
    pub fn subscribe_prompt(&self) -> watch::Receiver<PromptState> {
        self.inner.prompt.subscribe()
    }

    /// Return to idle, discarding any attempt in flight
    pub fn reset(&self) {
        self.inner.prompt.send_replace(PromptState::Idle);
    }

    /// Abandon biometrics and show the password field
    pub fn use_password(&self) {
        self.inner
            .prompt
            .send_replace(PromptState::password(FallbackReason::UserChoice));
        debug!("Switched to password unlock");
    }

    /// Run one biometric unlock attempt
    ///
    /// The availability check and prompt together are bounded by the
    /// configured biometric timeout.
    pub async fn unlock_with_biometrics(&self) -> UnlockOutcome {
        if self.inner.session.status() != LockStatus::Locked {
            return UnlockOutcome::NotLocked;
        }

        let attempt = self.inner.next_attempt.fetch_add(1, Ordering::SeqCst);
        self.inner
            .prompt
            .send_replace(PromptState::Authenticating { attempt });

        let authenticator = &self.inner.authenticator;
        let result = time::timeout(self.inner.biometric_timeout, async {
            let availability = authenticator.check_availability().await;
            if !availability.available {
                return None;
            }
            debug!(attempt, kind = ?availability.kind, "Prompting for biometrics");
            Some(authenticator.authenticate_biometric().await)
        })
        .await;

        let (next_prompt, outcome) = match result {
            Err(_) => {
                warn!(
                    attempt,
                    timeout_ms = self.inner.biometric_timeout.as_millis() as u64,
                    "Biometric unlock timed out"
                );
                fallback(FallbackReason::TimedOut)
            }
            Ok(None) => fallback(FallbackReason::Unavailable),
            Ok(Some(bio)) if bio.success => (PromptState::Idle, UnlockOutcome::Unlocked),
            Ok(Some(bio)) if bio.cancelled => fallback(FallbackReason::Cancelled),
            Ok(Some(bio)) => fallback(FallbackReason::Failed(bio.error_message)),
        };

        if !self.finish_attempt(attempt, next_prompt) {
            debug!(attempt, "Discarding stale biometric result");
            return UnlockOutcome::Superseded;
        }

        match outcome {
            UnlockOutcome::Unlocked => self.complete_unlock(),
            other => other,
        }
    }

    /// Unlock with the fallback password
    ///
    /// Supersedes any biometric attempt still in flight.
    pub async fn unlock_with_password(&self, candidate: &str) -> UnlockOutcome {
        if self.inner.session.status() != LockStatus::Locked {
            return UnlockOutcome::NotLocked;
        }

        self.inner.prompt.send_if_modified(|state| {
            if matches!(state, PromptState::Authenticating { .. }) {
                *state = PromptState::password(FallbackReason::UserChoice);
                true
            } else {
                false
            }
        });

        if self.inner.authenticator.authenticate_password(candidate).await {
            self.inner.prompt.send_replace(PromptState::Idle);
            return self.complete_unlock();
        }

        info!("Password unlock rejected");
        self.inner.prompt.send_modify(|state| {
            let reason = match state {
                PromptState::PasswordEntry { reason, .. } => reason.clone(),
                _ => FallbackReason::UserChoice,
            };
            *state = PromptState::PasswordEntry {
                reason,
                last_error: Some(INCORRECT_PASSWORD_MESSAGE.to_string()),
            };
        });
        UnlockOutcome::IncorrectPassword
    }

    /// Replace the prompt only if `attempt` is still the one displayed
    fn finish_attempt(&self, attempt: u64, next: PromptState) -> bool {
        self.inner.prompt.send_if_modified(|state| {
            if *state == (PromptState::Authenticating { attempt }) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn complete_unlock(&self) -> UnlockOutcome {
        let inner = &self.inner;
        let transition = inner
            .machine
            .step(inner.session.status(), LockEvent::UnlockSucceeded);
        apply_transition(inner.session.as_ref(), &inner.clock, transition);

        if transition == Transition::Unlock {
            UnlockOutcome::Unlocked
        } else {
            UnlockOutcome::NotLocked
        }
    }
}

fn fallback(reason: FallbackReason) -> (PromptState, UnlockOutcome) {
    (
        PromptState::password(reason.clone()),
        UnlockOutcome::PasswordRequired(reason),
    )
}
