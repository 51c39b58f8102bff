//! Auto-lock driver
//!
//! A single task that turns time, host lifecycle transitions and session
//! changes into [`LockEvent`]s for the [`LockMachine`]. The inactivity check is
//! a repeating tick compared against the shared [`ActivityClock`], so frequent
//! activity never reschedules anything. The tick only runs while the session
//! is unlocked.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::activity::ActivityClock;
use crate::config::LockConfig;
use crate::error::Result;
use crate::lifecycle::{AppLifecycleState, LifecycleSource};
use crate::machine::{LockEvent, LockMachine, Transition};
use crate::session::{LockStatus, SessionStore};

/// Apply a machine transition to the session and clock
pub(crate) fn apply_transition(
    session: &dyn SessionStore,
    clock: &ActivityClock,
    transition: Transition,
) {
    match transition {
        Transition::Stay => {}
        Transition::Lock(reason) => {
            session.set_locked(true);
            info!(
                %reason,
                idle_ms = clock.time_since_last_activity().as_millis() as u64,
                "Session locked"
            );
        }
        Transition::Unlock => {
            session.set_locked(false);
            clock.record_activity();
            info!("Session unlocked");
        }
        Transition::ResetActivity => clock.record_activity(),
        Transition::Clear => session.logout(),
    }
}

/// Inactivity and lifecycle lock driver
pub struct AutoLock {
    machine: LockMachine,
    check_interval: Duration,
    clock: ActivityClock,
    session: Arc<dyn SessionStore>,
}

impl AutoLock {
    /// Create a driver, rejecting configuration the check loop cannot run with
    pub fn new(
        config: &LockConfig,
        clock: ActivityClock,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            machine: LockMachine::new(config.inactivity_timeout()),
            check_interval: config.check_interval(),
            clock,
            session,
        })
    }

    /// Feed one event through the machine and apply the result
    pub fn handle(&self, event: LockEvent) -> Transition {
        let transition = self.machine.step(self.session.status(), event);
        apply_transition(self.session.as_ref(), &self.clock, transition);
        transition
    }

    /// Start the driver task
    ///
    /// If the lifecycle source cannot be subscribed to, the driver still runs
    /// and detects inactivity through the periodic check alone.
    pub fn spawn(self, lifecycle: &dyn LifecycleSource) -> AutoLockHandle {
        // Read before subscribing so a transition in between is still seen as one
        let app_state = lifecycle.current();
        let events = match lifecycle.subscribe() {
            Ok(rx) => Some(rx),
            Err(e) => {
                warn!("Lifecycle subscription failed, inactivity checks only: {}", e);
                None
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (polling_tx, polling_rx) = watch::channel(false);

        info!(
            threshold_ms = self.machine.threshold().as_millis() as u64,
            check_interval_ms = self.check_interval.as_millis() as u64,
            "Auto-lock started"
        );
        let task = tokio::spawn(self.run(events, app_state, shutdown_rx, polling_tx));

        AutoLockHandle {
            shutdown: Some(shutdown_tx),
            polling: polling_rx,
            task,
        }
    }

    async fn run(
        self,
        mut events: Option<broadcast::Receiver<AppLifecycleState>>,
        mut app_state: AppLifecycleState,
        mut shutdown: oneshot::Receiver<()>,
        polling: watch::Sender<bool>,
    ) {
        let mut session_changes = self.session.subscribe();
        let mut ticker = time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut armed = false;
        let mut last_status = self.session.status();

        loop {
            let status = self.session.status();
            if status == LockStatus::Unlocked && last_status != LockStatus::Unlocked {
                // Every way into Unlocked starts a fresh inactivity window
                self.clock.record_activity();
            }
            last_status = status;

            let should_poll = LockMachine::polls(status);
            if should_poll && !armed {
                // Count a full interval from now, not from the last pause
                ticker.reset();
                debug!("Inactivity check armed");
            } else if !should_poll && armed {
                debug!("Inactivity check paused");
            }
            armed = should_poll;
            polling.send_replace(armed);

            tokio::select! {
                _ = &mut shutdown => break,

                _ = ticker.tick(), if armed => {
                    let idle = self.clock.time_since_last_activity();
                    self.handle(LockEvent::Check { idle });
                }

                changed = session_changes.changed() => {
                    if changed.is_err() {
                        debug!("Session store dropped");
                        break;
                    }
                }

                next = next_transition(&mut events) => match next {
                    Some(next) => {
                        let previous = app_state;
                        app_state = next;
                        self.handle(LockEvent::Lifecycle { previous, next });
                    }
                    None => {
                        warn!("Lifecycle events closed, inactivity checks only");
                        events = None;
                    }
                },
            }
        }

        polling.send_replace(false);
        info!("Auto-lock stopped");
    }
}

/// Wait for the next lifecycle transition, or forever without a subscription
async fn next_transition(
    events: &mut Option<broadcast::Receiver<AppLifecycleState>>,
) -> Option<AppLifecycleState> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        match rx.recv().await {
            Ok(state) => return Some(state),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Lifecycle events lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Handle to a running auto-lock driver
///
/// Dropping the handle aborts the driver.
pub struct AutoLockHandle {
    shutdown: Option<oneshot::Sender<()>>,
    polling: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl AutoLockHandle {
    /// Whether the periodic inactivity check is currently armed
    pub fn is_polling(&self) -> bool {
        *self.polling.borrow()
    }

    /// Whether the driver task is still alive
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the driver and release the timer and lifecycle subscription
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for AutoLockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
