//! Host application lifecycle events
//!
//! The host OS reports whether the app is in the foreground. Every transition
//! is delivered in order; a quick background/active round trip must still
//! reach the lock driver as two events.

use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{LockError, Result};

/// Buffered transitions per subscriber before it starts lagging
const LIFECYCLE_CHANNEL_CAPACITY: usize = 16;

/// App lifecycle state as reported by the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycleState {
    /// In the foreground and receiving input
    #[default]
    Active,
    /// Visible but not receiving input (app switcher, incoming call)
    Inactive,
    /// Not visible
    Background,
}

impl AppLifecycleState {
    /// Whether the app is in the foreground
    pub fn is_foreground(self) -> bool {
        self == AppLifecycleState::Active
    }
}

impl fmt::Display for AppLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppLifecycleState::Active => write!(f, "active"),
            AppLifecycleState::Inactive => write!(f, "inactive"),
            AppLifecycleState::Background => write!(f, "background"),
        }
    }
}

impl FromStr for AppLifecycleState {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(AppLifecycleState::Active),
            "inactive" => Ok(AppLifecycleState::Inactive),
            "background" => Ok(AppLifecycleState::Background),
            other => Err(LockError::UnknownLifecycleState(other.to_string())),
        }
    }
}

/// Source of host lifecycle transitions
///
/// Dropping the returned receiver releases the subscription.
pub trait LifecycleSource: Send + Sync {
    /// State at the time of the call
    fn current(&self) -> AppLifecycleState;

    /// Subscribe to subsequent transitions
    fn subscribe(&self) -> Result<broadcast::Receiver<AppLifecycleState>>;
}

/// Lifecycle broadcaster driven by the host shell
pub struct HostLifecycle {
    sender: broadcast::Sender<AppLifecycleState>,
    current: RwLock<AppLifecycleState>,
}

impl Default for HostLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLifecycle {
    /// Create a broadcaster starting in the foreground
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);
        Self {
            sender,
            current: RwLock::new(AppLifecycleState::Active),
        }
    }

    /// Report a transition from the host
    ///
    /// Repeated reports of the current state are dropped.
    pub fn emit(&self, next: AppLifecycleState) {
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if *current == next {
                return;
            }
            *current = next;
        }

        // No subscribers is fine; nothing is locked without a driver
        let receivers = self.sender.send(next).unwrap_or(0);
        debug!(state = %next, receivers, "Lifecycle transition");
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl LifecycleSource for HostLifecycle {
    fn current(&self) -> AppLifecycleState {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<AppLifecycleState>> {
        Ok(self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_states() {
        assert_eq!(
            "background".parse::<AppLifecycleState>().unwrap(),
            AppLifecycleState::Background
        );
        assert_eq!(
            "inactive".parse::<AppLifecycleState>().unwrap(),
            AppLifecycleState::Inactive
        );
        assert!("suspended".parse::<AppLifecycleState>().is_err());
    }

    #[test]
    fn test_only_active_is_foreground() {
        assert!(AppLifecycleState::Active.is_foreground());
        assert!(!AppLifecycleState::Inactive.is_foreground());
        assert!(!AppLifecycleState::Background.is_foreground());
    }

    #[tokio::test]
    async fn test_every_transition_delivered_in_order() {
        let host = HostLifecycle::new();
        let mut rx = host.subscribe().unwrap();

        host.emit(AppLifecycleState::Inactive);
        host.emit(AppLifecycleState::Background);
        host.emit(AppLifecycleState::Active);

        assert_eq!(rx.recv().await.unwrap(), AppLifecycleState::Inactive);
        assert_eq!(rx.recv().await.unwrap(), AppLifecycleState::Background);
        assert_eq!(rx.recv().await.unwrap(), AppLifecycleState::Active);
        assert_eq!(host.current(), AppLifecycleState::Active);
    }

    #[tokio::test]
    async fn test_duplicate_state_not_rebroadcast() {
        let host = HostLifecycle::new();
        let mut rx = host.subscribe().unwrap();

        host.emit(AppLifecycleState::Active);
        host.emit(AppLifecycleState::Background);
        host.emit(AppLifecycleState::Background);

        assert_eq!(rx.recv().await.unwrap(), AppLifecycleState::Background);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropping_receiver_unsubscribes() {
        let host = HostLifecycle::new();
        let rx = host.subscribe().unwrap();
        assert_eq!(host.subscriber_count(), 1);
        drop(rx);
        assert_eq!(host.subscriber_count(), 0);
    }
}
