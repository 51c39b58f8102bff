//! Session store
//!
//! Holds the authentication and lock flags the rest of the app renders from.
//! `is_locked` only has meaning while authenticated: an unauthenticated
//! session is never reported as locked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Authenticated user profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub image: String,
}

/// Observable lock status derived from the session flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockStatus {
    /// No active session; locking does not apply
    Unauthenticated,
    /// Authenticated and usable
    Unlocked,
    /// Authenticated but hidden behind the lock screen
    Locked,
}

impl LockStatus {
    /// Derive the status from the raw flags
    pub fn from_flags(is_authenticated: bool, is_locked: bool) -> Self {
        match (is_authenticated, is_locked) {
            (false, _) => LockStatus::Unauthenticated,
            (true, false) => LockStatus::Unlocked,
            (true, true) => LockStatus::Locked,
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockStatus::Unauthenticated => write!(f, "unauthenticated"),
            LockStatus::Unlocked => write!(f, "unlocked"),
            LockStatus::Locked => write!(f, "locked"),
        }
    }
}

/// Snapshot of the session
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Logged-in user
    pub user: Option<User>,
    /// API access token
    pub token: Option<String>,
    /// Whether a user is logged in
    pub is_authenticated: bool,
    /// Whether the logged-in user is the designated superadmin
    pub is_superadmin: bool,
    /// Whether the lock screen is up
    pub is_locked: bool,
}

impl SessionState {
    /// Lock status of this snapshot
    pub fn status(&self) -> LockStatus {
        LockStatus::from_flags(self.is_authenticated, self.is_locked)
    }
}

// The token never goes to logs
impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("is_authenticated", &self.is_authenticated)
            .field("is_superadmin", &self.is_superadmin)
            .field("is_locked", &self.is_locked)
            .finish()
    }
}

/// Session operations consumed by the lock machinery
pub trait SessionStore: Send + Sync {
    /// Whether a user is logged in
    fn is_authenticated(&self) -> bool;

    /// Whether the session is locked
    fn is_locked(&self) -> bool;

    /// Set the lock flag
    fn set_locked(&self, locked: bool);

    /// Clear the session entirely
    fn logout(&self);

    /// Receive a notification on every session change
    fn subscribe(&self) -> watch::Receiver<SessionState>;

    /// Combined lock status
    fn status(&self) -> LockStatus {
        LockStatus::from_flags(self.is_authenticated(), self.is_locked())
    }
}

/// In-process session store shared between the app and the lock driver
#[derive(Clone)]
pub struct SharedSession {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SharedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedSession {
    /// Create an empty (unauthenticated) session
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(tx),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Store credentials after a successful login
    ///
    /// A fresh login always starts unlocked.
    pub fn set_credentials(&self, user: User, token: String, superadmin: Option<&str>) {
        let is_superadmin = superadmin.is_some_and(|name| name == user.username);
        info!(username = %user.username, is_superadmin, "Session authenticated");

        self.state.send_modify(|state| {
            state.user = Some(user);
            state.token = Some(token);
            state.is_authenticated = true;
            state.is_superadmin = is_superadmin;
            state.is_locked = false;
        });
    }

    /// Logged-in user, if any
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }
}

impl SessionStore for SharedSession {
    fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    fn is_locked(&self) -> bool {
        let state = self.state.borrow();
        state.is_authenticated && state.is_locked
    }

    fn set_locked(&self, locked: bool) {
        let changed = self.state.send_if_modified(|state| {
            if locked && !state.is_authenticated {
                return false;
            }
            if state.is_locked == locked {
                return false;
            }
            state.is_locked = locked;
            true
        });

        if changed {
            debug!(locked, "Session lock flag updated");
        }
    }

    fn logout(&self) {
        self.state.send_replace(SessionState::default());
        info!("Session cleared");
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
pub(crate) fn test_user(username: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        gender: "female".to_string(),
        image: String::new(),
    }
}
