//! Login and logout glue
//!
//! Ties a successful login to the lock machinery: the password is kept in the
//! credential vault for the lock screen's fallback, the session is marked
//! authenticated and unlocked, and the inactivity clock starts from now.

use std::sync::Arc;

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::activity::ActivityClock;
use crate::autolock::apply_transition;
use crate::config::LockConfig;
use crate::credentials::CredentialVault;
use crate::machine::{LockEvent, LockMachine};
use crate::session::{SessionStore, SharedSession, User};
use crate::unlock::UnlockFlow;

/// Result of a successful login against the product API
#[derive(Clone, Debug)]
pub struct LoginGrant {
    pub user: User,
    pub access_token: String,
}

/// Account operations the host calls around the lock machinery
pub struct AccountService {
    session: SharedSession,
    vault: Arc<dyn CredentialVault>,
    clock: ActivityClock,
    machine: LockMachine,
    superadmin: Option<String>,
    unlock: Option<UnlockFlow>,
}

impl AccountService {
    pub fn new(
        config: &LockConfig,
        session: SharedSession,
        vault: Arc<dyn CredentialVault>,
        clock: ActivityClock,
    ) -> Self {
        Self {
            session,
            vault,
            clock,
            machine: LockMachine::new(config.inactivity_timeout()),
            superadmin: config.superadmin_username.clone(),
            unlock: None,
        }
    }

    /// Reset this flow's prompt on logout
    pub fn with_unlock_flow(mut self, unlock: UnlockFlow) -> Self {
        self.unlock = Some(unlock);
        self
    }

    /// Record a successful login
    ///
    /// A vault failure only costs the password fallback; the login itself
    /// still goes through.
    pub fn login(&self, grant: LoginGrant, password: &str) {
        let password = Zeroizing::new(password.to_string());
        if let Err(e) = self.vault.store(&grant.user.username, &password) {
            warn!(
                username = %grant.user.username,
                "Failed to save fallback credential: {}", e
            );
        }

        self.authenticate(grant);
    }

    /// Re-establish a persisted session on startup
    ///
    /// The vault is left as it is; a restored session starts unlocked.
    pub fn restore(&self, grant: LoginGrant) {
        info!(username = %grant.user.username, "Restoring session");
        self.authenticate(grant);
    }

    /// Log out and forget the fallback credential
    pub fn logout(&self) {
        if let Err(e) = self.vault.reset() {
            warn!("Failed to clear fallback credential: {}", e);
        }
        let transition = self.machine.step(self.session.status(), LockEvent::Logout);
        apply_transition(&self.session, &self.clock, transition);
        if let Some(unlock) = &self.unlock {
            unlock.reset();
        }
    }

    /// Session this service writes to
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    fn authenticate(&self, grant: LoginGrant) {
        self.session.set_credentials(
            grant.user,
            grant.access_token,
            self.superadmin.as_deref(),
        );
        self.clock.record_activity();
    }
}
