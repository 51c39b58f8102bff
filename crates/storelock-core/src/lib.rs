//! Storelock - session auto-lock for the storefront app
//!
//! This crate provides the lock machinery behind the app's lock screen:
//! - Activity tracking shared by every input handler
//! - A pure lock state machine (inactivity and backgrounding)
//! - The auto-lock driver that feeds it timer ticks and lifecycle events
//! - Biometric and password unlock with a fallback credential vault
//! - Login/logout glue that keeps the vault and session in step

pub mod account;
pub mod activity;
pub mod authenticator;
pub mod autolock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod machine;
pub mod session;
pub mod unlock;

pub use account::{AccountService, LoginGrant};
pub use activity::ActivityClock;
pub use authenticator::{
    Availability, BiometricOutcome, BiometricSensor, BiometryType, PlatformAuthenticator,
    PromptOptions, PromptResult, SensorInfo, UnlockAuthenticator,
};
pub use autolock::{AutoLock, AutoLockHandle};
pub use config::LockConfig;
pub use credentials::{CredentialVault, FileCredentialVault, MemoryCredentialVault};
pub use error::{LockError, Result};
pub use lifecycle::{AppLifecycleState, HostLifecycle, LifecycleSource};
pub use machine::{LockEvent, LockMachine, LockReason, Transition};
pub use session::{LockStatus, SessionState, SessionStore, SharedSession, User};
pub use unlock::{FallbackReason, PromptState, UnlockFlow, UnlockOutcome};
