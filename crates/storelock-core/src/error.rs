//! Error types for the storelock core

use thiserror::Error;

/// Result type alias for storelock operations
pub type Result<T> = std::result::Result<T, LockError>;

/// Errors that can occur around the auto-lock subsystem
///
/// Authentication failures are not errors here: the unlock path reports
/// them as outcomes, never as errors.
#[derive(Debug, Error)]
pub enum LockError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential vault error
    #[error("Credential error: {0}")]
    Credential(String),

    /// No fallback credential has been saved
    #[error("No stored credential - please log in again")]
    NoStoredCredential,

    /// Host lifecycle events could not be subscribed to
    #[error("Lifecycle events unavailable: {0}")]
    LifecycleUnavailable(String),

    /// Unrecognized lifecycle state name
    #[error("Unknown lifecycle state: {0}")]
    UnknownLifecycleState(String),

    /// Biometric sensor error
    #[error("Biometric sensor error: {0}")]
    Sensor(String),
}

impl From<serde_json::Error> for LockError {
    fn from(e: serde_json::Error) -> Self {
        LockError::Serialization(e.to_string())
    }
}
