//! Unlock authenticator contract
//!
//! The lock screen only needs three answers: is a biometric sensor usable,
//! did a biometric prompt succeed, and does a password match. Implementations
//! never fail: platform errors are caught here and reported as a negative
//! answer, so nothing thrown by a sensor SDK reaches the lock state machine.
//!
//! [`PlatformAuthenticator`] adapts a fallible [`BiometricSensor`] and a
//! [`CredentialVault`] to that contract.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::LockConfig;
use crate::credentials::CredentialVault;
use crate::error::Result;

/// Whether biometric unlock can be offered
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    /// Sensor kind, e.g. "FaceID"
    pub kind: Option<String>,
}

impl Availability {
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Result of a single biometric prompt
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BiometricOutcome {
    pub success: bool,
    /// The user dismissed the prompt (e.g. chose "Use Password")
    pub cancelled: bool,
    pub error_message: Option<String>,
}

impl BiometricOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Authenticator consumed by the unlock flow
#[async_trait]
pub trait UnlockAuthenticator: Send + Sync {
    /// Report whether biometric unlock is usable; `available: false` on any error
    async fn check_availability(&self) -> Availability;

    /// Run one biometric prompt, without retrying
    async fn authenticate_biometric(&self) -> BiometricOutcome;

    /// Compare a candidate password with the saved credential
    async fn authenticate_password(&self, candidate: &str) -> bool;
}

/// Sensor kinds reported by the platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BiometryType {
    TouchId,
    FaceId,
    /// Generic biometrics (Android fingerprint/face)
    Biometrics,
    Other(String),
}

impl BiometryType {
    /// Whether this kind can be used for unlock
    pub fn is_supported(&self) -> bool {
        !matches!(self, BiometryType::Other(_))
    }

    pub fn name(&self) -> &str {
        match self {
            BiometryType::TouchId => "TouchID",
            BiometryType::FaceId => "FaceID",
            BiometryType::Biometrics => "Biometrics",
            BiometryType::Other(name) => name,
        }
    }
}

impl fmt::Display for BiometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sensor state reported by the platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SensorInfo {
    pub available: bool,
    pub biometry: Option<BiometryType>,
}

/// Text for the platform biometric prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptOptions {
    pub prompt_message: String,
    pub cancel_button_text: String,
}

impl PromptOptions {
    pub fn from_config(config: &LockConfig) -> Self {
        Self {
            prompt_message: config.prompt_message.clone(),
            cancel_button_text: config.cancel_button_text.clone(),
        }
    }
}

/// Raw prompt result from the platform
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptResult {
    pub success: bool,
    pub cancelled: bool,
}

/// Platform biometric SDK seam; may fail in any call
#[async_trait]
pub trait BiometricSensor: Send + Sync {
    /// Query sensor presence and kind
    async fn sensor_info(&self) -> Result<SensorInfo>;

    /// Show the system biometric prompt
    async fn simple_prompt(&self, options: &PromptOptions) -> Result<PromptResult>;
}

/// Authenticator over a platform sensor and a credential vault
pub struct PlatformAuthenticator<S> {
    sensor: S,
    vault: Arc<dyn CredentialVault>,
    prompt: PromptOptions,
}

impl<S: BiometricSensor> PlatformAuthenticator<S> {
    pub fn new(sensor: S, vault: Arc<dyn CredentialVault>, prompt: PromptOptions) -> Self {
        Self {
            sensor,
            vault,
            prompt,
        }
    }
}

#[async_trait]
impl<S: BiometricSensor> UnlockAuthenticator for PlatformAuthenticator<S> {
    async fn check_availability(&self) -> Availability {
        match self.sensor.sensor_info().await {
            Ok(SensorInfo {
                available: true,
                biometry: Some(kind),
            }) if kind.is_supported() => Availability {
                available: true,
                kind: Some(kind.name().to_string()),
            },
            Ok(info) => {
                debug!(?info, "Biometric sensor not usable");
                Availability {
                    available: false,
                    kind: info.biometry.map(|kind| kind.name().to_string()),
                }
            }
            Err(e) => {
                warn!("Biometric availability check failed: {}", e);
                Availability::unavailable()
            }
        }
    }

    async fn authenticate_biometric(&self) -> BiometricOutcome {
        match self.sensor.simple_prompt(&self.prompt).await {
            Ok(result) if result.success => BiometricOutcome::succeeded(),
            Ok(result) if result.cancelled => BiometricOutcome::cancelled(),
            Ok(_) => BiometricOutcome::failed("Biometric authentication failed"),
            Err(e) => {
                warn!("Biometric prompt failed: {}", e);
                BiometricOutcome::failed(e.to_string())
            }
        }
    }

    async fn authenticate_password(&self, candidate: &str) -> bool {
        let vault = Arc::clone(&self.vault);
        let candidate = Zeroizing::new(candidate.to_string());

        // Argon2 verification is CPU-bound; run it on the blocking pool
        match tokio::task::spawn_blocking(move || vault.verify(&candidate)).await {
            Ok(Ok(matched)) => matched,
            Ok(Err(e)) => {
                warn!("Password check failed: {}", e);
                false
            }
            Err(e) => {
                warn!("Password check task failed: {}", e);
                false
            }
        }
    }
}
