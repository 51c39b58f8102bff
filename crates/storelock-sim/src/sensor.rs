//! Simulated biometric sensor
//!
//! Stands in for the platform SDK so every unlock path can be exercised from
//! a terminal.

use async_trait::async_trait;
use clap::ValueEnum;
use storelock_core::{
    BiometricSensor, BiometryType, LockError, PromptOptions, PromptResult, Result, SensorInfo,
};
use tracing::debug;

/// How the simulated sensor answers
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SensorBehavior {
    /// Face matches
    Success,
    /// Face does not match
    Fail,
    /// User taps the cancel button
    Cancel,
    /// Prompt never returns
    Hang,
    /// Device has no sensor
    Unavailable,
    /// SDK throws
    Error,
}

pub struct SimulatedSensor {
    behavior: SensorBehavior,
}

impl SimulatedSensor {
    pub fn new(behavior: SensorBehavior) -> Self {
        Self { behavior }
    }
}

#[async_trait]
impl BiometricSensor for SimulatedSensor {
    async fn sensor_info(&self) -> Result<SensorInfo> {
        match self.behavior {
            SensorBehavior::Unavailable => Ok(SensorInfo {
                available: false,
                biometry: None,
            }),
            SensorBehavior::Error => Err(LockError::Sensor("sensor not responding".to_string())),
            _ => Ok(SensorInfo {
                available: true,
                biometry: Some(BiometryType::FaceId),
            }),
        }
    }

    async fn simple_prompt(&self, options: &PromptOptions) -> Result<PromptResult> {
        debug!(message = %options.prompt_message, behavior = ?self.behavior, "Biometric prompt shown");
        match self.behavior {
            SensorBehavior::Success => Ok(PromptResult {
                success: true,
                cancelled: false,
            }),
            SensorBehavior::Fail => Ok(PromptResult::default()),
            SensorBehavior::Cancel => Ok(PromptResult {
                success: false,
                cancelled: true,
            }),
            SensorBehavior::Hang => std::future::pending().await,
            SensorBehavior::Unavailable | SensorBehavior::Error => {
                Err(LockError::Sensor("no biometric hardware".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storelock_core::{
        LockConfig, MemoryCredentialVault, PlatformAuthenticator, UnlockAuthenticator,
    };

    fn authenticator(behavior: SensorBehavior) -> PlatformAuthenticator<SimulatedSensor> {
        PlatformAuthenticator::new(
            SimulatedSensor::new(behavior),
            Arc::new(MemoryCredentialVault::new()),
            PromptOptions::from_config(&LockConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_success_reports_face_id() {
        let auth = authenticator(SensorBehavior::Success);
        let availability = auth.check_availability().await;
        assert!(availability.available);
        assert_eq!(availability.kind.as_deref(), Some("FaceID"));
        assert!(auth.authenticate_biometric().await.success);
    }

    #[tokio::test]
    async fn test_error_and_missing_sensor_unavailable() {
        assert!(!authenticator(SensorBehavior::Error).check_availability().await.available);
        assert!(!authenticator(SensorBehavior::Unavailable).check_availability().await.available);
    }

    #[tokio::test]
    async fn test_cancel_and_fail() {
        assert!(authenticator(SensorBehavior::Cancel).authenticate_biometric().await.cancelled);

        let outcome = authenticator(SensorBehavior::Fail).authenticate_biometric().await;
        assert!(!outcome.success && !outcome.cancelled);
    }
}
