//! Auto-lock configuration
//!
//! All durations are stored in milliseconds so the JSON file stays readable.
//! Missing fields fall back to the defaults, which reproduce the demo app:
//! a 10 second inactivity threshold checked once per second.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LockError, Result};

/// Configuration directory name
const CONFIG_DIR_NAME: &str = "storelock";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Credential file name (under the data directory)
const CREDENTIAL_FILE_NAME: &str = "credentials.json";

/// Username that is granted superadmin rights on login
pub const DEFAULT_SUPERADMIN: &str = "emilys";

/// Auto-lock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Inactivity after which an unlocked session locks (milliseconds)
    pub inactivity_timeout_ms: u64,

    /// Cadence of the inactivity check (milliseconds, must not exceed the threshold)
    pub check_interval_ms: u64,

    /// Upper bound on a biometric unlock attempt (milliseconds)
    pub biometric_timeout_ms: u64,

    /// Text shown in the platform biometric prompt
    pub prompt_message: String,

    /// Label of the prompt's cancel button
    pub cancel_button_text: String,

    /// Where the fallback credential is persisted
    pub credential_path: PathBuf,

    /// Username treated as superadmin, if any
    pub superadmin_username: Option<String>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: 10_000,
            check_interval_ms: 1_000,
            biometric_timeout_ms: 30_000,
            prompt_message: "Unlock Store".to_string(),
            cancel_button_text: "Use Password".to_string(),
            credential_path: Self::default_credential_path(),
            superadmin_username: Some(DEFAULT_SUPERADMIN.to_string()),
        }
    }
}

impl LockConfig {
    /// Stricter settings for shared devices
    pub fn strict() -> Self {
        Self {
            inactivity_timeout_ms: 5_000, // 5 seconds
            check_interval_ms: 500,
            biometric_timeout_ms: 15_000,
            ..Default::default()
        }
    }

    /// Relaxed settings for development
    pub fn relaxed() -> Self {
        Self {
            inactivity_timeout_ms: 15 * 60_000, // 15 minutes
            check_interval_ms: 5_000,
            biometric_timeout_ms: 60_000,
            ..Default::default()
        }
    }

    /// Inactivity threshold as a duration
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    /// Check cadence as a duration
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Biometric attempt bound as a duration
    pub fn biometric_timeout(&self) -> Duration {
        Duration::from_millis(self.biometric_timeout_ms)
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    fn default_credential_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CREDENTIAL_FILE_NAME)
    }

    /// Reject settings the lock machine cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.inactivity_timeout_ms == 0 {
            return Err(LockError::Config(
                "inactivity_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.check_interval_ms == 0 {
            return Err(LockError::Config(
                "check_interval_ms must be greater than zero".to_string(),
            ));
        }
        // Detection latency is bounded by the check interval
        if self.check_interval_ms > self.inactivity_timeout_ms {
            return Err(LockError::Config(format!(
                "check_interval_ms ({}) must not exceed inactivity_timeout_ms ({})",
                self.check_interval_ms, self.inactivity_timeout_ms
            )));
        }
        if self.biometric_timeout_ms == 0 {
            return Err(LockError::Config(
                "biometric_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, creating a default file when none exists
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Self::default();
        config.save(path)?;
        tracing::info!("Created default config at {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
