//! Fallback credential vault
//!
//! The password entered at login is kept so the lock screen can offer a
//! password unlock when biometrics are unavailable or declined.
//!
//! # Storage
//!
//! - Only an Argon2id hash is persisted, never the password itself
//! - Both the stored password and every candidate are trimmed of surrounding
//!   whitespace before hashing, so `" hunter2 "` unlocks a vault saved with
//!   `"hunter2"`
//! - Verification uses the hash verifier's constant-time comparison

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{LockError, Result};

/// Current on-disk format version
const CREDENTIAL_VERSION: u32 = 1;

/// Persisted fallback credential
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredCredential {
    /// Account the credential belongs to
    username: String,
    /// Argon2id hash of the trimmed password
    hash: String,
    /// When the credential was saved
    saved_at: DateTime<Utc>,
    /// Version for future migrations
    version: u32,
}

impl StoredCredential {
    fn new(username: &str, password: &str) -> Result<Self> {
        Ok(Self {
            username: username.to_string(),
            hash: hash_password(password)?,
            saved_at: Utc::now(),
            version: CREDENTIAL_VERSION,
        })
    }
}

fn hash_password(password: &str) -> Result<String> {
    let normalized = Zeroizing::new(password.trim().as_bytes().to_vec());
    if normalized.is_empty() {
        return Err(LockError::Credential("password must not be empty".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(&normalized, &salt)
        .map_err(|e| LockError::Credential(format!("Failed to hash password: {}", e)))?
        .to_string();
    Ok(hash)
}

fn verify_password(candidate: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| LockError::Credential(format!("Invalid stored hash: {}", e)))?;
    let normalized = Zeroizing::new(candidate.trim().as_bytes().to_vec());
    Ok(Argon2::default().verify_password(&normalized, &parsed).is_ok())
}

/// Secure store for the password-unlock credential
pub trait CredentialVault: Send + Sync {
    /// Save (or replace) the credential for `username`
    fn store(&self, username: &str, password: &str) -> Result<()>;

    /// Check a candidate password against the saved credential
    ///
    /// Returns [`LockError::NoStoredCredential`] when nothing is saved.
    fn verify(&self, candidate: &str) -> Result<bool>;

    /// Username of the saved credential
    fn username(&self) -> Result<Option<String>>;

    /// Forget the saved credential
    fn reset(&self) -> Result<()>;
}

/// Credential vault backed by a JSON file
pub struct FileCredentialVault {
    path: PathBuf,
}

impl FileCredentialVault {
    /// Create a vault stored at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<StoredCredential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let stored = serde_json::from_str(&contents).map_err(|e| {
            LockError::Credential(format!("Failed to parse credential file: {}", e))
        })?;
        Ok(Some(stored))
    }

    fn save(&self, stored: &StoredCredential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(stored)?;
        fs::write(&self.path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl CredentialVault for FileCredentialVault {
    fn store(&self, username: &str, password: &str) -> Result<()> {
        let stored = StoredCredential::new(username, password)?;
        self.save(&stored)?;
        info!(username, "Fallback credential saved");
        Ok(())
    }

    fn verify(&self, candidate: &str) -> Result<bool> {
        let stored = self.load()?.ok_or(LockError::NoStoredCredential)?;
        verify_password(candidate, &stored.hash)
    }

    fn username(&self) -> Result<Option<String>> {
        Ok(self.load()?.map(|stored| stored.username))
    }

    fn reset(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!("Fallback credential removed from {:?}", self.path);
        }
        Ok(())
    }
}

/// Credential vault held in memory only
#[derive(Default)]
pub struct MemoryCredentialVault {
    stored: Mutex<Option<StoredCredential>>,
}

impl MemoryCredentialVault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialVault for MemoryCredentialVault {
    fn store(&self, username: &str, password: &str) -> Result<()> {
        let stored = StoredCredential::new(username, password)?;
        *self.stored.lock().unwrap_or_else(PoisonError::into_inner) = Some(stored);
        Ok(())
    }

    fn verify(&self, candidate: &str) -> Result<bool> {
        let hash = self
            .stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|stored| stored.hash.clone())
            .ok_or(LockError::NoStoredCredential)?;
        verify_password(candidate, &hash)
    }

    fn username(&self) -> Result<Option<String>> {
        Ok(self
            .stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|stored| stored.username.clone()))
    }

    fn reset(&self) -> Result<()> {
        *self.stored.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
