//! End-to-end lock scenarios
//!
//! These tests wire the full stack (session, activity clock, lifecycle
//! broadcaster, auto-lock driver, unlock flow and account glue) together and
//! drive it with virtual time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time;

use storelock_core::{
    AccountService, ActivityClock, AppLifecycleState, AutoLock, AutoLockHandle,
    BiometricSensor, BiometryType, CredentialVault, FallbackReason, FileCredentialVault,
    HostLifecycle, LifecycleSource, LockConfig, LockError, LockStatus, LoginGrant,
    MemoryCredentialVault, PlatformAuthenticator, PromptOptions, PromptResult, PromptState,
    Result, SensorInfo, SessionStore, SharedSession, UnlockFlow, UnlockOutcome, User,
};

// ============================================
// Test fixtures
// ============================================

#[derive(Clone, Copy)]
enum Face {
    Match,
    Hang,
}

struct TestSensor(Face);

#[async_trait]
impl BiometricSensor for TestSensor {
    async fn sensor_info(&self) -> Result<SensorInfo> {
        Ok(SensorInfo {
            available: true,
            biometry: Some(BiometryType::FaceId),
        })
    }

    async fn simple_prompt(&self, _options: &PromptOptions) -> Result<PromptResult> {
        match self.0 {
            Face::Match => Ok(PromptResult {
                success: true,
                cancelled: false,
            }),
            Face::Hang => std::future::pending().await,
        }
    }
}

struct BrokenLifecycle;

impl LifecycleSource for BrokenLifecycle {
    fn current(&self) -> AppLifecycleState {
        AppLifecycleState::Active
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<AppLifecycleState>> {
        Err(LockError::LifecycleUnavailable("no host bridge".to_string()))
    }
}

struct App {
    session: SharedSession,
    clock: ActivityClock,
    host: HostLifecycle,
    unlock: UnlockFlow,
    accounts: AccountService,
    driver: AutoLockHandle,
}

impl App {
    fn start(face: Face) -> Self {
        Self::with_vault(face, Arc::new(MemoryCredentialVault::new()))
    }

    fn with_vault(face: Face, vault: Arc<dyn CredentialVault>) -> Self {
        let config = LockConfig::default();
        let session = SharedSession::new();
        let clock = ActivityClock::new();
        let host = HostLifecycle::new();

        let authenticator = PlatformAuthenticator::new(
            TestSensor(face),
            Arc::clone(&vault),
            PromptOptions::from_config(&config),
        );
        let unlock = UnlockFlow::new(
            &config,
            Arc::new(authenticator),
            Arc::new(session.clone()),
            clock.clone(),
        )
        .unwrap();
        let accounts = AccountService::new(&config, session.clone(), vault, clock.clone())
            .with_unlock_flow(unlock.clone());
        let driver = AutoLock::new(&config, clock.clone(), Arc::new(session.clone()))
            .unwrap()
            .spawn(&host);

        Self {
            session,
            clock,
            host,
            unlock,
            accounts,
            driver,
        }
    }

    async fn login(&self) {
        self.accounts.login(
            LoginGrant {
                user: user("emilys"),
                access_token: "access-token".to_string(),
            },
            "emilyspass",
        );
        settle().await;
    }

    fn status(&self) -> LockStatus {
        self.session.status()
    }
}

fn user(username: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        email: format!("{}@x.dummyjson.com", username),
        first_name: "Emily".to_string(),
        last_name: "Johnson".to_string(),
        gender: "female".to_string(),
        image: String::new(),
    }
}

/// Let spawned tasks react to the last change
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Advance virtual time one second at a time, letting the driver run each step
async fn advance_secs(secs: u64) {
    for _ in 0..secs {
        time::advance(Duration::from_secs(1)).await;
        settle().await;
    }
}

// ============================================
// Inactivity
// ============================================

#[tokio::test(start_paused = true)]
async fn test_idle_session_locks_after_threshold() {
    let app = App::start(Face::Match);
    app.login().await;
    assert!(app.driver.is_polling());

    advance_secs(9).await;
    assert_eq!(app.status(), LockStatus::Unlocked);

    advance_secs(2).await;
    assert_eq!(app.status(), LockStatus::Locked);
    assert!(!app.driver.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_activity_postpones_lock() {
    let app = App::start(Face::Match);
    app.login().await;

    advance_secs(5).await;
    app.clock.record_activity();

    // t=14s, 9s since the tap
    advance_secs(9).await;
    assert_eq!(app.status(), LockStatus::Unlocked);

    // t=16s
    advance_secs(2).await;
    assert_eq!(app.status(), LockStatus::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_steady_activity_never_locks() {
    let app = App::start(Face::Match);
    app.login().await;

    for _ in 0..12 {
        advance_secs(5).await;
        app.clock.record_activity();
        assert_eq!(app.status(), LockStatus::Unlocked);
    }
}

#[tokio::test(start_paused = true)]
async fn test_unauthenticated_never_locks() {
    let app = App::start(Face::Match);
    settle().await;

    advance_secs(30).await;
    assert_eq!(app.status(), LockStatus::Unauthenticated);
    assert!(!app.session.snapshot().is_locked);
    assert!(!app.driver.is_polling());
}

// ============================================
// Lifecycle
// ============================================

#[tokio::test(start_paused = true)]
async fn test_background_locks_immediately() {
    let app = App::start(Face::Match);
    app.login().await;
    app.clock.record_activity();

    app.host.emit(AppLifecycleState::Background);
    settle().await;
    assert_eq!(app.status(), LockStatus::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_does_not_unlock() {
    let app = App::start(Face::Match);
    app.login().await;
    app.host.emit(AppLifecycleState::Background);
    settle().await;
    assert_eq!(app.status(), LockStatus::Locked);

    app.host.emit(AppLifecycleState::Active);
    settle().await;
    assert_eq!(app.status(), LockStatus::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_failure_falls_back_to_polling() {
    let session = SharedSession::new();
    let clock = ActivityClock::new();
    let driver = AutoLock::new(&LockConfig::default(), clock.clone(), Arc::new(session.clone()))
        .unwrap()
        .spawn(&BrokenLifecycle);

    session.set_credentials(user("emilys"), "token".to_string(), None);
    clock.record_activity();
    settle().await;
    assert!(driver.is_running());
    assert!(driver.is_polling());

    advance_secs(11).await;
    assert_eq!(session.status(), LockStatus::Locked);
}

// ============================================
// Unlock
// ============================================

#[tokio::test(start_paused = true)]
async fn test_biometric_unlock_resets_clock() {
    let app = App::start(Face::Match);
    app.login().await;
    advance_secs(11).await;
    assert_eq!(app.status(), LockStatus::Locked);

    assert_eq!(app.unlock.unlock_with_biometrics().await, UnlockOutcome::Unlocked);
    assert_eq!(app.clock.time_since_last_activity(), Duration::ZERO);
    settle().await;
    assert!(app.driver.is_polling());

    // Full threshold again after the unlock
    advance_secs(9).await;
    assert_eq!(app.status(), LockStatus::Unlocked);
    advance_secs(2).await;
    assert_eq!(app.status(), LockStatus::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_biometric_timeout_offers_password() {
    let app = App::start(Face::Hang);
    app.login().await;
    app.host.emit(AppLifecycleState::Background);
    settle().await;

    let outcome = app.unlock.unlock_with_biometrics().await;
    assert_eq!(outcome, UnlockOutcome::PasswordRequired(FallbackReason::TimedOut));
    assert_eq!(
        app.unlock.prompt(),
        PromptState::PasswordEntry {
            reason: FallbackReason::TimedOut,
            last_error: None,
        }
    );
    assert_eq!(app.status(), LockStatus::Locked);

    assert_eq!(
        app.unlock.unlock_with_password("emilyspass").await,
        UnlockOutcome::Unlocked
    );
    assert_eq!(app.status(), LockStatus::Unlocked);
}

#[tokio::test(start_paused = true)]
async fn test_password_switch_discards_pending_biometric() {
    let app = App::start(Face::Hang);
    app.login().await;
    app.host.emit(AppLifecycleState::Background);
    settle().await;

    let pending = {
        let unlock = app.unlock.clone();
        tokio::spawn(async move { unlock.unlock_with_biometrics().await })
    };
    settle().await;
    assert!(matches!(app.unlock.prompt(), PromptState::Authenticating { .. }));

    app.unlock.use_password();
    assert_eq!(
        app.unlock.unlock_with_password("wrong").await,
        UnlockOutcome::IncorrectPassword
    );
    assert_eq!(
        app.unlock.unlock_with_password(" emilyspass ").await,
        UnlockOutcome::Unlocked
    );

    // The abandoned attempt eventually times out without touching the prompt
    assert_eq!(pending.await.unwrap(), UnlockOutcome::Superseded);
    assert_eq!(app.unlock.prompt(), PromptState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_password_unlock_with_file_vault() {
    let dir = tempfile::TempDir::new().unwrap();
    let vault = Arc::new(FileCredentialVault::new(dir.path().join("credentials.json")));
    let app = App::with_vault(Face::Hang, vault.clone());
    app.login().await;
    assert_eq!(vault.username().unwrap().as_deref(), Some("emilys"));

    advance_secs(11).await;
    assert_eq!(app.status(), LockStatus::Locked);

    app.unlock.use_password();
    assert_eq!(
        app.unlock.unlock_with_password("emilyspass\n").await,
        UnlockOutcome::Unlocked
    );

    app.accounts.logout();
    assert!(!dir.path().join("credentials.json").exists());
}

// ============================================
// Logout and teardown
// ============================================

#[tokio::test(start_paused = true)]
async fn test_logout_clears_lock_and_stops_polling() {
    let app = App::start(Face::Match);
    app.login().await;
    advance_secs(11).await;
    assert_eq!(app.status(), LockStatus::Locked);

    app.accounts.logout();
    settle().await;
    let state = app.session.snapshot();
    assert!(!state.is_authenticated);
    assert!(!state.is_locked);
    assert!(!app.driver.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_relogin_cycle_reuses_one_driver() {
    let app = App::start(Face::Match);

    for _ in 0..3 {
        app.login().await;
        assert!(app.driver.is_polling());
        assert_eq!(app.host.subscriber_count(), 1);

        advance_secs(11).await;
        assert_eq!(app.status(), LockStatus::Locked);

        app.accounts.logout();
        settle().await;
        assert!(!app.driver.is_polling());
    }
}

#[tokio::test(start_paused = true)]
async fn test_teardown_releases_timer_and_subscription() {
    let app = App::start(Face::Match);
    app.login().await;

    let App {
        session,
        host,
        driver,
        ..
    } = app;
    driver.stop().await;
    assert_eq!(host.subscriber_count(), 0);

    advance_secs(20).await;
    host.emit(AppLifecycleState::Background);
    settle().await;
    assert_eq!(session.status(), LockStatus::Unlocked);
}

#[tokio::test(start_paused = true)]
async fn test_store_unlock_gets_full_threshold() {
    let app = App::start(Face::Match);
    app.login().await;
    advance_secs(11).await;
    assert_eq!(app.status(), LockStatus::Locked);

    app.session.set_locked(false);
    settle().await;

    advance_secs(9).await;
    assert_eq!(app.status(), LockStatus::Unlocked);
    advance_secs(2).await;
    assert_eq!(app.status(), LockStatus::Locked);
}
