//! Storelock simulator - terminal stand-in for the storefront app shell
//!
//! Reads touch, lifecycle and unlock commands from stdin and feeds them to the
//! auto-lock core, so lock behavior can be exercised without a device.

mod repl;
mod sensor;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storelock_core::{
    AccountService, ActivityClock, AutoLock, AutoLockHandle, CredentialVault,
    FileCredentialVault, HostLifecycle, LockConfig, LockStatus, LoginGrant,
    MemoryCredentialVault, PlatformAuthenticator, PromptOptions, SessionState, SessionStore,
    SharedSession, UnlockFlow, UnlockOutcome, User,
};

use repl::{Command, HELP};
use sensor::{SensorBehavior, SimulatedSensor};

#[derive(Parser)]
#[command(name = "storelock-sim")]
#[command(about = "Drive the storefront auto-lock from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $STORELOCK_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How the simulated biometric sensor answers
    #[arg(short, long, value_enum, default_value_t = SensorBehavior::Success)]
    biometric: SensorBehavior,

    /// Keep the fallback password in memory instead of on disk
    #[arg(long)]
    ephemeral: bool,
}

/// Everything the shell commands act on
struct Shell {
    session: SharedSession,
    clock: ActivityClock,
    host: HostLifecycle,
    unlock: UnlockFlow,
    accounts: AccountService,
}

impl Shell {
    async fn execute(&self, command: Command, driver: &AutoLockHandle) {
        match command {
            Command::Login { username, password } => {
                let grant = LoginGrant {
                    user: demo_user(&username),
                    access_token: format!("demo-token-{}", username),
                };
                self.accounts.login(grant, &password);
                println!("logged in as {}", username);
            }
            Command::Tap | Command::Scroll => {
                self.clock.record_activity();
                debug!("Activity recorded");
            }
            Command::Lifecycle(state) => {
                self.host.emit(state);
                println!("app is {}", state);
            }
            Command::Unlock => spawn_biometric_attempt(self.unlock.clone()),
            Command::UsePassword => {
                self.unlock.use_password();
                println!("enter password with: password <password>");
            }
            Command::Password(candidate) => {
                let outcome = self.unlock.unlock_with_password(&candidate).await;
                report(&outcome);
            }
            Command::Status => self.print_status(driver),
            Command::Logout => {
                self.accounts.logout();
                println!("logged out");
            }
            Command::Help => println!("{}", HELP),
            // Handled by the read loop
            Command::Quit => {}
        }
    }

    fn print_status(&self, driver: &AutoLockHandle) {
        let state = self.session.snapshot();
        let user = state
            .user
            .as_ref()
            .map(|u| u.username.as_str())
            .unwrap_or("-");

        println!("status:     {}", state.status());
        println!("user:       {}", user);
        println!("superadmin: {}", state.is_superadmin);
        println!(
            "idle:       {:.1}s",
            self.clock.time_since_last_activity().as_secs_f64()
        );
        println!("polling:    {}", driver.is_polling());
        println!("prompt:     {:?}", self.unlock.prompt());
    }
}

fn demo_user(username: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        first_name: username.to_string(),
        last_name: String::new(),
        gender: String::new(),
        image: String::new(),
    }
}

fn report(outcome: &UnlockOutcome) {
    match outcome {
        UnlockOutcome::Unlocked => println!("unlocked"),
        UnlockOutcome::PasswordRequired(reason) => {
            println!("biometrics unavailable ({:?}); use: password <password>", reason)
        }
        UnlockOutcome::IncorrectPassword => {
            println!("{}", storelock_core::unlock::INCORRECT_PASSWORD_MESSAGE)
        }
        UnlockOutcome::Superseded => debug!("Biometric attempt superseded"),
        UnlockOutcome::NotLocked => println!("not locked"),
    }
}

/// Run a biometric attempt without blocking the command loop
fn spawn_biometric_attempt(unlock: UnlockFlow) {
    tokio::spawn(async move {
        let outcome = unlock.unlock_with_biometrics().await;
        report(&outcome);
    });
}

/// Show the lock screen, and its automatic biometric prompt, on every lock
async fn lock_screen(mut changes: watch::Receiver<SessionState>, unlock: UnlockFlow) {
    let mut previous = changes.borrow_and_update().status();

    while changes.changed().await.is_ok() {
        let status = changes.borrow_and_update().status();
        if status == LockStatus::Locked && previous != LockStatus::Locked {
            println!("*** locked ***");
            spawn_biometric_attempt(unlock.clone());
        }
        previous = status;
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .or_else(|| std::env::var("STORELOCK_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(LockConfig::default_path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storelock_sim=info,storelock_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!("Starting storelock simulator v{}", env!("CARGO_PKG_VERSION"));

    let config = LockConfig::load_or_create(&config_path(&cli))?;

    let vault: Arc<dyn CredentialVault> = if cli.ephemeral {
        Arc::new(MemoryCredentialVault::new())
    } else {
        Arc::new(FileCredentialVault::new(&config.credential_path))
    };

    let session = SharedSession::new();
    let clock = ActivityClock::new();
    let host = HostLifecycle::new();

    let authenticator = PlatformAuthenticator::new(
        SimulatedSensor::new(cli.biometric),
        Arc::clone(&vault),
        PromptOptions::from_config(&config),
    );
    let unlock = UnlockFlow::new(
        &config,
        Arc::new(authenticator),
        Arc::new(session.clone()),
        clock.clone(),
    )?;
    let accounts = AccountService::new(&config, session.clone(), vault, clock.clone())
        .with_unlock_flow(unlock.clone());

    let driver = AutoLock::new(&config, clock.clone(), Arc::new(session.clone()))?.spawn(&host);
    let lock_screen = tokio::spawn(lock_screen(session.subscribe(), unlock.clone()));

    let shell = Shell {
        session,
        clock,
        host,
        unlock,
        accounts,
    };

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => shell.execute(command, &driver).await,
                    Err(e) => println!("error: {}", e),
                }
            }
        }
    }

    driver.stop().await;
    lock_screen.abort();
    info!("Simulator stopped");
    Ok(())
}
