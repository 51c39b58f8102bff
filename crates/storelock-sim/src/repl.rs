//! Shell command parsing

use anyhow::{anyhow, bail, Result};
use storelock_core::AppLifecycleState;

pub const HELP: &str = "\
commands:
  login <username> <password>   log in and save the fallback password
  tap | scroll                  record user activity
  active | inactive | background
                                report a host lifecycle transition
  unlock                        start a biometric unlock attempt
  use-password                  switch the lock screen to password entry
  password <password>           unlock with the fallback password
  status                        show session and lock state
  logout                        log out and forget the fallback password
  help                          show this help
  quit                          stop the auto-lock and exit";

/// One shell command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Tap,
    Scroll,
    Lifecycle(AppLifecycleState),
    Unlock,
    UsePassword,
    Password(String),
    Status,
    Logout,
    Help,
    Quit,
}

impl Command {
    /// Parse a line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        let Some((word, rest)) = split_word(line) else {
            return Ok(None);
        };

        let command = match word {
            "login" => {
                let (username, password) =
                    split_word(rest).ok_or_else(|| anyhow!("usage: login <username> <password>"))?;
                if password.is_empty() {
                    bail!("usage: login <username> <password>");
                }
                Command::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                }
            }
            "tap" => Command::Tap,
            "scroll" => Command::Scroll,
            "active" | "inactive" | "background" => Command::Lifecycle(word.parse()?),
            "unlock" => Command::Unlock,
            "use-password" => Command::UsePassword,
            // Kept verbatim; the vault trims surrounding whitespace itself
            "password" => {
                if rest.is_empty() {
                    bail!("usage: password <password>");
                }
                Command::Password(rest.to_string())
            }
            "status" => Command::Status,
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command '{}' (try 'help')", other),
        };
        Ok(Some(command))
    }
}

fn split_word(s: &str) -> Option<(&str, &str)> {
    if s.is_empty() {
        return None;
    }
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim_start())),
        None => Some((s, "")),
    }
}
