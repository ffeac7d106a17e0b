//! Inventory chat bot: command routing, handlers, and the Bot API
//! long-poll loop on top of the inventory and sheets crates.

pub mod config;
pub mod exit_codes;
pub mod handlers;
pub mod poller;
pub mod reply;
pub mod router;
pub mod telegram;

pub use config::{Cli, Config};
pub use poller::Poller;
pub use reply::{Button, Reply};
pub use router::CommandRouter;
pub use telegram::TelegramClient;

/// A startup failure and the exit code it maps to.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn error(msg: impl Into<String>) -> Self {
        Self { code: exit_codes::EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: exit_codes::EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn bot_auth(msg: impl Into<String>) -> Self {
        Self { code: exit_codes::EXIT_BOT_AUTH, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}
