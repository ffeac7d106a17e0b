//! Startup configuration: flags with environment fallbacks.
//!
//! Every setting can come from a flag or its environment variable (flag
//! wins). A `.env` file is loaded into the environment before parsing.
//! Missing required settings are fatal: the bot never starts polling.

use std::time::Duration;

use clap::Parser;
use stockbot_sheets::{CredentialSource, SheetConfig};

use crate::exit_codes;
use crate::telegram::TELEGRAM_API_BASE;
use crate::CliError;

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CREDENTIALS: &str = "GOOGLE_SHEET_CREDENTIALS";
pub const ENV_SHEET_ID: &str = "GOOGLE_SHEET_ID";

/// Inventory spreadsheet chat bot.
#[derive(Parser, Debug, Clone)]
#[command(name = "stockbot", about = "Inventory spreadsheet chat bot", version)]
#[command(after_help = "\
Examples:
  stockbot --bot-token 123:abc --credentials ~/keys/reader.json --sheet-id 1AbC...
  TELEGRAM_BOT_TOKEN=123:abc GOOGLE_SHEET_CREDENTIALS=/run/secrets/sa.json GOOGLE_SHEET_ID=1AbC... stockbot
  RUST_LOG=debug stockbot")]
pub struct Cli {
    /// Bot API token
    #[arg(long, env = ENV_BOT_TOKEN, hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Service account key: path to the JSON key file, or the JSON itself
    #[arg(long, env = ENV_CREDENTIALS, hide_env_values = true)]
    pub credentials: Option<String>,

    /// Spreadsheet ID (the long token in the sheet URL)
    #[arg(long, env = ENV_SHEET_ID)]
    pub sheet_id: Option<String>,

    /// Worksheet title (default: first worksheet)
    #[arg(long, env = "GOOGLE_SHEET_WORKSHEET")]
    pub worksheet: Option<String>,

    /// Bot API base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = TELEGRAM_API_BASE)]
    pub api_base: String,

    /// Long-poll timeout in seconds
    #[arg(long, env = "POLL_TIMEOUT_SECS", default_value_t = 30)]
    pub poll_timeout: u64,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub api_base: String,
    pub poll_timeout: Duration,
    pub sheet: SheetConfig,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, CliError> {
        let bot_token = require(cli.bot_token, "bot token", "--bot-token", ENV_BOT_TOKEN)?;
        let credentials = require(
            cli.credentials,
            "spreadsheet credentials",
            "--credentials",
            ENV_CREDENTIALS,
        )?;
        let spreadsheet_id = require(cli.sheet_id, "spreadsheet ID", "--sheet-id", ENV_SHEET_ID)?;

        let worksheet = cli
            .worksheet
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());

        if cli.poll_timeout == 0 {
            return Err(CliError::usage("poll timeout must be at least 1 second")
                .with_hint("omit --poll-timeout to use the default of 30"));
        }

        Ok(Self {
            bot_token,
            api_base: cli.api_base.trim().trim_end_matches('/').to_string(),
            poll_timeout: Duration::from_secs(cli.poll_timeout),
            sheet: SheetConfig {
                credentials: CredentialSource::parse(&credentials),
                spreadsheet_id,
                worksheet,
            },
        })
    }
}

/// Trimmed value, or the startup error naming where to set it.
fn require(
    value: Option<String>,
    what: &str,
    flag: &str,
    env_var: &str,
) -> Result<String, CliError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CliError {
            code: exit_codes::EXIT_CONFIG_MISSING,
            message: format!("missing {} (use {} or set {})", what, flag, env_var),
            hint: None,
        }),
    }
}
