use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stockbot::exit_codes::EXIT_SUCCESS;
use stockbot::telegram::TelegramError;
use stockbot::{Cli, CliError, CommandRouter, Config, Poller, TelegramClient};
use stockbot_sheets::SheetClient;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            log::error!("{}", message);
            if let Some(hint) = hint {
                log::error!("hint: {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_cli(cli)?;
    log::info!(
        "spreadsheet {} (worksheet: {}), credentials from {}",
        config.sheet.spreadsheet_id,
        config.sheet.worksheet.as_deref().unwrap_or("first"),
        config.sheet.credentials,
    );

    let sheets = SheetClient::new(config.sheet.clone())
        .map_err(|e| CliError::error(format!("spreadsheet client: {}", e)))?;

    let client = TelegramClient::new(&config.api_base, &config.bot_token, config.poll_timeout)
        .map_err(|e| CliError::error(format!("bot client: {}", e)))?;

    let me = client.get_me().map_err(|e| match e {
        TelegramError::Api { .. } => CliError::bot_auth(format!("bot token rejected: {}", e))
            .with_hint("check TELEGRAM_BOT_TOKEN"),
        other => CliError::error(format!("cannot reach the Bot API: {}", other)),
    })?;
    log::info!(
        "running as @{} (id {})",
        me.username.as_deref().unwrap_or(&me.first_name),
        me.id
    );

    if let Err(e) = client.delete_webhook() {
        log::warn!("deleteWebhook failed: {}", e);
    }

    let router = CommandRouter::with_default_commands().with_bot_username(me.username);
    log::info!("commands: {}", router.commands().join(", "));

    Poller::new(client, router, sheets, config.poll_timeout).run()
}
