//! Telegram Bot API client.
//!
//! Blocking reqwest client (no Tokio runtime required). Covers the
//! handful of methods a long-polling bot needs. The bot token is part of
//! every request path, so transport errors are stripped of their URL
//! before they reach a log line.

use std::fmt;
use std::time::Duration;

use reqwest::blocking::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::reply::{split_message, Button, Reply, MAX_MESSAGE_CHARS};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const HTTP_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum TelegramError {
    /// Network error
    Network(String),
    /// The API answered `ok: false`
    Api { code: u16, description: String },
    /// JSON parsing error
    Parse(String),
}

impl fmt::Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelegramError::Network(msg) => write!(f, "Network error: {}", msg),
            TelegramError::Api { code, description } => {
                write!(f, "Bot API error {}: {}", code, description)
            }
            TelegramError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for TelegramError {}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Network(e.without_url().to_string())
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// An inline button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// The message carrying the button; absent when too old.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

// ── Client ──────────────────────────────────────────────────────────

/// Bot API client (blocking).
pub struct TelegramClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    /// `poll_timeout` is the longest `get_updates` will be asked to wait;
    /// the HTTP timeout sits a little above it.
    pub fn new(api_base: &str, token: &str, poll_timeout: Duration) -> Result<Self, TelegramError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("stockbot/", env!("CARGO_PKG_VERSION")))
            .timeout(poll_timeout + HTTP_GRACE)
            .build()
            .map_err(|e| TelegramError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, TelegramError> {
        let resp = self.http.post(self.method_url(method)).json(body).send()?;
        read_response(resp)
    }

    /// Validate the token and return the bot's own account.
    pub fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &json!({}))
    }

    /// Polling and webhooks are mutually exclusive.
    pub fn delete_webhook(&self) -> Result<(), TelegramError> {
        let _: bool = self.call("deleteWebhook", &json!({}))?;
        Ok(())
    }

    /// Long-poll for updates with `update_id >= offset`.
    pub fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout.as_secs(),
                "allowed_updates": ["message", "callback_query"],
            }),
        )
    }

    pub fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &[Vec<Button>],
    ) -> Result<Message, TelegramError> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if !keyboard.is_empty() {
            body["reply_markup"] = inline_keyboard(keyboard);
        }
        self.call("sendMessage", &body)
    }

    /// Upload a PNG as a photo message.
    pub fn send_photo(
        &self,
        chat_id: i64,
        png: Vec<u8>,
        file_name: &str,
    ) -> Result<Message, TelegramError> {
        let part = multipart::Part::bytes(png)
            .file_name(file_name.to_string())
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", part);

        let resp = self.http.post(self.method_url("sendPhoto")).multipart(form).send()?;
        read_response(resp)
    }

    /// Stop the client's spinner on a pressed button.
    pub fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let _: bool = self.call(
            "answerCallbackQuery",
            &json!({ "callback_query_id": callback_query_id }),
        )?;
        Ok(())
    }

    /// Send one handler reply. Long text goes out as several messages;
    /// the keyboard rides on the last one.
    pub fn send_reply(&self, chat_id: i64, reply: Reply) -> Result<(), TelegramError> {
        match reply {
            Reply::Text { text, keyboard } => {
                let pieces = split_message(&text, MAX_MESSAGE_CHARS);
                let last = pieces.len().saturating_sub(1);
                for (i, piece) in pieces.iter().enumerate() {
                    let buttons: &[Vec<Button>] = if i == last { &keyboard } else { &[] };
                    self.send_message(chat_id, piece, buttons)?;
                }
                Ok(())
            }
            Reply::Photo { png, file_name } => {
                self.send_photo(chat_id, png, &file_name)?;
                Ok(())
            }
        }
    }
}

fn inline_keyboard(rows: &[Vec<Button>]) -> Value {
    let rows: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.callback_data }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// The API reports failures as `ok: false` bodies, usually with a 4xx
/// status. Read the envelope first and fall back to the status.
fn read_response<T: DeserializeOwned>(
    resp: reqwest::blocking::Response,
) -> Result<T, TelegramError> {
    let status = resp.status();
    let body = resp.text()?;

    let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => {
            return Err(TelegramError::Parse(format!("invalid response: {}", e)));
        }
        Err(_) => {
            return Err(TelegramError::Api {
                code: status.as_u16(),
                description: truncate(&body, 200),
            });
        }
    };

    if !envelope.ok {
        return Err(TelegramError::Api {
            code: envelope.error_code.unwrap_or(status.as_u16()),
            description: envelope.description.unwrap_or_else(|| "no description".into()),
        });
    }

    envelope
        .result
        .ok_or_else(|| TelegramError::Parse("response has no result".into()))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
