//! Command routing.
//!
//! The routing table is built once at startup and never changes. Text
//! that is not a registered command, or a command addressed to another
//! bot, routes nowhere and gets no reply.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use stockbot_sheets::RecordSource;

use crate::handlers::{self, Handler, HandlerError, Request};
use crate::reply::Reply;

/// A parsed `/name[@bot] arg arg ...` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Lowercased, without the slash.
    pub name: String,
    /// The `@bot` suffix, if any.
    pub mention: Option<String>,
    pub args: Vec<String>,
}

/// Parse a command message. None for anything that does not start
/// with `/` followed by a name.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut tokens = text.split_whitespace();
    let head = tokens.next()?.strip_prefix('/')?;

    let (name, mention) = match head.split_once('@') {
        Some((name, bot)) => (name, Some(bot.to_string())),
        None => (head, None),
    };
    if name.is_empty() {
        return None;
    }

    Some(Command {
        name: name.to_lowercase(),
        mention,
        args: tokens.map(String::from).collect(),
    })
}

pub struct CommandRouter {
    routes: HashMap<&'static str, Handler>,
    bot_username: Option<String>,
}

impl CommandRouter {
    /// An empty table.
    pub fn new() -> Self {
        Self { routes: HashMap::new(), bot_username: None }
    }

    /// The table the bot serves.
    pub fn with_default_commands() -> Self {
        let mut router = Self::new();
        router.register("start", handlers::start);
        router.register("help", handlers::help);
        router.register("search", handlers::search_items);
        router.register("check", handlers::check_items);
        router.register("screenshot", handlers::screenshot);
        router
    }

    /// Only answer `/cmd@name` when `name` is this bot.
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }

    pub fn register(&mut self, name: &'static str, handler: Handler) {
        self.routes.insert(name, handler);
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.routes.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Whether this message would route to a handler.
    pub fn route_for(&self, text: &str) -> Option<Command> {
        let command = parse_command(text)?;
        if !self.addressed_to_us(&command) || !self.routes.contains_key(command.name.as_str()) {
            return None;
        }
        Some(command)
    }

    /// Run the command in `text`. None when nothing should be sent.
    pub fn dispatch(&self, text: &str, source: &dyn RecordSource) -> Option<Vec<Reply>> {
        let command = self.route_for(text)?;
        self.invoke(&command.name, command.args, source)
    }

    /// Run the command named by an inline button, without arguments.
    pub fn dispatch_callback(&self, data: &str, source: &dyn RecordSource) -> Option<Vec<Reply>> {
        self.invoke(data.trim(), Vec::new(), source)
    }

    fn invoke(&self, name: &str, args: Vec<String>, source: &dyn RecordSource) -> Option<Vec<Reply>> {
        let handler = self.routes.get(name)?;
        let request = Request { args, source };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&request)))
            .unwrap_or_else(|payload| Err(HandlerError::Internal(panic_message(payload.as_ref()))));

        Some(match outcome {
            Ok(replies) => replies,
            Err(err) => vec![Reply::text(error_reply(name, &err))],
        })
    }

    fn addressed_to_us(&self, command: &Command) -> bool {
        match (&command.mention, &self.bot_username) {
            (None, _) => true,
            (Some(mention), Some(us)) => mention.eq_ignore_ascii_case(us),
            (Some(_), None) => true,
        }
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::with_default_commands()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// The one place handler failures become user text.
fn error_reply(command: &str, err: &HandlerError) -> String {
    match err {
        HandlerError::Usage(_) | HandlerError::Threshold(_) => {
            log::debug!("/{} rejected: {}", command, err);
        }
        HandlerError::DataUnavailable(_) => {
            log::warn!("/{} failed: {}", command, err);
        }
        HandlerError::Internal(_) => {
            log::error!("/{} failed: {}", command, err);
        }
    }
    err.user_message()
}
