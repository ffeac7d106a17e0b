//! Command handlers.
//!
//! Each handler takes the command arguments plus a record source and
//! returns the replies to send, or a [`HandlerError`] that the router
//! turns into a user-facing message. Handlers fetch fresh rows on every
//! call and keep nothing afterwards.

use std::fmt;

use stockbot_inventory::record::{CODE, ITEM, QUANTITY};
use stockbot_inventory::{
    filter_by_quantity, parse_threshold, render_pages, search, RenderError, ThresholdError,
};
use stockbot_sheets::{RecordSource, SheetError};

use crate::reply::{Button, Reply};

pub const WELCOME: &str = "Welcome! Choose a command to start:";

pub const HELP: &str = "Here are the available commands:\n\n\
/search <item_name> - Search for an item using fuzzy matching.\n\
/check <quantity> - Check for items based on quantity (e.g., /check <10).\n\
/screenshot - Get a screenshot of the current inventory.";

pub const SEARCH_USAGE: &str = "Please provide the item name you want to search for.";
pub const CHECK_USAGE: &str =
    "Please specify a quantity threshold (e.g., /check <20 or /check 30).";
pub const INVALID_AFTER_SIGN: &str = "Invalid number specified after the '<' sign.";
pub const INVALID_NUMBER: &str = "Invalid number provided.";
pub const DATA_UNAVAILABLE: &str = "Sorry, there was an issue accessing the data.";
pub const EMPTY_INVENTORY: &str = "No items found in the inventory.";

/// One invocation: whitespace-separated arguments and where rows come from.
pub struct Request<'a> {
    pub args: Vec<String>,
    pub source: &'a dyn RecordSource,
}

pub type Handler = fn(&Request<'_>) -> Result<Vec<Reply>, HandlerError>;

/// Why a command could not produce its normal reply.
#[derive(Debug)]
pub enum HandlerError {
    /// Missing argument; carries the prompt to show
    Usage(&'static str),
    /// Threshold argument not understood
    Threshold(ThresholdError),
    /// Spreadsheet could not be read
    DataUnavailable(SheetError),
    /// Anything else
    Internal(String),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Usage(prompt) => write!(f, "usage: {}", prompt),
            HandlerError::Threshold(e) => write!(f, "{}", e),
            HandlerError::DataUnavailable(e) => write!(f, "data unavailable: {}", e),
            HandlerError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<ThresholdError> for HandlerError {
    fn from(e: ThresholdError) -> Self {
        HandlerError::Threshold(e)
    }
}

impl From<SheetError> for HandlerError {
    fn from(e: SheetError) -> Self {
        HandlerError::DataUnavailable(e)
    }
}

impl From<RenderError> for HandlerError {
    fn from(e: RenderError) -> Self {
        HandlerError::Internal(e.to_string())
    }
}

impl HandlerError {
    /// The message the user sees for this failure.
    pub fn user_message(&self) -> String {
        match self {
            HandlerError::Usage(prompt) => prompt.to_string(),
            HandlerError::Threshold(ThresholdError::InvalidAfterSign(_)) => {
                INVALID_AFTER_SIGN.to_string()
            }
            HandlerError::Threshold(ThresholdError::InvalidNumber(_)) => INVALID_NUMBER.to_string(),
            HandlerError::DataUnavailable(_) => DATA_UNAVAILABLE.to_string(),
            HandlerError::Internal(msg) => format!("An error occurred: {}", msg),
        }
    }
}

// ── /start, /help ───────────────────────────────────────────────────

pub fn start(_req: &Request<'_>) -> Result<Vec<Reply>, HandlerError> {
    let keyboard = vec![
        vec![Button::new("Search Item", "search")],
        vec![Button::new("Check Items", "check")],
        vec![Button::new("Get Screenshot", "screenshot")],
    ];
    Ok(vec![Reply::text(WELCOME).with_keyboard(keyboard)])
}

pub fn help(_req: &Request<'_>) -> Result<Vec<Reply>, HandlerError> {
    Ok(vec![Reply::text(HELP)])
}

// ── /search ─────────────────────────────────────────────────────────

pub fn search_items(req: &Request<'_>) -> Result<Vec<Reply>, HandlerError> {
    let joined = req.args.join(" ");
    let query = joined.trim();
    if query.is_empty() {
        return Err(HandlerError::Usage(SEARCH_USAGE));
    }

    let records = req.source.fetch_records()?;
    let matches = search(&records, query);

    if matches.is_empty() {
        return Ok(vec![Reply::text(format!("No matches found for '{}'.", query))]);
    }

    let mut text = String::from("Here are the matching items:\n\n");
    for m in &matches {
        let field = |name: &str| m.record.get(name).unwrap_or("N/A").to_string();
        text.push_str(&format!(
            "Code: {} | Item: {} | Quantity: {}\n",
            field(CODE),
            field(ITEM),
            field(QUANTITY),
        ));
    }
    Ok(vec![Reply::text(text)])
}

// ── /check ──────────────────────────────────────────────────────────

pub fn check_items(req: &Request<'_>) -> Result<Vec<Reply>, HandlerError> {
    let Some(token) = req.args.first() else {
        return Err(HandlerError::Usage(CHECK_USAGE));
    };
    let threshold = parse_threshold(token)?;

    let records = req.source.fetch_records()?;
    let matched = filter_by_quantity(&records, &threshold);

    if matched.is_empty() {
        return Ok(vec![Reply::text(format!(
            "No items found matching condition {}.",
            threshold
        ))]);
    }

    let lines: Vec<String> = matched
        .iter()
        .map(|r| format!("Code: {}, Item: {}, Quantity: {}", r.code(), r.item(), r.quantity()))
        .collect();
    Ok(vec![Reply::text(format!(
        "Items matching condition {}:\n{}",
        threshold,
        lines.join("\n")
    ))])
}

// ── /screenshot ─────────────────────────────────────────────────────

pub fn screenshot(req: &Request<'_>) -> Result<Vec<Reply>, HandlerError> {
    let records = req.source.fetch_records()?;
    if records.is_empty() {
        return Ok(vec![Reply::text(EMPTY_INVENTORY)]);
    }

    let pages = render_pages(&records)?;
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| Reply::photo(page.png, format!("inventory-{}.png", i + 1)))
        .collect())
}
