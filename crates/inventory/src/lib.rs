//! Inventory rows and the three read-only views the bot serves over
//! them: quantity threshold filter, fuzzy item search, table pages.
//!
//! No I/O beyond PNG encoding into memory. Rows come from the sheets
//! crate; nothing here is cached between requests.

pub mod filter;
pub mod record;
pub mod render;
pub mod search;

pub use filter::{filter_by_quantity, parse_threshold, Comparison, Threshold, ThresholdError};
pub use record::Record;
pub use render::{render_pages, RenderError, RenderedPage, ROWS_PER_PAGE};
pub use search::{partial_ratio, search, Match, MATCH_THRESHOLD};
