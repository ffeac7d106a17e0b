//! Quantity threshold filter.
//!
//! A threshold is a single token: `<N` keeps rows with quantity below N,
//! a bare `N` keeps rows with quantity at least N. Rows whose quantity is
//! not a whole number never match either way; they are skipped, not
//! reported.

use std::fmt;

use crate::record::{parse_integer, Record};

/// Rows narrower than this are not inventory rows.
pub const MIN_FIELDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessThan,
    AtLeast,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::AtLeast => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub comparison: Comparison,
    pub value: i64,
}

impl Threshold {
    pub fn less_than(value: i64) -> Self {
        Self { comparison: Comparison::LessThan, value }
    }

    pub fn at_least(value: i64) -> Self {
        Self { comparison: Comparison::AtLeast, value }
    }

    pub fn matches(&self, quantity: i64) -> bool {
        match self.comparison {
            Comparison::LessThan => quantity < self.value,
            Comparison::AtLeast => quantity >= self.value,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.comparison.symbol(), self.value)
    }
}

/// Why a threshold token was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdError {
    /// `<` followed by something that is not a whole number
    InvalidAfterSign(String),
    /// Bare token that is not a whole number
    InvalidNumber(String),
}

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdError::InvalidAfterSign(raw) => {
                write!(f, "invalid number after '<' in threshold {:?}", raw)
            }
            ThresholdError::InvalidNumber(raw) => {
                write!(f, "invalid threshold {:?}", raw)
            }
        }
    }
}

impl std::error::Error for ThresholdError {}

/// Parse `<N` or `N`.
pub fn parse_threshold(token: &str) -> Result<Threshold, ThresholdError> {
    if let Some(rest) = token.strip_prefix('<') {
        return parse_integer(rest)
            .map(Threshold::less_than)
            .ok_or_else(|| ThresholdError::InvalidAfterSign(token.to_string()));
    }

    parse_integer(token)
        .map(Threshold::at_least)
        .ok_or_else(|| ThresholdError::InvalidNumber(token.to_string()))
}

/// Rows whose quantity satisfies `threshold`, in sheet order.
pub fn filter_by_quantity<'a>(records: &'a [Record], threshold: &Threshold) -> Vec<&'a Record> {
    let matched: Vec<&Record> = records
        .iter()
        .filter(|r| r.len() >= MIN_FIELDS)
        .filter(|r| match r.quantity_value() {
            Some(q) => threshold.matches(q),
            None => false,
        })
        .collect();

    log::debug!(
        "quantity filter {}: {} of {} rows",
        threshold,
        matched.len(),
        records.len(),
    );
    matched
}
