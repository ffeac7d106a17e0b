//! Inventory record: one row of the remote sheet, keyed by header.
//!
//! Values are kept as the sheet formatted them. Numeric interpretation
//! happens at the point of use (see [`Record::quantity_value`]), so a
//! row with `Quantity = "n/a"` is still a valid record.

/// Header of the item code column.
pub const CODE: &str = "Code";
/// Header of the item name column.
pub const ITEM: &str = "Item";
/// Header of the quantity column.
pub const QUANTITY: &str = "Quantity";

/// One sheet row as an ordered header → value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(header, value)` pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.insert(key, value);
        }
        record
    }

    /// Set a field, replacing any existing value under the same header.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in header order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Code` column, empty when absent.
    pub fn code(&self) -> &str {
        self.get(CODE).unwrap_or("")
    }

    /// `Item` column, empty when absent.
    pub fn item(&self) -> &str {
        self.get(ITEM).unwrap_or("")
    }

    /// `Quantity` column as written in the sheet, empty when absent.
    pub fn quantity(&self) -> &str {
        self.get(QUANTITY).unwrap_or("")
    }

    /// `Quantity` as an integer. None for blanks, decimals, and text.
    pub fn quantity_value(&self) -> Option<i64> {
        parse_integer(self.quantity())
    }

    /// `Code: <code> | Item: <item> | Quantity: <quantity>`
    pub fn table_line(&self) -> String {
        format!(
            "Code: {} | Item: {} | Quantity: {}",
            self.code(),
            self.item(),
            self.quantity(),
        )
    }
}

/// Parse a whole-number string, tolerating surrounding whitespace and a
/// leading sign.
pub fn parse_integer(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}
