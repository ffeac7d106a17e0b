//! Spreadsheet client: reads the inventory worksheet as records.
//!
//! Service-account auth, one worksheet, header row as field names.
//! No caching. No retries. Callers treat every error the same way.

mod client;
mod credentials;

pub use client::{rows_to_records, RecordSource, SheetClient, SheetConfig, SheetError, SHEETS_API_BASE};
pub use credentials::{CredentialSource, ServiceAccountKey, DEFAULT_TOKEN_URI, SCOPES};
