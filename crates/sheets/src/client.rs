//! Spreadsheet HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Every fetch
//! authenticates from scratch: load key → sign assertion → exchange for
//! an access token → read the worksheet. Nothing is cached and nothing is
//! retried; the next command starts over.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use stockbot_inventory::Record;

use crate::credentials::{sign_assertion, CredentialSource};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
pub const USER_AGENT: &str = concat!("stockbot/", env!("CARGO_PKG_VERSION"));

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Anything that can produce the current inventory rows.
pub trait RecordSource {
    fn fetch_records(&self) -> Result<Vec<Record>, SheetError>;
}

/// Error type for spreadsheet access. Every variant means "the data is
/// unavailable for this request".
#[derive(Debug)]
pub enum SheetError {
    /// Key file missing, unreadable, or malformed
    Credentials(String),
    /// Token exchange rejected
    Auth(String),
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Response or sheet layout not understood
    Parse(String),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::Credentials(msg) => write!(f, "Credentials error: {}", msg),
            SheetError::Auth(msg) => write!(f, "Authentication failed: {}", msg),
            SheetError::Network(msg) => write!(f, "Network error: {}", msg),
            SheetError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            SheetError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for SheetError {}

/// Which spreadsheet to read and how to authenticate.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub credentials: CredentialSource,
    pub spreadsheet_id: String,
    /// Worksheet title; the first worksheet when None.
    pub worksheet: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Spreadsheet API client (blocking).
pub struct SheetClient {
    http: reqwest::blocking::Client,
    api_base: String,
    config: SheetConfig,
}

impl SheetClient {
    pub fn new(config: SheetConfig) -> Result<Self, SheetError> {
        Self::with_api_base(config, SHEETS_API_BASE.to_string())
    }

    pub fn with_api_base(config: SheetConfig, api_base: String) -> Result<Self, SheetError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SheetError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            config,
        })
    }

    /// Exchange a freshly signed assertion for an access token.
    fn access_token(&self) -> Result<String, SheetError> {
        let key = self.config.credentials.load()?;
        let assertion = sign_assertion(&key, chrono::Utc::now().timestamp())?;

        let resp = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| SheetError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
            let msg = body["error_description"]
                .as_str()
                .or_else(|| body["error"].as_str())
                .unwrap_or("token request rejected");
            return Err(SheetError::Auth(format!("{} ({})", msg, status)));
        }

        let token: TokenResponse = resp
            .json()
            .map_err(|e| SheetError::Parse(format!("invalid token response: {}", e)))?;
        Ok(token.access_token)
    }

    fn spreadsheet_url(&self, tail: &[&str]) -> Result<reqwest::Url, SheetError> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| SheetError::Parse(format!("invalid API base {:?}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::Parse(format!("invalid API base {:?}", self.api_base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.config.spreadsheet_id.as_str()])
            .extend(tail);
        Ok(url)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: reqwest::Url,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SheetError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .map_err(|e| SheetError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
            let msg = body["error"]["message"]
                .as_str()
                .unwrap_or("request failed")
                .to_string();
            return Err(SheetError::Http(status, msg));
        }

        resp.json::<T>()
            .map_err(|e| SheetError::Parse(e.to_string()))
    }

    /// Title of the first worksheet.
    fn first_worksheet(&self, token: &str) -> Result<String, SheetError> {
        let url = self.spreadsheet_url(&[])?;
        let meta: SpreadsheetMeta = self.get_json(url, token, &[("fields", "sheets.properties.title")])?;
        meta.sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| SheetError::Parse("spreadsheet has no worksheets".into()))
    }

    fn worksheet_values(&self, token: &str, title: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let range = a1_sheet_range(title);
        let url = self.spreadsheet_url(&["values", range.as_str()])?;
        let values: ValueRange = self.get_json(url, token, &[("majorDimension", "ROWS")])?;
        Ok(values
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}

impl RecordSource for SheetClient {
    fn fetch_records(&self) -> Result<Vec<Record>, SheetError> {
        let token = self.access_token()?;
        let title = match &self.config.worksheet {
            Some(title) => title.clone(),
            None => self.first_worksheet(&token)?,
        };

        let rows = self.worksheet_values(&token, &title)?;
        let records = rows_to_records(rows)?;
        log::info!("fetched {} rows from worksheet {:?}", records.len(), title);
        Ok(records)
    }
}

/// A1 range covering a whole worksheet: the quoted title.
fn a1_sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        other => other.to_string(),
    }
}

/// Turn a header row plus data rows into records.
///
/// Short rows are padded with empty strings, columns with an empty header
/// are dropped, and a repeated header is an error. An empty range yields
/// no records.
pub fn rows_to_records(rows: Vec<Vec<String>>) -> Result<Vec<Record>, SheetError> {
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
    for (i, name) in header.iter().enumerate() {
        if !name.is_empty() && header[..i].contains(name) {
            return Err(SheetError::Parse(format!(
                "header row is not unique: {:?} appears more than once",
                name
            )));
        }
    }

    let records = rows
        .map(|row| {
            let mut record = Record::new();
            for (i, name) in header.iter().enumerate() {
                if name.is_empty() {
                    continue;
                }
                let value = row.get(i).map(String::as_str).unwrap_or("");
                record.insert(name.as_str(), value);
            }
            record
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const TEST_KEY: &str = include_str!("../tests/fixtures/test_service_account_key.pem");

    fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn config_for(server: &MockServer, worksheet: Option<&str>) -> SheetConfig {
        let key = serde_json::json!({
            "client_email": "stock-reader@example.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
            "token_uri": server.url("/token"),
        });
        SheetConfig {
            credentials: CredentialSource::Inline(key.to_string()),
            spreadsheet_id: "sheet-123".into(),
            worksheet: worksheet.map(String::from),
        }
    }

    fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .header("content-type", "application/x-www-form-urlencoded");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "access_token": "ya29.test",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }));
        })
    }

    // ── rows_to_records ────────────────────────────────────────────

    #[test]
    fn test_rows_to_records() {
        let rows = strings(&[
            &["Code", "Item", "Quantity"],
            &["A1", "Blue Widget", "5"],
            &["A2", "Red Widget", "50"],
        ]);
        let records = rows_to_records(rows).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].code(), "A2");
        assert_eq!(records[1].quantity_value(), Some(50));
    }

    #[test]
    fn test_rows_to_records_pads_short_rows() {
        let rows = strings(&[&["Code", "Item", "Quantity"], &["A1"]]);
        let records = rows_to_records(rows).unwrap();
        assert_eq!(records[0].len(), 3);
        assert_eq!(records[0].item(), "");
        assert_eq!(records[0].quantity(), "");
    }

    #[test]
    fn test_rows_to_records_drops_unnamed_columns() {
        let rows = strings(&[&["Code", "", "Quantity"], &["A1", "stray", "4"]]);
        let records = rows_to_records(rows).unwrap();
        assert_eq!(records[0].len(), 2);
        assert_eq!(records[0].get(""), None);
    }

    #[test]
    fn test_rows_to_records_rejects_duplicate_headers() {
        let rows = strings(&[&["Code", "Item", "Code"], &["A1", "x", "A2"]]);
        let err = rows_to_records(rows).unwrap_err();
        assert!(matches!(err, SheetError::Parse(_)));
    }

    #[test]
    fn test_rows_to_records_empty_range() {
        assert!(rows_to_records(Vec::new()).unwrap().is_empty());
        assert!(rows_to_records(strings(&[&["Code", "Item"]])).unwrap().is_empty());
    }

    #[test]
    fn test_a1_sheet_range_quotes_title() {
        assert_eq!(a1_sheet_range("Sheet1"), "'Sheet1'");
        assert_eq!(a1_sheet_range("Bob's stock"), "'Bob''s stock'");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&serde_json::json!("5")), "5");
        assert_eq!(cell_text(&serde_json::json!(5)), "5");
        assert_eq!(cell_text(&serde_json::json!(true)), "TRUE");
        assert_eq!(cell_text(&serde_json::Value::Null), "");
    }

    // ── SheetClient ────────────────────────────────────────────────

    #[test]
    fn test_fetch_records_named_worksheet() {
        let server = MockServer::start();
        let token_mock = mock_token(&server);

        let values_mock = server.mock(|when, then| {
            when.method(GET)
                .path_includes("/v4/spreadsheets/sheet-123/values/")
                .header("Authorization", "Bearer ya29.test");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "range": "Inventory!A1:C3",
                    "majorDimension": "ROWS",
                    "values": [
                        ["Code", "Item", "Quantity"],
                        ["A1", "Blue Widget", "5"],
                        ["A2", "Red Widget", 50]
                    ]
                }));
        });

        let client = SheetClient::with_api_base(
            config_for(&server, Some("Inventory")),
            server.base_url(),
        )
        .unwrap();
        let records = client.fetch_records().unwrap();

        token_mock.assert();
        values_mock.assert();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item(), "Blue Widget");
        assert_eq!(records[1].quantity(), "50");
    }

    #[test]
    fn test_fetch_records_defaults_to_first_worksheet() {
        let server = MockServer::start();
        mock_token(&server);

        let meta_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v4/spreadsheets/sheet-123")
                .query_param("fields", "sheets.properties.title");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "sheets": [
                        { "properties": { "title": "Stock" } },
                        { "properties": { "title": "Archive" } }
                    ]
                }));
        });

        let values_mock = server.mock(|when, then| {
            when.method(GET).path_includes("/values/'Stock'");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "values": [["Code", "Item", "Quantity"], ["B7", "Bolt", "400"]]
                }));
        });

        let client = SheetClient::with_api_base(config_for(&server, None), server.base_url()).unwrap();
        let records = client.fetch_records().unwrap();

        meta_mock.assert();
        values_mock.assert();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code(), "B7");
    }

    #[test]
    fn test_fetch_records_token_rejected() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(400)
                .json_body(serde_json::json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid JWT Signature."
                }));
        });

        let client = SheetClient::with_api_base(
            config_for(&server, Some("Inventory")),
            server.base_url(),
        )
        .unwrap();
        let err = client.fetch_records().unwrap_err();

        assert!(matches!(err, SheetError::Auth(_)));
        assert!(err.to_string().contains("Invalid JWT Signature."));
    }

    #[test]
    fn test_fetch_records_permission_denied() {
        let server = MockServer::start();
        mock_token(&server);

        server.mock(|when, then| {
            when.method(GET).path_includes("/values/");
            then.status(403)
                .json_body(serde_json::json!({
                    "error": {
                        "code": 403,
                        "message": "The caller does not have permission",
                        "status": "PERMISSION_DENIED"
                    }
                }));
        });

        let client = SheetClient::with_api_base(
            config_for(&server, Some("Inventory")),
            server.base_url(),
        )
        .unwrap();
        match client.fetch_records().unwrap_err() {
            SheetError::Http(code, msg) => {
                assert_eq!(code, 403);
                assert_eq!(msg, "The caller does not have permission");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_records_unreachable_host() {
        let server = MockServer::start();
        mock_token(&server);

        // nothing listens on port 9 locally
        let client = SheetClient::with_api_base(
            config_for(&server, Some("Inventory")),
            "http://127.0.0.1:9".into(),
        )
        .unwrap();
        assert!(matches!(client.fetch_records().unwrap_err(), SheetError::Network(_)));
    }

    #[test]
    fn test_fetch_records_missing_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SheetConfig {
            credentials: CredentialSource::File(dir.path().join("key.json")),
            spreadsheet_id: "sheet-123".into(),
            worksheet: None,
        };
        let client = SheetClient::new(config).unwrap();
        assert!(matches!(client.fetch_records().unwrap_err(), SheetError::Credentials(_)));
    }
}
