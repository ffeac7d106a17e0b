//! Service account credentials and the signed JWT assertion exchanged
//! for an access token.
//!
//! The credential source is either a path to the JSON key file or the
//! JSON itself (handy for container secrets). It is read on every fetch,
//! so a rotated key file is picked up without a restart.

use std::fmt;
use std::path::PathBuf;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::client::SheetError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read-only access to the spreadsheet and the drive file backing it.
pub const SCOPES: &str = "https://www.googleapis.com/auth/drive.readonly \
https://www.googleapis.com/auth/spreadsheets.readonly";

/// Assertion lifetime in seconds (the maximum the token endpoint accepts).
const ASSERTION_TTL_SECS: i64 = 3600;

/// The fields of a service account key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Where the key JSON comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Inline(String),
}

impl CredentialSource {
    /// A value starting with `{` is inline JSON, anything else a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            CredentialSource::Inline(trimmed.to_string())
        } else {
            CredentialSource::File(PathBuf::from(trimmed))
        }
    }

    pub fn load(&self) -> Result<ServiceAccountKey, SheetError> {
        match self {
            CredentialSource::Inline(json) => serde_json::from_str(json).map_err(|e| {
                SheetError::Credentials(format!("invalid inline credentials JSON: {}", e))
            }),
            CredentialSource::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    SheetError::Credentials(format!(
                        "cannot read credentials file {}: {}",
                        path.display(),
                        e,
                    ))
                })?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Ok(meta) = std::fs::metadata(path) {
                        let mode = meta.permissions().mode();
                        if mode & 0o077 != 0 {
                            log::warn!(
                                "credentials file {} is accessible by others (mode {:o}), consider chmod 600",
                                path.display(),
                                mode & 0o777,
                            );
                        }
                    }
                }

                serde_json::from_str(&content).map_err(|e| {
                    SheetError::Credentials(format!(
                        "invalid credentials JSON in {}: {}",
                        path.display(),
                        e,
                    ))
                })
            }
        }
    }
}

// Inline JSON holds a private key; keep it out of logs.
impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::File(path) => f.debug_tuple("File").field(path).finish(),
            CredentialSource::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::File(path) => write!(f, "file {}", path.display()),
            CredentialSource::Inline(_) => f.write_str("inline JSON"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign the RS256 bearer assertion for `key`, issued at `now` (unix secs).
pub(crate) fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, SheetError> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: SCOPES.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_TTL_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SheetError::Credentials(format!("invalid private key: {}", e)))?;

    jsonwebtoken::encode(&header, &claims, &signing_key)
        .map_err(|e| SheetError::Auth(format!("failed to sign assertion: {}", e)))
}
