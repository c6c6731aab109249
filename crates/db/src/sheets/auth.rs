//! Service-account access tokens (OAuth2 JWT-bearer grant).
//!
//! An RS256 assertion is signed with the service account's private key and
//! exchanged at the key's `token_uri` for a short-lived bearer token. The
//! token is cached until shortly before it expires.

use std::path::Path;
use std::time::{Duration, Instant};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::DbError;

/// OAuth scope granting read/write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Default token endpoint when the key file omits `token_uri`.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for each assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh the cached token this long before it actually expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The fields we need from a service-account key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Read and parse a key file.
    pub async fn from_file(path: &Path) -> Result<Self, DbError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DbError::Credentials(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| DbError::Credentials(format!("{}: {e}", path.display())))
    }
}

/// Claims of the signed assertion.
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Hands out bearer tokens for one service account.
pub struct TokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self, DbError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| DbError::Credentials(format!("invalid private key: {e}")))?;
        Ok(Self {
            key,
            encoding_key,
            client,
            cached: Mutex::new(None),
        })
    }

    /// A valid bearer token, fetching a new one if the cached one is stale.
    pub async fn access_token(&self) -> Result<String, DbError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let response = self.fetch().await?;
        let expires_in = if response.expires_in == 0 {
            ASSERTION_LIFETIME_SECS as u64
        } else {
            response.expires_in
        };
        let token = response.access_token;
        *cached = Some(CachedToken {
            access_token: token.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        });
        tracing::debug!(expires_in, "Obtained spreadsheet access token");
        Ok(token)
    }

    fn assertion(&self) -> Result<String, DbError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| DbError::Auth(format!("failed to sign assertion: {e}")))
    }

    async fn fetch(&self) -> Result<TokenResponse, DbError> {
        let assertion = self.assertion()?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DbError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| DbError::Auth(format!("unreadable token response: {e}")))
    }
}
