//! Creates a valid Google session (access token) that we can use to call the gcal API
//!
//! A session is acquired once per cycle and never written to disk.
//!
//! When the token endpoint returns an ID token (the grant included the
//! `openid email` scopes) its email must be the configured account. Without
//! one, nothing ties the refresh token to `account`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use calsync_core::{SyncError, SyncResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Scope the refresh token must have been granted.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth credentials for the account whose calendar is written to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleCredentials {
    /// Account the credentials act on behalf of.
    pub account: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub refresh_token: Option<String>,
    /// Pre-issued token, used as-is instead of a refresh.
    pub access_token: Option<String>,
}

pub struct Session {
    account: String,
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct IdClaims {
    email: Option<String>,
}

/// Email claim of an ID token. The token comes straight from the token
/// endpoint over TLS, so the signature is not checked.
fn id_token_email(id_token: &str) -> SyncResult<Option<String>> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| SyncError::Auth("Malformed ID token".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SyncError::Auth(format!("Malformed ID token: {}", e)))?;
    let claims: IdClaims = serde_json::from_slice(&bytes)
        .map_err(|e| SyncError::Auth(format!("Malformed ID token: {}", e)))?;
    Ok(claims.email)
}

impl Session {
    pub async fn acquire(
        http: &reqwest::Client,
        creds: &GoogleCredentials,
        token_url: &Url,
    ) -> SyncResult<Self> {
        if let Some(token) = creds.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Session {
                account: creds.account.clone(),
                access_token: token.to_string(),
                expires_at: None,
            });
        }

        let Some(refresh_token) = creds.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(SyncError::Auth(format!(
                "No refresh_token or access_token configured for {}",
                creds.account
            )));
        };

        Self::refresh(http, creds, refresh_token, token_url).await
    }

    async fn refresh(
        http: &reqwest::Client,
        creds: &GoogleCredentials,
        refresh_token: &str,
        token_url: &Url,
    ) -> SyncResult<Self> {
        let response = http
            .post(token_url.clone())
            .form(&[
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Auth(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::Auth(format!(
                "Token refresh failed for {} ({}): {}",
                creds.account, status, error_text
            )));
        }

        let refresh_data: RefreshResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("Failed to parse token response: {}", e)))?;

        if let Some(scope) = refresh_data.scope.as_deref() {
            if !scope.split_whitespace().any(|s| s == CALENDAR_SCOPE) {
                return Err(SyncError::Auth(format!(
                    "Token for {} was not granted {} (got: {})",
                    creds.account, CALENDAR_SCOPE, scope
                )));
            }
        }

        if let Some(id_token) = refresh_data.id_token.as_deref() {
            if let Some(email) = id_token_email(id_token)? {
                if !email.eq_ignore_ascii_case(&creds.account) {
                    return Err(SyncError::Auth(format!(
                        "Refresh token belongs to {}, not the configured account {}",
                        email, creds.account
                    )));
                }
            }
        }

        Ok(Session {
            account: creds.account.clone(),
            access_token: refresh_data.access_token,
            expires_at: refresh_data
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}
