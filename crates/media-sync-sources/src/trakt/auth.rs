use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::SourceError;

pub const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const TOKEN_URL: &str = "https://api.trakt.tv/oauth/token";
const AUTHORIZE_URL: &str = "https://trakt.tv/oauth/authorize";

/// Seconds shaved off the reported lifetime so a token is refreshed before it lapses.
const EXPIRY_MARGIN_SECS: i64 = 120;

pub fn create_trakt_client() -> Result<Client, SourceError> {
    Client::builder()
        .user_agent(concat!("reelsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {}", e)))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenInfo {
    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: now + Duration::seconds(response.expires_in as i64 - EXPIRY_MARGIN_SECS),
        }
    }
}

/// URL the user opens to obtain an out-of-band authorization code.
pub fn authorization_url(client_id: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(REDIRECT_URI)
    )
}

async fn request_token(client: &Client, payload: serde_json::Value, context: &str) -> Result<TokenInfo, SourceError> {
    let response = client
        .post(TOKEN_URL)
        .json(&payload)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| SourceError::Network(format!("{}: {}", context, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "{} failed", context);
        return Err(SourceError::Authentication(format!("{}: {} {}", context, status, body.trim())));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| SourceError::MalformedResponse(format!("{}: {}", context, e)))?;
    Ok(TokenInfo::from_response(token, Utc::now()))
}

pub async fn refresh_access_token(
    client: &Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenInfo, SourceError> {
    let payload = serde_json::json!({
        "refresh_token": refresh_token,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "refresh_token"
    });
    let token = request_token(client, payload, "Trakt token refresh").await?;
    info!(operation = "trakt_token_refresh", expires_at = %token.expires_at, "Refreshed Trakt access token");
    Ok(token)
}

/// Trade an authorization code from [`authorization_url`] for tokens.
pub async fn exchange_code(
    client: &Client,
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> Result<TokenInfo, SourceError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(SourceError::Config("authorization code cannot be empty".to_string()));
    }
    let payload = serde_json::json!({
        "code": code,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "authorization_code"
    });
    request_token(client, payload, "Trakt code exchange").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_authorization_url_encodes_redirect() {
        let url = authorization_url("abc123");
        assert!(url.starts_with("https://trakt.tv/oauth/authorize?response_type=code&client_id=abc123"));
        assert!(url.contains("redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"));
    }

    #[test]
    fn test_expiry_margin() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let token = TokenInfo::from_response(
            TokenResponse {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
                expires_in: 7_776_000,
            },
            now,
        );
        assert_eq!(token.expires_at, now + Duration::seconds(7_776_000 - 120));
    }
}
