//! Client configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SpotError, SpotResult};
use crate::types::RefreshToken;

/// Default base URL of the resource API.
pub const DEFAULT_API_URL: &str = "https://spot.rackspace.com/apis";

/// Default base URL of the authentication service.
pub const DEFAULT_AUTH_URL: &str = "https://login.spot.rackspace.com";

/// Public OAuth client identifier used for the refresh-token grant.
pub const DEFAULT_CLIENT_ID: &str = "mwG3lUMV8KyeMqHe4fJ5Bb3nM1vBvRNa";

/// Spot client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotConfig {
    /// Base URL for resource calls.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL for the token exchange.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// OAuth client id sent with the refresh-token grant.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Long-lived credential.
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<RefreshToken>,

    /// Connect timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// A cached access token is treated as stale this many seconds
    /// before its reported expiry.
    #[serde(default = "default_safety_margin")]
    pub token_safety_margin_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_safety_margin() -> u64 {
    60
}

impl Default for SpotConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            auth_url: default_auth_url(),
            client_id: default_client_id(),
            refresh_token: None,
            timeout_secs: default_timeout(),
            token_safety_margin_secs: default_safety_margin(),
        }
    }
}

impl SpotConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SPOT_REFRESH_TOKEN` | Long-lived refresh token |
    /// | `SPOT_API_URL` | Resource API base URL |
    /// | `SPOT_AUTH_URL` | Authentication base URL |
    /// | `SPOT_TIMEOUT_SECS` | Connect timeout in seconds |
    /// | `SPOT_TOKEN_SAFETY_MARGIN_SECS` | Token expiry safety margin |
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("SPOT_API_URL").unwrap_or_else(|_| default_api_url()),
            auth_url: std::env::var("SPOT_AUTH_URL").unwrap_or_else(|_| default_auth_url()),
            client_id: default_client_id(),
            refresh_token: std::env::var("SPOT_REFRESH_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(RefreshToken::new),
            timeout_secs: std::env::var("SPOT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            token_safety_margin_secs: std::env::var("SPOT_TOKEN_SAFETY_MARGIN_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_safety_margin),
        }
    }

    /// Set the refresh token.
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(RefreshToken::new(token));
        self
    }

    /// Set the resource API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the authentication base URL.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Set the connect timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the token expiry safety margin.
    pub fn with_token_safety_margin_secs(mut self, secs: u64) -> Self {
        self.token_safety_margin_secs = secs;
        self
    }

    /// Check that everything needed at startup is present and well-formed.
    pub fn validate(&self) -> SpotResult<()> {
        match &self.refresh_token {
            Some(token) if !token.expose().trim().is_empty() => {}
            _ => {
                return Err(SpotError::Config {
                    message: "refresh token is required (set SPOT_REFRESH_TOKEN)".into(),
                })
            }
        }
        parse_base_url("api_url", &self.api_url)?;
        parse_base_url("auth_url", &self.auth_url)?;
        Ok(())
    }

    /// Token endpoint derived from `auth_url`.
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.auth_url.trim_end_matches('/'))
    }
}

fn parse_base_url(field: &str, value: &str) -> SpotResult<Url> {
    let url = Url::parse(value).map_err(|e| SpotError::Config {
        message: format!("invalid {field} '{value}': {e}"),
    })?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(SpotError::Config {
            message: format!("invalid {field} '{value}': unsupported scheme '{other}'"),
        }),
    }
}
