//! Command-line and environment configuration.

use clap::{Parser, ValueEnum};
use spot_client::config::{DEFAULT_API_URL, DEFAULT_AUTH_URL};
use spot_client::SpotConfig;

use crate::policy::AccessPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "spot-mcp",
    version,
    about = "MCP server exposing the Rackspace Spot API over stdio"
)]
pub struct ServerArgs {
    /// Long-lived Spot refresh token.
    #[arg(long, env = "SPOT_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Restrict the server to read-only commands ("true" or "1").
    #[arg(
        long,
        env = "SPOT_READ_ONLY",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub read_only: Option<String>,

    #[arg(long, env = "SPOT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, env = "SPOT_AUTH_URL", default_value = DEFAULT_AUTH_URL)]
    pub auth_url: String,

    /// Connect timeout in seconds.
    #[arg(long, env = "SPOT_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Refresh access tokens this many seconds before they expire.
    #[arg(long, env = "SPOT_TOKEN_SAFETY_MARGIN_SECS", default_value_t = 60)]
    pub token_safety_margin_secs: u64,

    /// Log output format (logs go to stderr).
    #[arg(long, env = "SPOT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ServerArgs {
    /// Client configuration and access policy.
    pub fn resolve(&self) -> (SpotConfig, AccessPolicy) {
        let mut config = SpotConfig::default()
            .with_api_url(self.api_url.clone())
            .with_auth_url(self.auth_url.clone())
            .with_timeout_secs(self.timeout_secs)
            .with_token_safety_margin_secs(self.token_safety_margin_secs);
        if let Some(token) = self.refresh_token.as_deref().map(str::trim) {
            if !token.is_empty() {
                config = config.with_refresh_token(token);
            }
        }
        let policy = AccessPolicy::from_read_only_flag(self.read_only.as_deref());
        (config, policy)
    }
}
