//! MCP server for the Rackspace Spot API.
//!
//! Exposes the Spot command catalog to an agent over JSON-RPC on stdio.
//! Each command declares whether it reads or mutates state; in read-only
//! mode mutating commands are neither listed nor executable.
//!
//! # Configuration
//!
//! | Environment Variable | Flag | Description |
//! |---------------------|------|-------------|
//! | `SPOT_REFRESH_TOKEN` | `--refresh-token` | Refresh token (required) |
//! | `SPOT_READ_ONLY` | `--read-only` | `true` or `1` restricts to read commands |
//! | `SPOT_API_URL` | `--api-url` | Resource API base URL |
//! | `SPOT_AUTH_URL` | `--auth-url` | Authentication base URL |
//! | `SPOT_TIMEOUT_SECS` | `--timeout-secs` | Connect timeout |
//! | `SPOT_TOKEN_SAFETY_MARGIN_SECS` | `--token-safety-margin-secs` | Token expiry margin |
//! | `SPOT_LOG_FORMAT` | `--log-format` | `text` or `json`, written to stderr |

pub mod config;
pub mod error;
pub mod executor;
pub mod jsonrpc;
pub mod logging;
pub mod policy;
pub mod registry;
pub mod server;
pub mod tools;

use anyhow::{Context, Result};
use spot_client::{SpotClient, SpotConfig};

pub use config::{LogFormat, ServerArgs};
pub use error::{CommandError, READ_ONLY_REFUSAL};
pub use executor::{CommandExecutor, CommandResult};
pub use policy::{AccessGate, AccessPolicy, Capability};
pub use registry::{handler_fn, CommandDefinition, CommandHandler, CommandInfo, CommandRegistry};
pub use server::McpServer;

/// Build a server with the full catalog bound to a new client.
pub fn build_server(config: SpotConfig, policy: AccessPolicy) -> Result<McpServer> {
    let client = SpotClient::new(config).context("invalid Spot configuration")?;
    let registry = tools::catalog(&client).context("failed to build command catalog")?;

    tracing::info!(
        policy = policy.as_str(),
        commands = registry.len(),
        mutating = registry.count(Capability::Mutate),
        api_url = client.api_url(),
        "spot-mcp ready"
    );
    Ok(McpServer::new(registry, policy))
}
