//! Client for the Rackspace Spot infrastructure API.
//!
//! This crate provides:
//!
//! - A [`SessionManager`] that exchanges a long-lived refresh token for
//!   short-lived access tokens, caches them, and refreshes them lazily
//! - An authenticated request dispatcher ([`SpotClient::send`]) that attaches
//!   the bearer token to every endpoint outside a fixed auth-exempt set
//! - Path templating for namespaced and cluster-scoped resources
//! - Typed operations for organizations, regions, server classes, pricing,
//!   cloudspaces, node pools and kubeconfig generation
//!
//! # Quick Start
//!
//! ```no_run
//! use spot_client::{SpotClient, SpotConfig};
//!
//! # async fn example() -> Result<(), spot_client::SpotError> {
//! let client = SpotClient::new(SpotConfig::from_env())?;
//! let regions = client.list_regions().await?;
//! println!("{}", regions);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SPOT_REFRESH_TOKEN` | Refresh token (required) |
//! | `SPOT_API_URL` | Resource API base URL (default: `https://spot.rackspace.com/apis`) |
//! | `SPOT_AUTH_URL` | Auth base URL (default: `https://login.spot.rackspace.com`) |
//! | `SPOT_TIMEOUT_SECS` | Connect timeout in seconds (default: 30) |
//! | `SPOT_TOKEN_SAFETY_MARGIN_SECS` | Refresh this long before expiry (default: 60) |

pub mod client;
pub mod config;
pub mod error;
pub mod resource;
pub mod session;
pub mod types;

pub use client::{SpotClient, SPOT_USER_AGENT};
pub use config::SpotConfig;
pub use error::{SpotError, SpotResult};
pub use resource::{is_auth_exempt, Endpoint, ResourcePath, AUTH_EXEMPT_PATHS};
pub use session::{Session, SessionManager};
pub use types::{
    Autoscaling, CloudspaceSpec, NodePoolKind, NodePoolSpec, RefreshToken, CLOUDSPACE_LABEL,
};
