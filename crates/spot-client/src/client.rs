//! HTTP client for the Spot API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::SpotConfig;
use crate::error::{SpotError, SpotResult};
use crate::resource::{Endpoint, ResourcePath};
use crate::session::SessionManager;
use crate::types::{CloudspaceSpec, KubeconfigRequest, NodePoolKind, NodePoolSpec, NGPC_GROUP};

/// User agent for Spot API requests.
pub const SPOT_USER_AGENT: &str = concat!("spot-client/", env!("CARGO_PKG_VERSION"));

/// Spot API client.
///
/// Every call to a non-exempt endpoint carries a bearer token from the
/// shared [`SessionManager`]. Non-2xx responses surface as
/// [`SpotError::Transport`]; nothing is retried.
#[derive(Debug, Clone)]
pub struct SpotClient {
    /// HTTP client.
    http: reqwest::Client,

    /// Base URL for resource calls.
    api_url: String,

    /// Session shared by every clone of this client.
    session: SessionManager,
}

impl SpotClient {
    /// Create a new client.
    pub fn new(config: SpotConfig) -> SpotResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(SPOT_USER_AGENT));

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| SpotError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let session = SessionManager::new(http.clone(), &config)?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> SpotResult<Self> {
        Self::new(SpotConfig::from_env())
    }

    /// The session manager backing this client.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Get the base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Send a request, attaching a bearer token unless the endpoint is
    /// auth-exempt.
    pub async fn send(
        &self,
        endpoint: &Endpoint,
        method: Method,
        body: Option<&Value>,
    ) -> SpotResult<Value> {
        let url = format!("{}{}", self.api_url, endpoint.path);
        debug!(method = %method, path = %endpoint.path, "sending request");

        let mut request = self.http.request(method.clone(), &url);
        if !endpoint.query.is_empty() {
            request = request.query(&endpoint.query);
        }

        if !endpoint.is_auth_exempt() {
            let token = self.session.ensure_valid().await?;
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.map_err(|e| SpotError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            warn!(
                method = %method,
                path = %endpoint.path,
                status = status.as_u16(),
                "request failed"
            );
            return Err(SpotError::Transport {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(parse_body(text))
    }

    async fn get(&self, resource: &ResourcePath) -> SpotResult<Value> {
        self.send(&Endpoint::try_from(resource)?, Method::GET, None)
            .await
    }

    async fn delete(&self, resource: &ResourcePath) -> SpotResult<Value> {
        self.send(&Endpoint::try_from(resource)?, Method::DELETE, None)
            .await
    }

    async fn post(&self, resource: &ResourcePath, body: &Value) -> SpotResult<Value> {
        self.send(&Endpoint::try_from(resource)?, Method::POST, Some(body))
            .await
    }

    /// List organizations visible to the credential.
    pub async fn list_organizations(&self) -> SpotResult<Value> {
        self.get(&ResourcePath::organizations()).await
    }

    /// List regions.
    pub async fn list_regions(&self) -> SpotResult<Value> {
        self.get(&ResourcePath::cluster(NGPC_GROUP, "regions")).await
    }

    /// Get a region by name.
    pub async fn get_region(&self, name: &str) -> SpotResult<Value> {
        self.get(&ResourcePath::cluster(NGPC_GROUP, "regions").named(name))
            .await
    }

    /// List server classes.
    pub async fn list_server_classes(&self) -> SpotResult<Value> {
        self.get(&ResourcePath::cluster(NGPC_GROUP, "serverclasses"))
            .await
    }

    /// Get a server class by name.
    pub async fn get_server_class(&self, name: &str) -> SpotResult<Value> {
        self.get(&ResourcePath::cluster(NGPC_GROUP, "serverclasses").named(name))
            .await
    }

    /// Get the market price history of a server class.
    pub async fn get_price_history(&self, server_class: &str) -> SpotResult<Value> {
        self.get(&ResourcePath::cluster(NGPC_GROUP, "pricehistories").named(server_class))
            .await
    }

    /// List cloudspaces in a namespace.
    pub async fn list_cloudspaces(&self, namespace: &str) -> SpotResult<Value> {
        self.get(&cloudspaces(namespace)).await
    }

    /// Get a cloudspace.
    pub async fn get_cloudspace(&self, namespace: &str, name: &str) -> SpotResult<Value> {
        self.get(&cloudspaces(namespace).named(name)).await
    }

    /// Create a cloudspace.
    pub async fn create_cloudspace(
        &self,
        namespace: &str,
        spec: &CloudspaceSpec,
    ) -> SpotResult<Value> {
        self.post(&cloudspaces(namespace), &spec.to_manifest(namespace))
            .await
    }

    /// Delete a cloudspace.
    pub async fn delete_cloudspace(&self, namespace: &str, name: &str) -> SpotResult<Value> {
        self.delete(&cloudspaces(namespace).named(name)).await
    }

    /// List node pools, optionally only those owned by `cloudspace`.
    pub async fn list_node_pools(
        &self,
        kind: NodePoolKind,
        namespace: &str,
        cloudspace: Option<&str>,
    ) -> SpotResult<Value> {
        let mut resource = ResourcePath::namespaced(NGPC_GROUP, namespace, kind.resource());
        if let Some(cloudspace) = cloudspace {
            resource = resource.owned_by_cloudspace(cloudspace);
        }
        self.get(&resource).await
    }

    /// Get a node pool.
    pub async fn get_node_pool(
        &self,
        kind: NodePoolKind,
        namespace: &str,
        name: &str,
    ) -> SpotResult<Value> {
        self.get(&ResourcePath::namespaced(NGPC_GROUP, namespace, kind.resource()).named(name))
            .await
    }

    /// Create a node pool.
    pub async fn create_node_pool(
        &self,
        kind: NodePoolKind,
        namespace: &str,
        spec: &NodePoolSpec,
    ) -> SpotResult<Value> {
        let name = spec.resolved_name();
        let manifest = spec.to_manifest(kind, namespace, &name);
        self.post(
            &ResourcePath::namespaced(NGPC_GROUP, namespace, kind.resource()),
            &manifest,
        )
        .await
    }

    /// Delete a node pool.
    pub async fn delete_node_pool(
        &self,
        kind: NodePoolKind,
        namespace: &str,
        name: &str,
    ) -> SpotResult<Value> {
        self.delete(&ResourcePath::namespaced(NGPC_GROUP, namespace, kind.resource()).named(name))
            .await
    }

    /// Generate a kubeconfig for a cloudspace.
    ///
    /// The request body carries the refresh token itself, so no bearer
    /// token is attached.
    pub async fn generate_kubeconfig(
        &self,
        organization: &str,
        cloudspace: &str,
    ) -> SpotResult<Value> {
        let body = serde_json::to_value(KubeconfigRequest {
            organization_name: organization,
            cloudspace_name: cloudspace,
            refresh_token: self.session.refresh_token().expose(),
        })
        .map_err(|e| SpotError::InvalidResponse {
            message: format!("failed to encode kubeconfig request: {}", e),
        })?;

        self.send(&Endpoint::kubeconfig(), Method::POST, Some(&body))
            .await
    }
}

fn cloudspaces(namespace: &str) -> ResourcePath {
    ResourcePath::namespaced(NGPC_GROUP, namespace, "cloudspaces")
}

/// Empty bodies become `null`, non-JSON bodies a JSON string.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_body_handles_empty_and_plain_text() {
        assert_eq!(parse_body(String::new()), Value::Null);
        assert_eq!(parse_body("  \n".into()), Value::Null);
        assert_eq!(
            parse_body("{\"items\":[]}".into()),
            serde_json::json!({"items": []})
        );
        assert_eq!(parse_body("deleted".into()), Value::String("deleted".into()));
    }

    #[test]
    fn new_rejects_missing_credential() {
        let err = SpotClient::new(SpotConfig::default()).unwrap_err();
        assert!(matches!(err, SpotError::Config { .. }));
    }

    #[test]
    fn api_url_is_normalized() {
        let client = SpotClient::new(
            SpotConfig::default()
                .with_refresh_token("rt")
                .with_api_url("https://api.example/apis/"),
        )
        .unwrap();
        assert_eq!(client.api_url(), "https://api.example/apis");
    }
}
