//! Wire types for the Spot API.
//!
//! Resource bodies are passed through as `serde_json::Value`; only the
//! shapes the client itself builds or inspects are typed here.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// API group for cloudspaces, node pools, regions and server classes.
pub const NGPC_GROUP: &str = "ngpc.rxt.io/v1";

/// API group for organizations and kubeconfig generation.
pub const AUTH_GROUP: &str = "auth.ngpc.rxt.io/v1";

/// Label that ties a node pool to its cloudspace.
pub const CLOUDSPACE_LABEL: &str = "ngpc.rxt.io/cloudspace";

/// Long-lived credential exchanged for access tokens.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw secret, for the token exchange and kubeconfig request bodies only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(<redacted>)")
    }
}

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Body of the kubeconfig generation request.
#[derive(Debug, Clone, Serialize)]
pub struct KubeconfigRequest<'a> {
    pub organization_name: &'a str,
    pub cloudspace_name: &'a str,
    pub refresh_token: &'a str,
}

/// Parameters for creating a cloudspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudspaceSpec {
    pub name: String,
    pub region: String,
    #[serde(default = "default_kubernetes_version")]
    pub kubernetes_version: String,
    #[serde(default)]
    pub ha_control_plane: bool,
    #[serde(default = "default_cni")]
    pub cni: String,
    #[serde(default)]
    pub webhook: Option<String>,
}

fn default_kubernetes_version() -> String {
    "1.31.1".to_string()
}

fn default_cni() -> String {
    "calico".to_string()
}

impl CloudspaceSpec {
    /// Render the `CloudSpace` manifest for `namespace`.
    pub fn to_manifest(&self, namespace: &str) -> Value {
        json!({
            "apiVersion": NGPC_GROUP,
            "kind": "CloudSpace",
            "metadata": {
                "name": self.name,
                "namespace": namespace,
            },
            "spec": {
                "region": self.region,
                "kubernetesVersion": self.kubernetes_version,
                "HAControlPlane": self.ha_control_plane,
                "cni": self.cni,
                "cloud": "default",
                "webhook": self.webhook.clone().unwrap_or_default(),
            }
        })
    }
}

/// Autoscaling bounds for a node pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Autoscaling {
    pub min_nodes: u32,
    pub max_nodes: u32,
}

/// Parameters for creating a spot or on-demand node pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodePoolSpec {
    /// Pool name; generated when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub cloudspace: String,
    pub server_class: String,
    pub desired: u32,
    /// Auction bid in USD per hour. Spot pools only.
    #[serde(default)]
    pub bid_price: Option<String>,
    #[serde(default)]
    pub autoscaling: Option<Autoscaling>,
}

/// Node pool flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePoolKind {
    Spot,
    OnDemand,
}

impl NodePoolKind {
    pub fn resource(self) -> &'static str {
        match self {
            Self::Spot => "spotnodepools",
            Self::OnDemand => "ondemandnodepools",
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Spot => "SpotNodePool",
            Self::OnDemand => "OnDemandNodePool",
        }
    }
}

impl NodePoolSpec {
    /// Name to create the pool under.
    pub fn resolved_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Render the node pool manifest.
    pub fn to_manifest(&self, kind: NodePoolKind, namespace: &str, name: &str) -> Value {
        let mut spec = json!({
            "cloudSpace": self.cloudspace,
            "serverClass": self.server_class,
            "desired": self.desired,
        });
        if let (NodePoolKind::Spot, Some(bid)) = (kind, &self.bid_price) {
            spec["bidPrice"] = json!(bid);
        }
        if let Some(scaling) = self.autoscaling {
            spec["autoscaling"] = json!({
                "enabled": true,
                "minNodes": scaling.min_nodes,
                "maxNodes": scaling.max_nodes,
            });
        }
        json!({
            "apiVersion": NGPC_GROUP,
            "kind": kind.kind(),
            "metadata": {
                "name": name,
                "namespace": namespace,
                "labels": { CLOUDSPACE_LABEL: self.cloudspace },
            },
            "spec": spec,
        })
    }
}
