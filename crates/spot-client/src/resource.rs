//! Path templating for Spot resource endpoints.
//!
//! Namespaced resources live at `/{group}/namespaces/{namespace}/{resource}[/{name}]`,
//! cluster-scoped ones at `/{group}/{resource}[/{name}]`.

use url::Url;

use crate::error::{SpotError, SpotResult};
use crate::types::{AUTH_GROUP, CLOUDSPACE_LABEL};

/// Path of the token-issuance endpoint, relative to the auth base URL.
pub const TOKEN_PATH: &str = "/oauth/token";

/// Path of the kubeconfig generation endpoint, relative to the API base URL.
pub const KUBECONFIG_PATH: &str = "/auth.ngpc.rxt.io/v1/generate-kubeconfig";

/// Endpoints that authenticate themselves and never carry a bearer token.
pub const AUTH_EXEMPT_PATHS: &[&str] = &[TOKEN_PATH, KUBECONFIG_PATH];

/// Whether `path` is in the fixed auth-exempt set.
pub fn is_auth_exempt(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    AUTH_EXEMPT_PATHS.contains(&path)
}

/// A templated resource location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    group: &'static str,
    namespace: Option<String>,
    resource: &'static str,
    name: Option<String>,
    label_selector: Option<String>,
}

impl ResourcePath {
    /// Cluster-scoped collection.
    pub fn cluster(group: &'static str, resource: &'static str) -> Self {
        Self {
            group,
            namespace: None,
            resource,
            name: None,
            label_selector: None,
        }
    }

    /// Namespaced collection.
    pub fn namespaced(
        group: &'static str,
        namespace: impl Into<String>,
        resource: &'static str,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::cluster(group, resource)
        }
    }

    /// Address a single item of the collection.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filter a list call with a label selector.
    pub fn with_label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    /// Filter a node pool list down to one cloudspace.
    pub fn owned_by_cloudspace(self, cloudspace: &str) -> Self {
        self.with_label_selector(format!("{CLOUDSPACE_LABEL}={cloudspace}"))
    }

    /// Organizations collection.
    pub fn organizations() -> Self {
        Self::cluster(AUTH_GROUP, "organizations")
    }

    pub fn label_selector(&self) -> Option<&str> {
        self.label_selector.as_deref()
    }

    /// Path without the query string.
    ///
    /// Namespace and name are caller-supplied, so each is percent-encoded
    /// as a single segment; `.` and `..` are refused outright.
    pub fn path(&self) -> SpotResult<String> {
        let mut url = Url::parse(SEGMENT_BASE).map_err(|e| SpotError::Config {
            message: format!("failed to build resource path: {e}"),
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| SpotError::Config {
                message: "resource path base cannot carry segments".into(),
            })?;
            segments.clear();
            segments.extend(self.group.split('/'));
            if let Some(ns) = &self.namespace {
                segments.push("namespaces").push(check_segment(ns)?);
            }
            segments.push(self.resource);
            if let Some(name) = &self.name {
                segments.push(check_segment(name)?);
            }
        }
        Ok(url.path().to_string())
    }
}

const SEGMENT_BASE: &str = "http://spot.invalid/";

fn check_segment(segment: &str) -> SpotResult<&str> {
    let reason = match segment {
        "" => "must not be empty",
        "." | ".." => "must not be a relative segment",
        _ => return Ok(segment),
    };
    Err(SpotError::InvalidPath {
        segment: segment.to_string(),
        reason: reason.to_string(),
    })
}

/// A request target: path relative to the API base plus query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// The kubeconfig generation endpoint.
    pub fn kubeconfig() -> Self {
        Self::new(KUBECONFIG_PATH)
    }

    pub fn is_auth_exempt(&self) -> bool {
        is_auth_exempt(&self.path)
    }
}

impl TryFrom<&ResourcePath> for Endpoint {
    type Error = SpotError;

    fn try_from(resource: &ResourcePath) -> SpotResult<Self> {
        let mut endpoint = Endpoint::new(resource.path()?);
        if let Some(selector) = resource.label_selector() {
            endpoint
                .query
                .push(("labelSelector".to_string(), selector.to_string()));
        }
        Ok(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NGPC_GROUP;

    #[test]
    fn namespaced_paths() {
        let list = ResourcePath::namespaced(NGPC_GROUP, "org-abc", "cloudspaces");
        assert_eq!(
            list.path().unwrap(),
            "/ngpc.rxt.io/v1/namespaces/org-abc/cloudspaces"
        );

        let item = list.named("dev");
        assert_eq!(
            item.path().unwrap(),
            "/ngpc.rxt.io/v1/namespaces/org-abc/cloudspaces/dev"
        );
    }

    #[test]
    fn cluster_scoped_paths() {
        let region = ResourcePath::cluster(NGPC_GROUP, "regions").named("us-east-iad-1");
        assert_eq!(
            region.path().unwrap(),
            "/ngpc.rxt.io/v1/regions/us-east-iad-1"
        );
        assert_eq!(
            ResourcePath::organizations().path().unwrap(),
            "/auth.ngpc.rxt.io/v1/organizations"
        );
    }

    #[test]
    fn label_selector_stays_out_of_the_path() {
        let pools = ResourcePath::namespaced(NGPC_GROUP, "org-abc", "spotnodepools")
            .owned_by_cloudspace("dev");
        assert_eq!(pools.label_selector(), Some("ngpc.rxt.io/cloudspace=dev"));
        assert!(!pools.path().unwrap().contains('?'));
    }

    #[test]
    fn caller_segments_are_escaped() {
        let item = ResourcePath::namespaced(NGPC_GROUP, "org-abc", "cloudspaces")
            .named("../../../regions");
        assert_eq!(
            item.path().unwrap(),
            "/ngpc.rxt.io/v1/namespaces/org-abc/cloudspaces/..%2F..%2F..%2Fregions"
        );

        let ns = ResourcePath::namespaced(NGPC_GROUP, "org?x=1#frag", "cloudspaces");
        let path = ns.path().unwrap();
        assert!(!path.contains('?'));
        assert!(!path.contains('#'));
        assert!(path.starts_with("/ngpc.rxt.io/v1/namespaces/org%3Fx=1%23frag/"));
    }

    #[test]
    fn relative_and_empty_segments_are_refused() {
        for bad in ["..", ".", ""] {
            let err = ResourcePath::namespaced(NGPC_GROUP, "org-abc", "cloudspaces")
                .named(bad)
                .path()
                .unwrap_err();
            assert!(matches!(err, SpotError::InvalidPath { .. }), "{bad:?}");

            let err = ResourcePath::namespaced(NGPC_GROUP, bad, "cloudspaces")
                .path()
                .unwrap_err();
            assert!(matches!(err, SpotError::InvalidPath { .. }), "{bad:?}");
        }
    }

    #[test]
    fn endpoint_carries_label_selector_as_query() {
        let pools = ResourcePath::namespaced(NGPC_GROUP, "org-abc", "ondemandnodepools")
            .owned_by_cloudspace("dev");
        let endpoint = Endpoint::try_from(&pools).unwrap();
        assert_eq!(
            endpoint.path,
            "/ngpc.rxt.io/v1/namespaces/org-abc/ondemandnodepools"
        );
        assert_eq!(
            endpoint.query,
            vec![(
                "labelSelector".to_string(),
                "ngpc.rxt.io/cloudspace=dev".to_string()
            )]
        );
        assert!(!endpoint.is_auth_exempt());
        assert!(Endpoint::kubeconfig().is_auth_exempt());
    }

    #[test]
    fn auth_exempt_set_is_fixed() {
        assert!(is_auth_exempt("/oauth/token"));
        assert!(is_auth_exempt("/auth.ngpc.rxt.io/v1/generate-kubeconfig"));
        assert!(!is_auth_exempt("/auth.ngpc.rxt.io/v1/organizations"));
        assert!(!is_auth_exempt("/ngpc.rxt.io/v1/regions"));
    }
}
