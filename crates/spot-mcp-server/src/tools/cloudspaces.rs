//! Cloudspaces and kubeconfig generation.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use spot_client::{CloudspaceSpec, SpotClient};

use super::{command, string_args, NamespaceArgs, NamespacedNameArgs, NAMESPACE_DOC};
use crate::error::CommandError;
use crate::policy::Capability;
use crate::registry::CommandDefinition;

#[derive(Debug, Deserialize)]
struct CreateCloudspaceArgs {
    namespace: String,
    #[serde(flatten)]
    spec: CloudspaceSpec,
}

#[derive(Debug, Deserialize)]
struct KubeconfigArgs {
    organization: String,
    cloudspace: String,
}

pub(super) fn commands(client: &SpotClient) -> Result<Vec<CommandDefinition>> {
    Ok(vec![
        command(
            "list_cloudspaces",
            "List the cloudspaces (managed Kubernetes clusters) in a namespace.",
            string_args(&[("namespace", NAMESPACE_DOC)]),
            Capability::Read,
            client,
            |client, args: NamespaceArgs| async move {
                client
                    .list_cloudspaces(&args.namespace)
                    .await
                    .map_err(CommandError::from)
            },
        )?,
        command(
            "get_cloudspace",
            "Get one cloudspace, including its status.",
            string_args(&[("namespace", NAMESPACE_DOC), ("name", "Cloudspace name")]),
            Capability::Read,
            client,
            |client, args: NamespacedNameArgs| async move {
                client
                    .get_cloudspace(&args.namespace, &args.name)
                    .await
                    .map_err(CommandError::from)
            },
        )?,
        command(
            "create_cloudspace",
            "Create a cloudspace in a region.",
            create_cloudspace_schema(),
            Capability::Mutate,
            client,
            |client, args: CreateCloudspaceArgs| async move {
                client
                    .create_cloudspace(&args.namespace, &args.spec)
                    .await
                    .map_err(CommandError::from)
            },
        )?,
        command(
            "delete_cloudspace",
            "Delete a cloudspace and everything running in it.",
            string_args(&[("namespace", NAMESPACE_DOC), ("name", "Cloudspace name")]),
            Capability::Mutate,
            client,
            |client, args: NamespacedNameArgs| async move {
                client
                    .delete_cloudspace(&args.namespace, &args.name)
                    .await
                    .map_err(CommandError::from)
            },
        )?,
        command(
            "get_cloudspace_kubeconfig",
            "Generate a kubeconfig for a cloudspace.",
            string_args(&[
                ("organization", "Organization name"),
                ("cloudspace", "Cloudspace name"),
            ]),
            Capability::Read,
            client,
            |client, args: KubeconfigArgs| async move {
                let response = client
                    .generate_kubeconfig(&args.organization, &args.cloudspace)
                    .await?;
                Ok::<_, CommandError>(extract_kubeconfig(response))
            },
        )?,
    ])
}

fn create_cloudspace_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "namespace": { "type": "string", "minLength": 1, "description": NAMESPACE_DOC },
            "name": { "type": "string", "minLength": 1, "description": "Cloudspace name" },
            "region": { "type": "string", "minLength": 1, "description": "Region name" },
            "kubernetes_version": { "type": "string", "description": "Defaults to 1.31.1" },
            "ha_control_plane": { "type": "boolean", "description": "Highly available control plane" },
            "cni": { "type": "string", "description": "Defaults to calico" },
            "webhook": { "type": "string", "description": "Preemption webhook URL" }
        },
        "required": ["namespace", "name", "region"]
    })
}

/// The kubeconfig text when present, otherwise the whole response.
fn extract_kubeconfig(response: Value) -> Value {
    match response.pointer("/data/kubeconfig") {
        Some(Value::String(text)) => Value::String(text.clone()),
        _ => response,
    }
}
