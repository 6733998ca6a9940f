//! Spot and on-demand node pools.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use spot_client::{NodePoolKind, NodePoolSpec, SpotClient};

use super::{command, string_args, NamespacedNameArgs, NAMESPACE_DOC};
use crate::error::CommandError;
use crate::policy::Capability;
use crate::registry::CommandDefinition;

#[derive(Debug, Deserialize)]
struct ListNodePoolsArgs {
    namespace: String,
    #[serde(default)]
    cloudspace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudspaceArgs {
    namespace: String,
    cloudspace: String,
}

#[derive(Debug, Deserialize)]
struct CreateNodePoolArgs {
    namespace: String,
    #[serde(flatten)]
    spec: NodePoolSpec,
}

pub(super) fn commands(client: &SpotClient) -> Result<Vec<CommandDefinition>> {
    let mut commands = Vec::new();
    for kind in [NodePoolKind::Spot, NodePoolKind::OnDemand] {
        commands.extend(kind_commands(client, kind)?);
    }
    commands.push(command(
        "list_cloudspace_node_pools",
        "List both the spot and the on-demand node pools of one cloudspace.",
        string_args(&[("namespace", NAMESPACE_DOC), ("cloudspace", "Cloudspace name")]),
        Capability::Read,
        client,
        |client, args: CloudspaceArgs| async move {
            let (spot, ondemand) = tokio::try_join!(
                client.list_node_pools(NodePoolKind::Spot, &args.namespace, Some(&args.cloudspace)),
                client.list_node_pools(
                    NodePoolKind::OnDemand,
                    &args.namespace,
                    Some(&args.cloudspace)
                ),
            )?;
            Ok::<_, CommandError>(json!({
                "cloudspace": args.cloudspace,
                "spotNodePools": spot,
                "onDemandNodePools": ondemand,
            }))
        },
    )?);
    Ok(commands)
}

fn kind_commands(client: &SpotClient, kind: NodePoolKind) -> Result<Vec<CommandDefinition>> {
    let names = CommandNames::for_kind(kind);
    Ok(vec![
        command(
            names.list,
            names.list_doc,
            json!({
                "type": "object",
                "properties": {
                    "namespace": { "type": "string", "minLength": 1, "description": NAMESPACE_DOC },
                    "cloudspace": { "type": "string", "description": "Only pools owned by this cloudspace" }
                },
                "required": ["namespace"]
            }),
            Capability::Read,
            client,
            move |client, args: ListNodePoolsArgs| async move {
                client
                    .list_node_pools(kind, &args.namespace, args.cloudspace.as_deref())
                    .await
                    .map_err(CommandError::from)
            },
        )?,
        command(
            names.get,
            names.get_doc,
            string_args(&[("namespace", NAMESPACE_DOC), ("name", "Node pool name")]),
            Capability::Read,
            client,
            move |client, args: NamespacedNameArgs| async move {
                client
                    .get_node_pool(kind, &args.namespace, &args.name)
                    .await
                    .map_err(CommandError::from)
            },
        )?,
        command(
            names.create,
            names.create_doc,
            create_schema(kind),
            Capability::Mutate,
            client,
            move |client, args: CreateNodePoolArgs| async move {
                if kind == NodePoolKind::OnDemand && args.spec.bid_price.is_some() {
                    return Err(CommandError::Validation {
                        name: names.create.to_string(),
                        message: "bid_price only applies to spot node pools".to_string(),
                    });
                }
                client
                    .create_node_pool(kind, &args.namespace, &args.spec)
                    .await
                    .map_err(CommandError::from)
            },
        )?,
        command(
            names.delete,
            names.delete_doc,
            string_args(&[("namespace", NAMESPACE_DOC), ("name", "Node pool name")]),
            Capability::Mutate,
            client,
            move |client, args: NamespacedNameArgs| async move {
                client
                    .delete_node_pool(kind, &args.namespace, &args.name)
                    .await
                    .map_err(CommandError::from)
            },
        )?,
    ])
}

#[derive(Debug, Clone, Copy)]
struct CommandNames {
    list: &'static str,
    list_doc: &'static str,
    get: &'static str,
    get_doc: &'static str,
    create: &'static str,
    create_doc: &'static str,
    delete: &'static str,
    delete_doc: &'static str,
}

impl CommandNames {
    fn for_kind(kind: NodePoolKind) -> Self {
        match kind {
            NodePoolKind::Spot => Self {
                list: "list_spot_node_pools",
                list_doc: "List spot node pools in a namespace, optionally for one cloudspace.",
                get: "get_spot_node_pool",
                get_doc: "Get one spot node pool.",
                create: "create_spot_node_pool",
                create_doc: "Create a spot node pool that bids for servers on the market.",
                delete: "delete_spot_node_pool",
                delete_doc: "Delete a spot node pool.",
            },
            NodePoolKind::OnDemand => Self {
                list: "list_ondemand_node_pools",
                list_doc: "List on-demand node pools in a namespace, optionally for one cloudspace.",
                get: "get_ondemand_node_pool",
                get_doc: "Get one on-demand node pool.",
                create: "create_ondemand_node_pool",
                create_doc: "Create an on-demand node pool at a fixed price.",
                delete: "delete_ondemand_node_pool",
                delete_doc: "Delete an on-demand node pool.",
            },
        }
    }
}

fn create_schema(kind: NodePoolKind) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "namespace": { "type": "string", "minLength": 1, "description": NAMESPACE_DOC },
            "name": { "type": "string", "minLength": 1, "description": "Pool name; generated when omitted" },
            "cloudspace": { "type": "string", "minLength": 1, "description": "Owning cloudspace" },
            "server_class": { "type": "string", "minLength": 1, "description": "Server class name" },
            "desired": { "type": "integer", "minimum": 0, "description": "Desired node count" },
            "autoscaling": {
                "type": "object",
                "properties": {
                    "min_nodes": { "type": "integer", "minimum": 0 },
                    "max_nodes": { "type": "integer", "minimum": 0 }
                },
                "required": ["min_nodes", "max_nodes"]
            }
        },
        "required": ["namespace", "cloudspace", "server_class", "desired"]
    });
    if kind == NodePoolKind::Spot {
        schema["properties"]["bid_price"] = json!({
            "type": "string",
            "pattern": "^[0-9]+(\\.[0-9]+)?$",
            "description": "Maximum bid in USD per hour, e.g. \"0.08\""
        });
        schema["required"] = json!(["namespace", "cloudspace", "server_class", "desired", "bid_price"]);
    }
    schema
}
