//! Regions and server classes.

use anyhow::Result;
use spot_client::SpotClient;

use super::{command, no_args, string_args, NameArgs, NoArgs};
use crate::error::CommandError;
use crate::policy::Capability;
use crate::registry::CommandDefinition;

pub(super) fn commands(client: &SpotClient) -> Result<Vec<CommandDefinition>> {
    Ok(vec![
        command(
            "list_regions",
            "List the regions where cloudspaces can be created.",
            no_args(),
            Capability::Read,
            client,
            |client, _: NoArgs| async move {
                client.list_regions().await.map_err(CommandError::from)
            },
        )?,
        command(
            "get_region",
            "Get one region by name.",
            string_args(&[("name", "Region name, e.g. us-central-dfw-1")]),
            Capability::Read,
            client,
            |client, args: NameArgs| async move {
                client.get_region(&args.name).await.map_err(CommandError::from)
            },
        )?,
        command(
            "list_server_classes",
            "List the server classes available for node pools.",
            no_args(),
            Capability::Read,
            client,
            |client, _: NoArgs| async move {
                client.list_server_classes().await.map_err(CommandError::from)
            },
        )?,
        command(
            "get_server_class",
            "Get one server class by name.",
            string_args(&[("name", "Server class name, e.g. gp.vs1.medium-dfw")]),
            Capability::Read,
            client,
            |client, args: NameArgs| async move {
                client.get_server_class(&args.name).await.map_err(CommandError::from)
            },
        )?,
    ])
}
