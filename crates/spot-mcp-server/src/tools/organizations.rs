//! Organizations.

use anyhow::Result;
use serde_json::Value;
use spot_client::SpotClient;

use super::{command, no_args, string_args, NameArgs, NoArgs};
use crate::error::CommandError;
use crate::policy::Capability;
use crate::registry::CommandDefinition;

pub(super) fn commands(client: &SpotClient) -> Result<Vec<CommandDefinition>> {
    Ok(vec![
        command(
            "list_organizations",
            "List the organizations the credential belongs to, including their namespaces.",
            no_args(),
            Capability::Read,
            client,
            |client, _: NoArgs| async move {
                client.list_organizations().await.map_err(CommandError::from)
            },
        )?,
        command(
            "get_organization",
            "Get one organization by name or id.",
            string_args(&[("name", "Organization name or id")]),
            Capability::Read,
            client,
            |client, args: NameArgs| async move {
                let organizations = client.list_organizations().await?;
                find_organization(&organizations, &args.name)
                    .cloned()
                    .ok_or_else(|| {
                        CommandError::handler(format!("Organization not found: {}", args.name))
                    })
            },
        )?,
    ])
}

/// Find an organization by name or id in a list response.
fn find_organization<'a>(response: &'a Value, key: &str) -> Option<&'a Value> {
    let entries = response
        .get("organizations")
        .or_else(|| response.get("items"))
        .and_then(Value::as_array)?;

    entries.iter().find(|org| {
        ["name", "id"]
            .iter()
            .any(|field| org.get(*field).and_then(Value::as_str) == Some(key))
            || org.pointer("/metadata/name").and_then(Value::as_str) == Some(key)
    })
}
