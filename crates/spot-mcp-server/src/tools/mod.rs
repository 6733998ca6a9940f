//! The Spot command catalog.
//!
//! Every command is declared with its capability next to its schema and
//! handler. Handlers receive typed arguments decoded from the validated
//! JSON object.

use std::future::Future;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use spot_client::SpotClient;

use crate::error::CommandError;
use crate::policy::Capability;
use crate::registry::{handler_fn, CommandDefinition, CommandRegistry};

mod cloudspaces;
mod node_pools;
mod organizations;
mod pricing;
mod regions;

pub use pricing::summarize_pricing;

/// Build the full catalog bound to `client`.
pub fn catalog(client: &SpotClient) -> Result<CommandRegistry> {
    let mut registry = CommandRegistry::new();
    for command in organizations::commands(client)?
        .into_iter()
        .chain(regions::commands(client)?)
        .chain(pricing::commands(client)?)
        .chain(cloudspaces::commands(client)?)
        .chain(node_pools::commands(client)?)
    {
        registry.register(command)?;
    }

    tracing::debug!(
        total = registry.len(),
        mutating = registry.count(Capability::Mutate),
        "command catalog built"
    );
    Ok(registry)
}

/// Declare a command whose handler takes decoded arguments of type `A`.
pub(crate) fn command<A, F, Fut>(
    name: &'static str,
    description: &'static str,
    input_schema: Value,
    capability: Capability,
    client: &SpotClient,
    f: F,
) -> Result<CommandDefinition>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(SpotClient, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, CommandError>> + Send + 'static,
{
    let client = client.clone();
    let handler = handler_fn(move |args: Value| {
        let call = serde_json::from_value::<A>(args)
            .map_err(|e| CommandError::Validation {
                name: name.to_string(),
                message: e.to_string(),
            })
            .map(|args| f(client.clone(), args));
        async move { call?.await }
    });
    CommandDefinition::new(name, description, input_schema, capability, handler)
}

/// Schema for a command without arguments.
pub(crate) fn no_args() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Schema for an object with only string properties, all required.
pub(crate) fn string_args(fields: &[(&str, &str)]) -> Value {
    let mut properties = serde_json::Map::new();
    for (field, description) in fields {
        properties.insert(
            (*field).to_string(),
            json!({ "type": "string", "minLength": 1, "description": description }),
        );
    }
    let required: Vec<&str> = fields.iter().map(|(field, _)| *field).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct NoArgs {}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct NameArgs {
    pub name: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct NamespaceArgs {
    pub namespace: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct NamespacedNameArgs {
    pub namespace: String,
    pub name: String,
}

pub(crate) const NAMESPACE_DOC: &str = "Organization namespace, e.g. org-abc123";
