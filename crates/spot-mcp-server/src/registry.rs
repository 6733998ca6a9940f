//! Static catalog of invocable commands.
//!
//! Each [`CommandDefinition`] carries its capability explicitly. The
//! externally visible shape is a separate projection ([`CommandInfo`]) so
//! the capability never leaks into `tools/list`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;

use crate::error::CommandError;
use crate::policy::Capability;

/// Maximum allowed length for a command name.
const MAX_COMMAND_NAME_LEN: usize = 64;

/// Maximum schema violations reported back to the caller.
const MAX_REPORTED_VIOLATIONS: usize = 5;

/// Runs a command once its arguments have been validated.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<Value, CommandError>;
}

/// Adapter turning an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, CommandError>> + Send,
{
    FnHandler(f)
}

#[async_trait::async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, CommandError>> + Send,
{
    async fn call(&self, args: Value) -> Result<Value, CommandError> {
        (self.0)(args).await
    }
}

/// Schema-only view of a command, as advertised to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A command in the catalog.
pub struct CommandDefinition {
    name: String,
    description: String,
    input_schema: Value,
    validator: jsonschema::Validator,
    capability: Capability,
    handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    /// Build a definition. Fails on an invalid name or a schema that does
    /// not compile.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        capability: Capability,
        handler: impl CommandHandler + 'static,
    ) -> Result<Self> {
        let name = name.into();
        validate_command_name(&name)?;
        if !input_schema.is_object() {
            bail!("input schema for {name} must be a JSON object");
        }
        let validator = jsonschema::options()
            .build(&input_schema)
            .map_err(|e| anyhow::anyhow!("input schema for {name} does not compile: {e}"))?;

        Ok(Self {
            name,
            description: description.into(),
            input_schema,
            validator,
            capability,
            handler: Arc::new(handler),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn handler(&self) -> Arc<dyn CommandHandler> {
        Arc::clone(&self.handler)
    }

    /// Projection advertised to clients.
    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Check `args` against the declared input schema.
    pub fn validate_args(&self, args: &Value) -> Result<(), CommandError> {
        if self.validator.is_valid(args) {
            return Ok(());
        }
        let violations: Vec<String> = self
            .validator
            .iter_errors(args)
            .take(MAX_REPORTED_VIOLATIONS)
            .map(|e| e.to_string())
            .collect();
        Err(CommandError::Validation {
            name: self.name.clone(),
            message: violations.join("; "),
        })
    }
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

/// Catalog of commands, keyed by unique name, in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<CommandDefinition>>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Names are unique across the catalog.
    pub fn register(&mut self, command: CommandDefinition) -> Result<()> {
        if self.index.contains_key(command.name()) {
            bail!("command already registered: {}", command.name());
        }
        self.index
            .insert(command.name().to_string(), self.commands.len());
        self.commands.push(Arc::new(command));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandDefinition>> {
        self.index.get(name).map(|&i| Arc::clone(&self.commands[i]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDefinition>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of commands with the given capability.
    pub fn count(&self, capability: Capability) -> usize {
        self.commands
            .iter()
            .filter(|c| c.capability() == capability)
            .count()
    }
}

/// Names are non-empty ASCII alphanumerics and underscores.
fn validate_command_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("command name must not be empty");
    }
    if name.len() > MAX_COMMAND_NAME_LEN {
        bail!("command name exceeds {MAX_COMMAND_NAME_LEN} characters: {name}");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("command name must contain only alphanumerics and underscores: {name}");
    }
    Ok(())
}
