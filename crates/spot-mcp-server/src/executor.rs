//! Command execution with a uniform result envelope.
//!
//! [`CommandExecutor::invoke`] never fails: policy refusals, unknown names,
//! invalid arguments, API errors and handler panics all come back as
//! [`CommandResult::Err`].

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::CommandError;
use crate::jsonrpc::{ContentItem, ToolResultBody};
use crate::policy::AccessGate;

/// Outcome of a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Serialized JSON payload.
    Ok(String),
    /// Human-readable failure description.
    Err(String),
}

impl CommandResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Ok(text) | Self::Err(text) => text,
        }
    }

    /// MCP `tools/call` result body.
    pub fn into_tool_result(self) -> ToolResultBody {
        let is_error = self.is_error();
        let text = match self {
            Self::Ok(text) | Self::Err(text) => text,
        };
        ToolResultBody {
            content: vec![ContentItem::Text { text }],
            is_error,
        }
    }
}

/// Resolves, authorizes and runs commands.
#[derive(Clone)]
pub struct CommandExecutor {
    gate: AccessGate,
}

impl CommandExecutor {
    pub fn new(gate: AccessGate) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    /// Run `name` with `args`. Always returns a result envelope.
    pub async fn invoke(&self, name: &str, args: Value) -> CommandResult {
        let started = Instant::now();
        match self.try_invoke(name, args).await {
            Ok(payload) => {
                info!(
                    command = name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "command succeeded"
                );
                CommandResult::Ok(payload)
            }
            Err(err) => {
                warn!(
                    command = name,
                    kind = err.kind(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "command failed"
                );
                CommandResult::Err(err.to_string())
            }
        }
    }

    async fn try_invoke(&self, name: &str, args: Value) -> Result<String, CommandError> {
        let command = self.gate.authorize(name)?;

        let args = normalize_args(args);
        command.validate_args(&args)?;

        debug!(command = name, capability = ?command.capability(), "running handler");
        let handler = command.handler();
        let value = AssertUnwindSafe(handler.call(args))
            .catch_unwind()
            .await
            .map_err(|panic| {
                CommandError::handler(format!(
                    "command '{}' panicked: {}",
                    name,
                    panic_message(panic.as_ref())
                ))
            })??;

        serde_json::to_string_pretty(&value)
            .map_err(|e| CommandError::handler(format!("failed to serialize result: {}", e)))
    }
}

/// Missing or null arguments mean "no arguments".
fn normalize_args(args: Value) -> Value {
    match args {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
