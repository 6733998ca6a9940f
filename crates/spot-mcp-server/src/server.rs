//! MCP stdio server.
//!
//! Reads one JSON-RPC request per line and writes one response per line.
//! Each request is handled on its own task, so slow tool calls do not hold
//! up the rest; responses are written in completion order.
//!
//! Routed methods:
//! - `initialize` -- protocol version, capabilities and server info
//! - `ping` -- empty result
//! - `tools/list` -- commands allowed by the active policy
//! - `tools/call` -- runs a command through [`CommandExecutor`]
//!
//! Notifications (requests without an id) get no response.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::executor::CommandExecutor;
use crate::jsonrpc::{error_codes, CallToolParams, JsonRpcRequest, JsonRpcResponse};
use crate::policy::{AccessGate, AccessPolicy};
use crate::registry::CommandRegistry;

/// Protocol version answered when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

const SERVER_NAME: &str = "spot-mcp";

/// MCP server over a line-delimited byte stream.
#[derive(Clone)]
pub struct McpServer {
    executor: Arc<CommandExecutor>,
}

impl McpServer {
    pub fn new(registry: CommandRegistry, policy: AccessPolicy) -> Self {
        let gate = AccessGate::new(Arc::new(registry), policy);
        Self {
            executor: Arc::new(CommandExecutor::new(gate)),
        }
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Serve until `input` reaches EOF, then wait for in-flight requests.
    pub async fn run<R, W>(self, input: R, output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            let mut output = output;
            while let Some(line) = rx.recv().await {
                output.write_all(line.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let mut in_flight = JoinSet::new();
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request = match parse_request(line) {
                Ok(request) => request,
                Err(response) => {
                    send(&tx, &response);
                    continue;
                }
            };

            let server = self.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle(request).await {
                    send(&tx, &response);
                }
            });

            // Reap finished tasks so the set does not grow without bound.
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    warn!(error = %e, "request task failed");
                }
            }
        }

        debug!("input closed, draining in-flight requests");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "request task failed");
            }
        }

        drop(tx);
        writer.await??;
        Ok(())
    }

    /// Handle one request. `None` for notifications.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                id,
                error_codes::INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result(&request.params)),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            other => JsonRpcResponse::failure(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        };
        Some(response)
    }

    fn initialize_result(&self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        info!(
            protocol_version,
            policy = self.executor.gate().policy().as_str(),
            "client initialized"
        );

        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools = self.executor.gate().list_commands();
        debug!(count = tools.len(), "listing tools");
        match serde_json::to_value(&tools) {
            Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => JsonRpcResponse::failure(
                id,
                error_codes::INTERNAL_ERROR,
                format!("failed to encode tool list: {}", e),
            ),
        }
    }

    async fn handle_tools_call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::failure(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                )
            }
        };

        let result = self
            .executor
            .invoke(&params.name, params.arguments)
            .await
            .into_tool_result();

        match serde_json::to_value(&result) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(
                id,
                error_codes::INTERNAL_ERROR,
                format!("failed to encode tool result: {}", e),
            ),
        }
    }
}

/// Decode one line. Invalid JSON is a parse error; valid JSON that is not a
/// request is an invalid request, answered with its id when one is readable.
fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "unparsable request");
        JsonRpcResponse::failure(Value::Null, error_codes::PARSE_ERROR, "Parse error")
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "malformed request");
        JsonRpcResponse::failure(
            id,
            error_codes::INVALID_REQUEST,
            format!("Invalid Request: {}", e),
        )
    })
}

fn send(tx: &mpsc::UnboundedSender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            if tx.send(line).is_err() {
                warn!("output closed, dropping response");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode response"),
    }
}
