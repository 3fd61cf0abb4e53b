// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! MCP server engine.
//!
//! Dispatches JSON-RPC requests arriving on the engine end of a duplex stream
//! pair and writes correlated replies to the outbound side.
//!
//! | Method | Reply |
//! |--------|-------|
//! | `initialize` | protocol version, capabilities, server info |
//! | `ping` | empty object |
//! | `tools/list` | registered tool definitions |
//! | `tools/call` | [`CallToolResult`](crate::tool::CallToolResult) |
//! | `notifications/*` | none |
//!
//! The server runs stateless: requests are served whether or not the caller
//! sent `initialize` first, and nothing is remembered between requests.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::duplex::EngineStreams;
use crate::engine::{EngineError, ProtocolEngine};
use crate::message::{
    INVALID_PARAMS, JsonRpcMessage, JsonRpcRequest, METHOD_NOT_FOUND, SessionMessage,
};
use crate::tool::{CallToolResult, ToolRegistry};

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Latest protocol revision, offered when the client asks for an unknown one.
pub const LATEST_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];

/// Whether `version` is a protocol revision this server speaks.
pub fn is_supported_protocol_version(version: &str) -> bool {
    SUPPORTED_PROTOCOL_VERSIONS.contains(&version)
}

/// Values reported to clients during `initialize`.
#[derive(Debug, Clone)]
pub struct InitializationOptions {
    pub server_name: String,
    pub server_version: String,
    pub instructions: Option<String>,
}

impl InitializationOptions {
    pub fn new(server_name: impl Into<String>, server_version: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            server_version: server_version.into(),
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    protocol_version: String,
    #[serde(default)]
    client_info: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// JSON-RPC failure produced while dispatching a request.
struct DispatchError {
    code: i64,
    message: String,
}

impl DispatchError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.into(),
        }
    }
}

/// The MCP server engine.
#[derive(Debug, Clone)]
pub struct McpServer {
    options: InitializationOptions,
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(options: InitializationOptions, tools: ToolRegistry) -> Self {
        Self { options, tools }
    }

    pub fn options(&self) -> &InitializationOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle one envelope, returning the reply envelope if one is due.
    pub async fn dispatch(&self, envelope: SessionMessage) -> Option<SessionMessage> {
        match &envelope.message {
            JsonRpcMessage::Request(request) => {
                let message = match self.handle_request(request).await {
                    Ok(result) => JsonRpcMessage::response(request.id.clone(), result),
                    Err(e) => JsonRpcMessage::error(Some(request.id.clone()), e.code, e.message),
                };
                Some(envelope.reply(message))
            }
            JsonRpcMessage::Notification(notification) => {
                debug!(method = %notification.method, "Notification received");
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_) => {
                debug!("Ignoring client response; server issues no requests");
                None
            }
        }
    }

    async fn handle_request(&self, request: &JsonRpcRequest) -> Result<Value, DispatchError> {
        debug!(method = %request.method, id = %request.id, "Handling request");

        match request.method.as_str() {
            "initialize" => self.initialize(request.params.clone()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => self.call_tool(request.params.clone()).await,
            other => Err(DispatchError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", other),
            }),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, DispatchError> {
        let params: InitializeParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| DispatchError::invalid_params(format!("invalid initialize params: {}", e)))?;

        let protocol_version = if is_supported_protocol_version(&params.protocol_version) {
            params.protocol_version
        } else {
            warn!(
                requested = %params.protocol_version,
                offered = LATEST_PROTOCOL_VERSION,
                "Client requested unsupported protocol version"
            );
            LATEST_PROTOCOL_VERSION.to_string()
        };

        info!(
            protocol_version = %protocol_version,
            client = ?params.client_info,
            "Client initialized"
        );

        let mut result = json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": self.options.server_name,
                "version": self.options.server_version,
            },
        });
        if let Some(instructions) = &self.options.instructions {
            result["instructions"] = Value::String(instructions.clone());
        }
        Ok(result)
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, DispatchError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| DispatchError::invalid_params(format!("invalid tools/call params: {}", e)))?;

        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| DispatchError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = match tool.call(arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                CallToolResult::error(e.to_string())
            }
        };

        serde_json::to_value(result).map_err(|e| DispatchError {
            code: crate::message::INTERNAL_ERROR,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ProtocolEngine for McpServer {
    async fn run(&self, streams: EngineStreams) -> Result<(), EngineError> {
        let EngineStreams {
            mut inbound,
            outbound,
        } = streams;

        info!(
            server = %self.options.server_name,
            tools = self.tools.len(),
            "MCP server run loop started"
        );

        while let Some(envelope) = inbound.recv().await {
            if let Some(reply) = self.dispatch(envelope).await {
                outbound
                    .send(reply)
                    .map_err(|_| EngineError::OutboundClosed)?;
            }
        }

        info!("MCP server inbound stream closed");
        Ok(())
    }
}
