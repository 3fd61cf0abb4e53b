// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! MCP Engine - in-memory Model Context Protocol engine
//!
//! This crate provides the protocol side of an MCP deployment that has no
//! network socket of its own. A transport opens a duplex stream pair, hands
//! the engine end to a [`ProtocolEngine`], and exchanges JSON-RPC messages
//! over the transport end.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   inbound (SessionMessage)   ┌──────────────────────┐
//! │      Transport       │ ───────────────────────────► │   ProtocolEngine     │
//! │  (TransportStreams)  │                              │   (EngineStreams)    │
//! │                      │ ◄─────────────────────────── │   e.g. McpServer     │
//! └──────────────────────┘   outbound (SessionMessage)  └──────────────────────┘
//! ```
//!
//! Replies carry the correlation id of the request envelope they answer, so a
//! transport can serve many callers over one pair without rewriting ids.
//!
//! # Usage
//!
//! ```ignore
//! use mcp_engine::{duplex, InitializationOptions, McpServer, ProtocolEngine, ToolRegistry};
//!
//! let server = McpServer::new(InitializationOptions::new("demo", "0.1.0"), ToolRegistry::new());
//! let (engine_end, transport_end) = duplex::open();
//! tokio::spawn(async move { server.run(engine_end).await });
//! ```

pub mod duplex;
pub mod engine;
pub mod message;
pub mod server;
pub mod tool;

pub use duplex::{EngineStreams, TransportStreams};
pub use engine::{EngineError, ProtocolEngine};
pub use message::{
    CorrelationId, ErrorObject, JsonRpcErrorResponse, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, JsonRpcVersion, RequestId, SessionMessage,
};
pub use server::{
    InitializationOptions, LATEST_PROTOCOL_VERSION, McpServer, SUPPORTED_PROTOCOL_VERSIONS,
    is_supported_protocol_version,
};
pub use tool::{CallToolResult, Content, ToolDefinition, ToolError, ToolHandler, ToolRegistry};
