// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! mcp-lambda - serve an MCP engine from AWS Lambda
//!
//! The MCP engine expects a standing duplex connection; Lambda delivers one
//! discrete HTTP request per invocation and may freeze or kill the process in
//! between. This crate keeps a single engine task alive inside the process
//! and turns each invocation into a buffered round trip over its duplex pair.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  event   ┌───────────────────┐ GenericRequest ┌─────────────────┐
//! │ Runtime API  │ ───────► │ InvocationAdapter │ ─────────────► │ TransportBridge │
//! │ / local HTTP │ ◄─────── │  (routing, 404)   │ ◄───────────── │  (correlation)  │
//! └──────────────┘ response └───────────────────┘ GenericResponse└─────────────────┘
//!                                                                    │ ensure_running()
//!                                                                    ▼
//!                                                        ┌───────────────────────┐
//!                                                        │   EngineSupervisor    │
//!                                                        │ one engine task with  │
//!                                                        │ its duplex pair       │
//!                                                        └───────────────────────┘
//! ```
//!
//! # Endpoint
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `POST` | `/mcp`, `/mcp/` | JSON-RPC replies in one JSON body, or 202 |
//! | `GET` | `/mcp` | 405 |
//! | `DELETE` | `/mcp` | 405 |
//! | other | other | 404, engine untouched |
//!
//! The transport is stateless: no `Mcp-Session-Id` is issued or required.

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod error;
pub mod event;
pub mod local;
pub mod request;
pub mod runtime;
pub mod supervisor;
pub mod tools;

pub use adapter::InvocationAdapter;
pub use bridge::TransportBridge;
pub use config::{Config, ConfigError, EndpointConfig};
pub use error::BridgeError;
pub use event::{InvocationEvent, InvocationResponse};
pub use request::{GenericRequest, GenericResponse};
pub use runtime::{LambdaRuntime, RuntimeError};
pub use supervisor::{EngineHandle, EngineSupervisor};
