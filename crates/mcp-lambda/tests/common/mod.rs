// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for mcp-lambda integration tests.
//!
//! Provides a scripted engine whose behaviour is driven by the request
//! method, and helpers to assemble the supervisor/bridge/adapter stack.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use mcp_engine::{
    EngineError, EngineStreams, JsonRpcMessage, ProtocolEngine, SessionMessage,
};
use mcp_lambda::{
    EndpointConfig, EngineSupervisor, GenericRequest, GenericResponse, InvocationAdapter,
    TransportBridge,
};
use serde_json::{Value, json};

/// Engine used by the integration tests.
///
/// - `echo`: replies `{"method": ..., "params": ...}`
/// - `slow`: sleeps for `params.ms` milliseconds, then replies like `echo`
/// - `crash`: ends the run loop with an error, without replying
/// - `panic`: panics inside the run loop, without replying
/// - `notifications/emit`: writes an uncorrelated message to the outbound side
/// - anything else: replies like `echo`
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    starts: AtomicUsize,
    startup_delay: Duration,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Engine that waits before its first read.
    pub fn with_startup_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicUsize::new(0),
            startup_delay: delay,
        })
    }

    /// Number of times `run` has been entered.
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolEngine for ScriptedEngine {
    async fn run(&self, streams: EngineStreams) -> Result<(), EngineError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let EngineStreams {
            mut inbound,
            outbound,
        } = streams;

        if !self.startup_delay.is_zero() {
            tokio::time::sleep(self.startup_delay).await;
        }

        while let Some(envelope) = inbound.recv().await {
            match &envelope.message {
                JsonRpcMessage::Request(request) => {
                    if request.method == "crash" {
                        return Err(EngineError::Internal("crash requested".to_string()));
                    }
                    if request.method == "panic" {
                        panic!("panic requested");
                    }
                    if request.method == "slow" {
                        let ms = request
                            .params
                            .as_ref()
                            .and_then(|p| p.get("ms"))
                            .and_then(Value::as_u64)
                            .unwrap_or(10);
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                    let reply = envelope.reply(JsonRpcMessage::response(
                        request.id.clone(),
                        json!({ "method": request.method, "params": request.params }),
                    ));
                    outbound
                        .send(reply)
                        .map_err(|_| EngineError::OutboundClosed)?;
                }
                JsonRpcMessage::Notification(n) if n.method == "notifications/emit" => {
                    let stray = SessionMessage::new(
                        serde_json::from_value(json!({
                            "jsonrpc": "2.0",
                            "method": "notifications/message",
                            "params": { "level": "info" }
                        }))
                        .unwrap(),
                    );
                    outbound
                        .send(stray)
                        .map_err(|_| EngineError::OutboundClosed)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Supervisor, bridge and adapter around `engine`, with default routing.
pub struct Stack {
    pub supervisor: Arc<EngineSupervisor>,
    pub bridge: Arc<TransportBridge>,
    pub adapter: Arc<InvocationAdapter>,
}

impl Stack {
    pub fn new(engine: Arc<dyn ProtocolEngine>) -> Self {
        Self::with_endpoint(engine, EndpointConfig::default())
    }

    pub fn with_endpoint(engine: Arc<dyn ProtocolEngine>, endpoint: EndpointConfig) -> Self {
        let supervisor = Arc::new(EngineSupervisor::new(engine));
        let bridge = Arc::new(TransportBridge::new(supervisor.clone()));
        let adapter = Arc::new(InvocationAdapter::new(endpoint, bridge.clone()));
        Self {
            supervisor,
            bridge,
            adapter,
        }
    }
}

/// `POST /mcp` with a JSON body.
pub fn post_json(body: Value) -> GenericRequest {
    GenericRequest::new(Method::POST, "/mcp")
        .with_header("content-type", "application/json")
        .with_header("accept", "application/json, text/event-stream")
        .with_body(Bytes::from(body.to_string()))
}

/// JSON-RPC request object.
pub fn rpc(id: Value, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

/// Body of a response as JSON.
pub fn body_json(response: &GenericResponse) -> Value {
    serde_json::from_slice(&response.body).expect("response body is JSON")
}

pub fn assert_status(response: &GenericResponse, status: StatusCode) {
    assert_eq!(
        response.status,
        status,
        "unexpected status; body: {}",
        String::from_utf8_lossy(&response.body)
    );
}
