// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Buffered, stateless HTTP transport over the engine's duplex pair.
//!
//! | Method | Handling |
//! |--------|----------|
//! | `POST` | messages forwarded; one JSON body with all replies |
//! | `GET` | 405, no server-to-client stream in buffered mode |
//! | `DELETE` | 405, no session to terminate |
//!
//! Each JSON-RPC request is wrapped in an envelope with a fresh correlation
//! id, so callers that happen to reuse the same JSON-RPC id never see each
//! other's replies. No session id is issued or checked.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::try_join_all;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, StatusCode};
use mcp_engine::{JsonRpcMessage, SessionMessage, is_supported_protocol_version};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{BridgeError, Result};
use crate::request::{GenericRequest, GenericResponse};
use crate::supervisor::{EngineHandle, EngineSupervisor};

/// Header carrying the negotiated protocol revision on follow-up requests.
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// Decoded POST body.
enum Payload {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
}

impl Payload {
    fn into_messages(self) -> (Vec<JsonRpcMessage>, bool) {
        match self {
            Payload::Single(message) => (vec![message], false),
            Payload::Batch(messages) => (messages, true),
        }
    }
}

/// Turns generic requests into engine round trips.
#[derive(Debug)]
pub struct TransportBridge {
    supervisor: Arc<EngineSupervisor>,
    next_correlation: AtomicU64,
}

impl TransportBridge {
    pub fn new(supervisor: Arc<EngineSupervisor>) -> Self {
        Self {
            supervisor,
            next_correlation: AtomicU64::new(1),
        }
    }

    /// Serve one request. Always yields exactly one complete response.
    pub async fn handle(&self, request: GenericRequest) -> GenericResponse {
        let method = request.method.clone();
        match self.try_handle(request).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_engine_failure() {
                    error!(%method, error = %e, "Engine round trip failed");
                } else {
                    debug!(%method, error = %e, "Request rejected");
                }
                e.into_response()
            }
        }
    }

    async fn try_handle(&self, request: GenericRequest) -> Result<GenericResponse> {
        let engine = self.supervisor.ensure_running().await?;

        match request.method {
            Method::POST => self.handle_post(&engine, request).await,
            Method::GET => Err(BridgeError::MethodNotAllowed(
                "server-to-client stream is not available in JSON response mode",
            )),
            Method::DELETE => Err(BridgeError::MethodNotAllowed(
                "no session to terminate in stateless mode",
            )),
            _ => Err(BridgeError::MethodNotAllowed("unsupported method")),
        }
    }

    async fn handle_post(
        &self,
        engine: &EngineHandle,
        request: GenericRequest,
    ) -> Result<GenericResponse> {
        check_accept(&request)?;
        check_content_type(&request)?;
        check_protocol_version(&request)?;

        let (messages, batch) = decode_body(&request.body)?.into_messages();

        debug!(
            generation = engine.generation(),
            messages = messages.len(),
            batch,
            "Forwarding messages to engine"
        );

        let mut waiters = Vec::new();
        for message in messages {
            if let Err(e) = self.forward(engine, message, &mut waiters) {
                for (correlation, _) in &waiters {
                    engine.cancel_reply(*correlation);
                }
                return Err(e);
            }
        }

        if waiters.is_empty() {
            return Ok(GenericResponse::empty(StatusCode::ACCEPTED));
        }

        let replies = try_join_all(waiters.into_iter().map(|(_, rx)| rx))
            .await
            .map_err(|_| {
                BridgeError::EngineRoundTrip("engine stopped before replying".to_string())
            })?;

        if batch {
            Ok(GenericResponse::json(StatusCode::OK, &replies))
        } else {
            Ok(GenericResponse::json(StatusCode::OK, &replies[0]))
        }
    }

    /// Send one message, reserving a reply slot first when it is a request.
    fn forward(
        &self,
        engine: &EngineHandle,
        message: JsonRpcMessage,
        waiters: &mut Vec<(u64, tokio::sync::oneshot::Receiver<JsonRpcMessage>)>,
    ) -> Result<()> {
        if !message.expects_reply() {
            return engine.submit(SessionMessage::new(message));
        }

        let correlation = self.next_correlation.fetch_add(1, Ordering::Relaxed);
        let rx = engine.expect_reply(correlation)?;
        if let Err(e) = engine.submit(SessionMessage::correlated(correlation, message)) {
            engine.cancel_reply(correlation);
            return Err(e);
        }
        waiters.push((correlation, rx));
        Ok(())
    }
}

/// Media type of a header value without parameters, lowercased.
fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn check_accept(request: &GenericRequest) -> Result<()> {
    if request.headers.get(ACCEPT).is_none() {
        return Ok(());
    }

    let acceptable = request
        .headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(media_type)
        .any(|m| m == "application/json" || m == "*/*");

    if acceptable {
        Ok(())
    } else {
        Err(BridgeError::NotAcceptable)
    }
}

fn check_content_type(request: &GenericRequest) -> Result<()> {
    match request.header_str(CONTENT_TYPE.as_str()) {
        Some(value) if media_type(value) == "application/json" => Ok(()),
        _ => Err(BridgeError::UnsupportedMediaType),
    }
}

fn check_protocol_version(request: &GenericRequest) -> Result<()> {
    match request.headers.get(PROTOCOL_VERSION_HEADER) {
        None => Ok(()),
        Some(value) => {
            let version = value.to_str().unwrap_or_default().trim();
            if is_supported_protocol_version(version) {
                Ok(())
            } else {
                warn!(version, "Rejecting unsupported protocol version header");
                Err(BridgeError::UnsupportedProtocolVersion(version.to_string()))
            }
        }
    }
}

fn decode_body(body: &[u8]) -> Result<Payload> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| BridgeError::Parse(e.to_string()))?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(BridgeError::InvalidMessage("empty batch".to_string()));
            }
            items
                .into_iter()
                .map(decode_message)
                .collect::<Result<Vec<_>>>()
                .map(Payload::Batch)
        }
        other => decode_message(other).map(Payload::Single),
    }
}

fn decode_message(value: Value) -> Result<JsonRpcMessage> {
    serde_json::from_value(value)
        .map_err(|_| BridgeError::InvalidMessage("not a JSON-RPC 2.0 message".to_string()))
}
