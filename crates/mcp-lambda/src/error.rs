// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for mcp-lambda.
//!
//! Every [`BridgeError`] maps to an HTTP status and, except for routing
//! misses, a JSON-RPC error body with a `null` id.

use http::header::{ALLOW, HeaderValue};
use http::StatusCode;
use mcp_engine::JsonRpcMessage;
use mcp_engine::message::{INTERNAL_ERROR, INVALID_REQUEST, PARSE_ERROR};

use crate::request::GenericResponse;

/// Result type using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

/// JSON-RPC code used for transport-level refusals with no standard code.
pub const SERVER_ERROR: i64 = -32000;

/// Errors produced while routing, translating or bridging one invocation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BridgeError {
    /// Path or method outside the designated endpoint.
    #[error("no route for {method} {path}")]
    Routing { method: String, path: String },

    /// The platform event could not be turned into a request.
    #[error("malformed invocation event: {0}")]
    Translation(String),

    /// The body is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The body is JSON but not a JSON-RPC message or non-empty batch.
    #[error("Invalid Request: {0}")]
    InvalidMessage(String),

    /// The `Accept` header rules out a JSON reply.
    #[error("Not Acceptable: client must accept application/json")]
    NotAcceptable,

    /// The body is not declared as JSON.
    #[error("Unsupported Media Type: Content-Type must be application/json")]
    UnsupportedMediaType,

    /// The `MCP-Protocol-Version` header names an unknown revision.
    #[error("Bad Request: Unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),

    /// The method has no meaning for a stateless buffered transport.
    #[error("Method Not Allowed: {0}")]
    MethodNotAllowed(&'static str),

    /// The engine went away while a request was in flight.
    #[error("engine round trip failed: {0}")]
    EngineRoundTrip(String),

    /// No engine task could be started.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),
}

impl BridgeError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Routing { .. } => StatusCode::NOT_FOUND,
            Self::Translation(_)
            | Self::Parse(_)
            | Self::InvalidMessage(_)
            | Self::UnsupportedProtocolVersion(_) => StatusCode::BAD_REQUEST,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::EngineRoundTrip(_) | Self::EngineUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON-RPC error code, or `None` when the reply is not a JSON-RPC body.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Self::Routing { .. } => None,
            Self::Parse(_) => Some(PARSE_ERROR),
            Self::Translation(_)
            | Self::InvalidMessage(_)
            | Self::NotAcceptable
            | Self::UnsupportedMediaType
            | Self::UnsupportedProtocolVersion(_) => Some(INVALID_REQUEST),
            Self::MethodNotAllowed(_) => Some(SERVER_ERROR),
            Self::EngineRoundTrip(_) | Self::EngineUnavailable(_) => Some(INTERNAL_ERROR),
        }
    }

    /// Whether the error means the engine task is unusable.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::EngineRoundTrip(_) | Self::EngineUnavailable(_))
    }

    /// Render the error as a complete response.
    pub fn into_response(self) -> GenericResponse {
        let status = self.status();
        let mut response = match self.error_code() {
            Some(code) => {
                GenericResponse::json(status, &JsonRpcMessage::error(None, code, self.to_string()))
            }
            None => GenericResponse::text(status, "Not Found"),
        };
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers
                .insert(ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}
