// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! JSON-RPC 2.0 message types carried over the duplex stream pair.
//!
//! Every message travels inside a [`SessionMessage`] envelope. The envelope's
//! correlation id is assigned by the transport and copied by the engine onto
//! the reply, so the transport can route replies without looking at (or
//! rewriting) JSON-RPC ids chosen by callers.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist or is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// The literal `"jsonrpc": "2.0"` member.
///
/// Deserialization rejects any other version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let version = String::deserialize(deserializer)?;
        if version == "2.0" {
            Ok(JsonRpcVersion)
        } else {
            Err(de::Error::custom(format!(
                "unsupported jsonrpc version '{}'",
                version
            )))
        }
    }
}

/// A JSON-RPC request id (number or string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id
    Number(i64),
    /// String id
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

/// A request expecting a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A one-way message; never answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: RequestId,
    pub result: Value,
}

/// Error object of an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An error response. The id is `null` when the request could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: ErrorObject,
}

/// Any JSON-RPC 2.0 message.
///
/// Decoding picks the kind from the members present (`method` with `id` is a
/// request, `method` alone a notification, then `result` or `error`) and
/// decodes strictly as that kind. A `method` with an `id` that is not a
/// string or integer is rejected rather than read as a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
    Error(JsonRpcErrorResponse),
}

impl<'de> Deserialize<'de> for JsonRpcMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Some(object) = value.as_object() else {
            return Err(de::Error::custom("JSON-RPC message must be an object"));
        };

        let message = if object.contains_key("method") {
            if object.contains_key("id") {
                serde_json::from_value(value).map(JsonRpcMessage::Request)
            } else {
                serde_json::from_value(value).map(JsonRpcMessage::Notification)
            }
        } else if object.contains_key("result") {
            serde_json::from_value(value).map(JsonRpcMessage::Response)
        } else if object.contains_key("error") {
            serde_json::from_value(value).map(JsonRpcMessage::Error)
        } else {
            return Err(de::Error::custom(
                "JSON-RPC message needs a method, result or error member",
            ));
        };

        message.map_err(de::Error::custom)
    }
}

impl JsonRpcMessage {
    /// Build a success response for `id`.
    pub fn response(id: RequestId, result: Value) -> Self {
        JsonRpcMessage::Response(JsonRpcResponse {
            jsonrpc: JsonRpcVersion,
            id,
            result,
        })
    }

    /// Build an error response.
    pub fn error(id: Option<RequestId>, code: i64, message: impl Into<String>) -> Self {
        JsonRpcMessage::Error(JsonRpcErrorResponse {
            jsonrpc: JsonRpcVersion,
            id,
            error: ErrorObject {
                code,
                message: message.into(),
                data: None,
            },
        })
    }

    /// Whether the peer is expected to answer this message.
    pub fn expects_reply(&self) -> bool {
        matches!(self, JsonRpcMessage::Request(_))
    }

    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request(r) => Some(&r.method),
            JsonRpcMessage::Notification(n) => Some(&n.method),
            JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_) => None,
        }
    }

    /// Request id, if the message carries one.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Request(r) => Some(&r.id),
            JsonRpcMessage::Response(r) => Some(&r.id),
            JsonRpcMessage::Error(e) => e.id.as_ref(),
            JsonRpcMessage::Notification(_) => None,
        }
    }
}

/// Transport-assigned id linking a request envelope to its reply envelope.
pub type CorrelationId = u64;

/// Envelope moved over the duplex stream pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMessage {
    /// Set on requests by the transport and echoed on replies by the engine.
    pub correlation: Option<CorrelationId>,
    pub message: JsonRpcMessage,
}

impl SessionMessage {
    /// Envelope without correlation (notifications, client responses).
    pub fn new(message: JsonRpcMessage) -> Self {
        Self {
            correlation: None,
            message,
        }
    }

    /// Envelope that expects a correlated reply.
    pub fn correlated(correlation: CorrelationId, message: JsonRpcMessage) -> Self {
        Self {
            correlation: Some(correlation),
            message,
        }
    }

    /// Build the reply envelope for this message.
    pub fn reply(&self, message: JsonRpcMessage) -> Self {
        Self {
            correlation: self.correlation,
            message,
        }
    }
}
