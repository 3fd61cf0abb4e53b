// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API Gateway proxy payloads and their translation to generic requests.
//!
//! Both the HTTP API (payload format 2.0) and the REST API (payload format
//! 1.0) shapes are accepted. Envelope fields such as the request context are
//! only read for logging and never reach the bridge.

use std::collections::{BTreeMap, HashMap};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{COOKIE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::request::{GenericRequest, GenericResponse};

/// An invocation event as delivered by the platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InvocationEvent {
    /// HTTP API, payload format 2.0
    HttpV2(HttpApiEvent),
    /// REST API, payload format 1.0
    RestV1(RestApiEvent),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiEvent {
    #[serde(default)]
    pub version: Option<String>,
    pub raw_path: String,
    #[serde(default)]
    pub raw_query_string: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub cookies: Option<Vec<String>>,
    pub request_context: HttpApiRequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiRequestContext {
    pub http: HttpDescription,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpDescription {
    pub method: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_headers: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub request_context: Option<RestApiRequestContext>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiRequestContext {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub identity: Option<RestApiIdentity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiIdentity {
    #[serde(default)]
    pub source_ip: Option<String>,
}

impl InvocationEvent {
    /// Raw HTTP method as sent by the platform.
    pub fn method(&self) -> &str {
        match self {
            Self::HttpV2(e) => &e.request_context.http.method,
            Self::RestV1(e) => &e.http_method,
        }
    }

    /// Path as sent by the platform, including any stage prefix.
    pub fn path(&self) -> &str {
        match self {
            Self::HttpV2(e) => &e.raw_path,
            Self::RestV1(e) => &e.path,
        }
    }

    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::HttpV2(e) => e.request_context.stage.as_deref(),
            Self::RestV1(e) => e.request_context.as_ref()?.stage.as_deref(),
        }
    }

    pub fn source_ip(&self) -> Option<&str> {
        match self {
            Self::HttpV2(e) => e.request_context.http.source_ip.as_deref(),
            Self::RestV1(e) => e
                .request_context
                .as_ref()?
                .identity
                .as_ref()?
                .source_ip
                .as_deref(),
        }
    }

    /// Strip the envelope, keeping method, path, headers and body.
    pub fn into_request(self) -> Result<GenericRequest> {
        let method = parse_method(self.method())?;
        let mut headers = HeaderMap::new();

        let (path, body, is_base64) = match self {
            Self::HttpV2(e) => {
                for (name, value) in e.headers.unwrap_or_default() {
                    append_header(&mut headers, &name, &value)?;
                }
                if let Some(cookies) = e.cookies.filter(|c| !c.is_empty()) {
                    headers.remove(COOKIE);
                    append_header(&mut headers, COOKIE.as_str(), &cookies.join("; "))?;
                }
                (e.raw_path, e.body, e.is_base64_encoded)
            }
            Self::RestV1(e) => {
                let multi = e.multi_value_headers.unwrap_or_default();
                for (name, values) in &multi {
                    for value in values {
                        append_header(&mut headers, name, value)?;
                    }
                }
                for (name, value) in e.headers.unwrap_or_default() {
                    let seen = multi.keys().any(|k| k.eq_ignore_ascii_case(&name));
                    if !seen {
                        append_header(&mut headers, &name, &value)?;
                    }
                }
                (e.path, e.body, e.is_base64_encoded)
            }
        };

        let body = match body {
            None => Bytes::new(),
            Some(body) if is_base64 => STANDARD
                .decode(body.as_bytes())
                .map(Bytes::from)
                .map_err(|e| BridgeError::Translation(format!("invalid base64 body: {}", e)))?,
            Some(body) => Bytes::from(body),
        };

        Ok(GenericRequest {
            method,
            path,
            headers,
            body,
        })
    }
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| BridgeError::Translation(format!("invalid HTTP method '{}'", raw)))
}

fn append_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| BridgeError::Translation(format!("invalid header name '{}'", name)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| BridgeError::Translation(format!("invalid value for header '{}'", name)))?;
    headers.append(name, value);
    Ok(())
}

/// Proxy integration response understood by both payload formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl From<GenericResponse> for InvocationResponse {
    fn from(response: GenericResponse) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &response.headers {
            let Ok(value) = value.to_str() else {
                tracing::warn!(header = %name, "Dropping non-text response header");
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let (body, is_base64_encoded) = match std::str::from_utf8(&response.body) {
            Ok(text) => (text.to_string(), false),
            Err(_) => (STANDARD.encode(&response.body), true),
        };

        Self {
            status_code: response.status.as_u16(),
            headers,
            body,
            is_base64_encoded,
        }
    }
}
