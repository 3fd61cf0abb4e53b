// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client for the Lambda Runtime API.
//!
//! The host hands out invocations one at a time: `next` blocks until an event
//! is available, and the process reports the outcome against the request id
//! before asking for the next one.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::adapter::InvocationAdapter;
use crate::event::{InvocationEvent, InvocationResponse};

const API_VERSION: &str = "2018-06-01";

const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";
const DEADLINE_HEADER: &str = "lambda-runtime-deadline-ms";
const TRACE_ID_HEADER: &str = "lambda-runtime-trace-id";

/// Errors talking to the Runtime API.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The HTTP exchange itself failed.
    #[error("runtime API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A header the Runtime API always sends was absent.
    #[error("runtime API response missing header {0}")]
    MissingHeader(&'static str),

    /// The Runtime API answered with a non-success status.
    #[error("runtime API rejected {endpoint} with status {status}")]
    Rejected { endpoint: String, status: u16 },
}

/// One event handed out by `invocation/next`.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    /// Deadline in milliseconds since the Unix epoch.
    pub deadline_ms: Option<u64>,
    pub trace_id: Option<String>,
    pub payload: Bytes,
}

impl Invocation {
    /// Milliseconds left before the host kills the invocation.
    pub fn remaining_ms(&self) -> Option<u64> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_millis() as u64;
        self.deadline_ms.map(|deadline| deadline.saturating_sub(now))
    }
}

/// Error document accepted by the `error` endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDocument {
    pub error_type: String,
    pub error_message: String,
}

impl ErrorDocument {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }
}

/// Runtime API client bound to one host.
#[derive(Debug, Clone)]
pub struct LambdaRuntime {
    client: reqwest::Client,
    base_url: String,
}

impl LambdaRuntime {
    /// `runtime_api` is the value of `AWS_LAMBDA_RUNTIME_API` (`host:port`),
    /// or a full `http://` URL.
    pub fn new(runtime_api: &str) -> Self {
        let root = if runtime_api.contains("://") {
            runtime_api.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", runtime_api)
        };
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/{}/runtime", root, API_VERSION),
        }
    }

    /// Block until the host delivers the next invocation.
    pub async fn next_invocation(&self) -> Result<Invocation, RuntimeError> {
        let endpoint = format!("{}/invocation/next", self.base_url);
        let response = self.client.get(&endpoint).send().await?;
        if !response.status().is_success() {
            return Err(RuntimeError::Rejected {
                endpoint,
                status: response.status().as_u16(),
            });
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let request_id = header(REQUEST_ID_HEADER).ok_or(RuntimeError::MissingHeader(REQUEST_ID_HEADER))?;
        let deadline_ms = header(DEADLINE_HEADER).and_then(|v| v.parse().ok());
        let trace_id = header(TRACE_ID_HEADER);

        let payload = response.bytes().await?;

        Ok(Invocation {
            request_id,
            deadline_ms,
            trace_id,
            payload,
        })
    }

    /// Report a successful invocation.
    pub async fn send_response(
        &self,
        request_id: &str,
        response: &InvocationResponse,
    ) -> Result<(), RuntimeError> {
        let endpoint = format!("{}/invocation/{}/response", self.base_url, request_id);
        self.post_json(endpoint, response).await
    }

    /// Report a failed invocation.
    pub async fn send_error(
        &self,
        request_id: &str,
        error: &ErrorDocument,
    ) -> Result<(), RuntimeError> {
        let endpoint = format!("{}/invocation/{}/error", self.base_url, request_id);
        self.post_json(endpoint, error).await
    }

    /// Report a failure before the first invocation was requested.
    pub async fn init_error(&self, error: &ErrorDocument) -> Result<(), RuntimeError> {
        let endpoint = format!("{}/init/error", self.base_url);
        self.post_json(endpoint, error).await
    }

    async fn post_json<T: Serialize>(&self, endpoint: String, body: &T) -> Result<(), RuntimeError> {
        let response = self.client.post(&endpoint).json(body).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RuntimeError::Rejected {
                endpoint,
                status: response.status().as_u16(),
            })
        }
    }

    /// Fetch, serve and report exactly one invocation.
    ///
    /// Everything logged while serving it carries the request and trace ids.
    pub async fn process_next(&self, adapter: &InvocationAdapter) -> Result<(), RuntimeError> {
        let invocation = self.next_invocation().await?;
        let span = info_span!(
            "invocation",
            request_id = %invocation.request_id,
            trace_id = invocation.trace_id.as_deref(),
        );
        self.serve(invocation, adapter).instrument(span).await
    }

    async fn serve(
        &self,
        invocation: Invocation,
        adapter: &InvocationAdapter,
    ) -> Result<(), RuntimeError> {
        debug!(remaining_ms = ?invocation.remaining_ms(), "Invocation received");

        match serde_json::from_slice::<InvocationEvent>(&invocation.payload) {
            Ok(event) => {
                let response = adapter.handle_event(event).await;
                self.send_response(&invocation.request_id, &response).await
            }
            Err(e) => {
                warn!(error = %e, "Event is not an API Gateway proxy payload");
                let document = ErrorDocument::new(
                    "InvalidEvent",
                    format!("unsupported invocation payload: {}", e),
                );
                self.send_error(&invocation.request_id, &document).await
            }
        }
    }

    /// Serve invocations until the Runtime API becomes unreachable.
    pub async fn run(&self, adapter: &InvocationAdapter) -> Result<(), RuntimeError> {
        info!(base_url = %self.base_url, "Lambda runtime loop started");
        loop {
            if let Err(e) = self.process_next(adapter).await {
                error!(error = %e, "Runtime API exchange failed");
                return Err(e);
            }
        }
    }
}
