// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Invocation adapter: platform events in, platform responses out.
//!
//! Only the designated endpoint path and the allowed methods reach the
//! bridge. Everything else is answered with 404 locally, without starting
//! the engine.

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, debug, info, info_span};

use crate::bridge::TransportBridge;
use crate::config::EndpointConfig;
use crate::error::BridgeError;
use crate::event::{InvocationEvent, InvocationResponse};
use crate::request::{GenericRequest, GenericResponse};

#[derive(Debug)]
pub struct InvocationAdapter {
    endpoint: EndpointConfig,
    bridge: Arc<TransportBridge>,
}

impl InvocationAdapter {
    pub fn new(endpoint: EndpointConfig, bridge: Arc<TransportBridge>) -> Self {
        Self { endpoint, bridge }
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Serve one platform event.
    pub async fn handle_event(&self, event: InvocationEvent) -> InvocationResponse {
        let span = info_span!(
            "invocation",
            method = %event.method(),
            path = %event.path(),
            stage = event.stage().unwrap_or("-"),
            source_ip = event.source_ip().unwrap_or("-"),
        );

        async move {
            let started = Instant::now();
            let response = match event.into_request() {
                Ok(request) => self.dispatch(request).await,
                Err(e) => {
                    debug!(error = %e, "Rejecting malformed event");
                    e.into_response()
                }
            };
            info!(
                status = response.status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Invocation complete"
            );
            InvocationResponse::from(response)
        }
        .instrument(span)
        .await
    }

    /// Route an already-generic request.
    pub async fn dispatch(&self, request: GenericRequest) -> GenericResponse {
        match self.route(&request) {
            Ok(()) => self.bridge.handle(request).await,
            Err(e) => {
                debug!(error = %e, "No route");
                e.into_response()
            }
        }
    }

    /// Check that `request` targets the endpoint with an allowed method.
    pub fn route(&self, request: &GenericRequest) -> Result<(), BridgeError> {
        let path = self.strip_base_path(&request.path);
        let endpoint = self.endpoint.path.as_str();
        let path_matches = path == endpoint
            || path
                .strip_prefix(endpoint)
                .is_some_and(|rest| rest == "/");

        if path_matches && self.endpoint.allowed_methods.contains(&request.method) {
            Ok(())
        } else {
            Err(BridgeError::Routing {
                method: request.method.to_string(),
                path: request.path.clone(),
            })
        }
    }

    fn strip_base_path<'a>(&self, path: &'a str) -> &'a str {
        let Some(base) = self.endpoint.base_path.as_deref() else {
            return path;
        };
        match path.strip_prefix(base) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }
}
