// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Local development server.
//!
//! Serves the invocation adapter over plain HTTP so the endpoint can be tried
//! with any MCP client without deploying. Every request goes through the same
//! routing as a Lambda invocation.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::adapter::InvocationAdapter;
use crate::request::GenericRequest;

/// Router forwarding every request to the adapter.
pub fn router(adapter: Arc<InvocationAdapter>) -> Router {
    Router::new().fallback(forward).with_state(adapter)
}

async fn forward(
    State(adapter): State<Arc<InvocationAdapter>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = GenericRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    };
    let response = adapter.dispatch(request).await;
    (response.status, response.headers, response.body).into_response()
}

/// Serve on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, adapter: Arc<InvocationAdapter>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        addr = %addr,
        endpoint = %adapter.endpoint().path,
        "Local MCP server listening"
    );

    axum::serve(listener, router(adapter))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Local MCP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C signal"),
        Err(e) => {
            warn!(error = %e, "Failed to install Ctrl+C handler; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
