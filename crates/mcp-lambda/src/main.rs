// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! mcp-lambda - MCP server on AWS Lambda
//!
//! Inside Lambda (`AWS_LAMBDA_RUNTIME_API` set) the binary acts as a custom
//! runtime and serves invocations one by one. Anywhere else it serves the same
//! endpoint over local HTTP for development.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use mcp_engine::{InitializationOptions, McpServer};
use mcp_lambda::adapter::InvocationAdapter;
use mcp_lambda::bridge::TransportBridge;
use mcp_lambda::config::Config;
use mcp_lambda::runtime::{ErrorDocument, LambdaRuntime};
use mcp_lambda::supervisor::EngineSupervisor;
use mcp_lambda::{local, tools};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    let in_lambda = std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_some();

    // Initialize tracing; CloudWatch gets one JSON object per line
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("mcp_lambda=info".parse()?)
        .add_directive("mcp_engine=info".parse()?);
    if in_lambda {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .without_time()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting mcp-lambda");

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            if let Ok(api) = std::env::var("AWS_LAMBDA_RUNTIME_API") {
                let document = ErrorDocument::new("InvalidConfiguration", e.to_string());
                if let Err(report) = LambdaRuntime::new(&api).init_error(&document).await {
                    error!(error = %report, "Failed to report init error");
                }
            }
            return Err(e.into());
        }
    };

    info!(
        endpoint = %config.endpoint.path,
        base_path = ?config.endpoint.base_path,
        methods = ?config.endpoint.allowed_methods,
        session_mode = config.session_mode.as_str(),
        response_mode = config.response_mode.as_str(),
        server_name = %config.server_name,
        "Configuration loaded"
    );

    let mut options = InitializationOptions::new(&config.server_name, env!("CARGO_PKG_VERSION"));
    if let Some(instructions) = &config.server_instructions {
        options = options.with_instructions(instructions);
    }
    let engine = Arc::new(McpServer::new(options, tools::builtin_tools()));

    // The engine task itself starts lazily on the first routed request
    let supervisor = Arc::new(EngineSupervisor::new(engine));
    let bridge = Arc::new(TransportBridge::new(supervisor));
    let adapter = Arc::new(InvocationAdapter::new(config.endpoint.clone(), bridge));

    match &config.runtime_api {
        Some(api) => {
            let runtime = LambdaRuntime::new(api);
            runtime.run(&adapter).await?;
        }
        None => local::serve(config.local_addr, adapter).await?,
    }

    info!("Shutdown complete");
    Ok(())
}
