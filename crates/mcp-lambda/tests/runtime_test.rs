// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the Lambda Runtime API client against a mock Runtime API.

mod common;

use common::{ScriptedEngine, Stack, rpc};
use mcp_lambda::runtime::ErrorDocument;
use mcp_lambda::{LambdaRuntime, RuntimeError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NEXT: &str = "/2018-06-01/runtime/invocation/next";

fn api_event(body: &str) -> serde_json::Value {
    json!({
        "version": "2.0",
        "rawPath": "/mcp",
        "headers": { "content-type": "application/json" },
        "requestContext": { "http": { "method": "POST", "sourceIp": "203.0.113.9" } },
        "body": body,
        "isBase64Encoded": false
    })
}

#[tokio::test]
async fn test_process_next_posts_response() {
    let mock_server = MockServer::start().await;
    let stack = Stack::new(ScriptedEngine::new());
    let body = rpc(json!(1), "echo", json!({})).to_string();

    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Lambda-Runtime-Aws-Request-Id", "req-42")
                .insert_header("Lambda-Runtime-Deadline-Ms", "4102444800000")
                .insert_header("Lambda-Runtime-Trace-Id", "Root=1-5759e988-bd862e3fe1be46a994272793")
                .set_body_json(api_event(&body)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/invocation/req-42/response"))
        .and(body_partial_json(json!({
            "statusCode": 200,
            "headers": { "content-type": "application/json" },
            "isBase64Encoded": false
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let runtime = LambdaRuntime::new(&mock_server.uri());
    runtime.process_next(&stack.adapter).await.unwrap();
}

#[tokio::test]
async fn test_next_invocation_reads_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Lambda-Runtime-Aws-Request-Id", "req-7")
                .insert_header("Lambda-Runtime-Deadline-Ms", "4102444800000")
                .insert_header("Lambda-Runtime-Trace-Id", "Root=1-5759e988-bd862e3fe1be46a994272793")
                .set_body_json(api_event("{}")),
        )
        .mount(&mock_server)
        .await;

    let runtime = LambdaRuntime::new(&mock_server.uri());
    let invocation = runtime.next_invocation().await.unwrap();

    assert_eq!(invocation.request_id, "req-7");
    assert_eq!(invocation.deadline_ms, Some(4102444800000));
    assert_eq!(
        invocation.trace_id.as_deref(),
        Some("Root=1-5759e988-bd862e3fe1be46a994272793")
    );
    assert!(invocation.remaining_ms().is_some_and(|ms| ms > 0));
    assert!(!invocation.payload.is_empty());
    assert!(std::env::var("_X_AMZN_TRACE_ID").is_err());
}

#[tokio::test]
async fn test_unrouted_event_is_still_a_response() {
    let mock_server = MockServer::start().await;
    let stack = Stack::new(ScriptedEngine::new());

    let mut event = api_event("{}");
    event["rawPath"] = json!("/elsewhere");

    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Lambda-Runtime-Aws-Request-Id", "req-404")
                .set_body_json(event),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/invocation/req-404/response"))
        .and(body_partial_json(json!({ "statusCode": 404 })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let runtime = LambdaRuntime::new(&mock_server.uri());
    runtime.process_next(&stack.adapter).await.unwrap();
    assert_eq!(stack.supervisor.generation(), 0);
}

#[tokio::test]
async fn test_undecodable_event_posts_error() {
    let mock_server = MockServer::start().await;
    let stack = Stack::new(ScriptedEngine::new());

    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Lambda-Runtime-Aws-Request-Id", "req-sqs")
                .set_body_json(json!({ "Records": [] })),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/invocation/req-sqs/error"))
        .and(body_partial_json(json!({ "errorType": "InvalidEvent" })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let runtime = LambdaRuntime::new(&mock_server.uri());
    runtime.process_next(&stack.adapter).await.unwrap();
    assert_eq!(stack.supervisor.generation(), 0);
}

#[tokio::test]
async fn test_missing_request_id_header() {
    let mock_server = MockServer::start().await;
    let stack = Stack::new(ScriptedEngine::new());

    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_event("{}")))
        .mount(&mock_server)
        .await;

    let runtime = LambdaRuntime::new(&mock_server.uri());
    let err = runtime.process_next(&stack.adapter).await.unwrap_err();
    assert!(matches!(err, RuntimeError::MissingHeader(_)));
}

#[tokio::test]
async fn test_rejected_response_post() {
    let mock_server = MockServer::start().await;
    let stack = Stack::new(ScriptedEngine::new());

    Mock::given(method("GET"))
        .and(path(NEXT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Lambda-Runtime-Aws-Request-Id", "req-late")
                .set_body_json(api_event("{}")),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/invocation/req-late/response"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&mock_server)
        .await;

    let runtime = LambdaRuntime::new(&mock_server.uri());
    let err = runtime.process_next(&stack.adapter).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Rejected { status: 413, .. }));
}

#[tokio::test]
async fn test_init_error_posted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2018-06-01/runtime/init/error"))
        .and(body_partial_json(json!({
            "errorType": "InvalidConfiguration",
            "errorMessage": "invalid value for MCP_ENDPOINT_PATH: must start with '/'"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let runtime = LambdaRuntime::new(&mock_server.uri());
    runtime
        .init_error(&ErrorDocument::new(
            "InvalidConfiguration",
            "invalid value for MCP_ENDPOINT_PATH: must start with '/'",
        ))
        .await
        .unwrap();
}
