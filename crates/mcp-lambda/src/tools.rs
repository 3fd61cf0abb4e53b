// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Built-in tools served by the binary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use mcp_engine::{CallToolResult, ToolDefinition, ToolError, ToolHandler, ToolRegistry};
use serde_json::{Value, json};

/// Registry with every built-in tool.
pub fn builtin_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(Arc::new(EchoTool))
        .with_tool(Arc::new(CurrentTimeTool))
}

/// Returns its `text` argument unchanged.
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "echo".to_string(),
            description: Some("Echo the given text back to the caller".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to echo" }
                },
                "required": ["text"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<CallToolResult, ToolError> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("'text' must be a string".to_string()))?;
        Ok(CallToolResult::text(text))
    }
}

/// Reports the current UTC time in RFC 3339.
pub struct CurrentTimeTool;

#[async_trait]
impl ToolHandler for CurrentTimeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "current_time".to_string(),
            description: Some("Current UTC time in RFC 3339 format".to_string()),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _arguments: Value) -> Result<CallToolResult, ToolError> {
        Ok(CallToolResult::text(
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_engine::Content;

    fn text_of(result: &CallToolResult) -> &str {
        match &result.content[0] {
            Content::Text { text } => text.as_str(),
        }
    }

    #[tokio::test]
    async fn test_echo() {
        let result = EchoTool.call(json!({"text": "hi"})).await.unwrap();
        assert_eq!(text_of(&result), "hi");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_echo_requires_text() {
        let err = EchoTool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_current_time_is_rfc3339() {
        let result = CurrentTimeTool.call(json!({})).await.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(text_of(&result)).is_ok());
    }

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_tools();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("current_time").is_some());
    }
}
