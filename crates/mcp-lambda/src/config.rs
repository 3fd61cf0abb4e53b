// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;

use http::Method;

/// Session handling of the transport. Only stateless operation is possible
/// when every call may land on a different process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// No session id is issued, expected or validated.
    #[default]
    Stateless,
}

impl SessionMode {
    /// Value accepted in `MCP_SESSION_MODE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Stateless => "stateless",
        }
    }
}

/// Reply format of the transport. Only complete buffered JSON bodies are
/// possible when the platform closes the connection after each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// One `application/json` body per call.
    #[default]
    Json,
}

impl ResponseMode {
    /// Value accepted in `MCP_RESPONSE_MODE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Json => "json",
        }
    }
}

/// Which invocations are routed to the transport bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Designated endpoint path, without trailing `/`.
    pub path: String,
    /// Methods forwarded to the bridge.
    pub allowed_methods: Vec<Method>,
    /// Stage prefix stripped from incoming paths before matching.
    pub base_path: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            path: "/mcp".to_string(),
            allowed_methods: vec![Method::GET, Method::POST, Method::DELETE],
            base_path: None,
        }
    }
}

/// mcp-lambda configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Routing of invocations to the bridge
    pub endpoint: EndpointConfig,
    /// Session handling (fixed to stateless)
    pub session_mode: SessionMode,
    /// Reply format (fixed to buffered JSON)
    pub response_mode: ResponseMode,
    /// Server name reported during `initialize`
    pub server_name: String,
    /// Optional instructions reported during `initialize`
    pub server_instructions: Option<String>,
    /// Bind address of the local development server
    pub local_addr: SocketAddr,
    /// Lambda Runtime API host; `None` outside Lambda
    pub runtime_api: Option<String>,
}

/// Methods the transport knows how to answer.
const SUPPORTED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::DELETE];

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `MCP_ENDPOINT_PATH`: endpoint path (default: /mcp)
    /// - `MCP_ALLOWED_METHODS`: comma-separated methods (default: GET,POST,DELETE)
    /// - `MCP_BASE_PATH`: stage prefix stripped before routing (default: none)
    /// - `MCP_SESSION_MODE`: must be `stateless` (default: stateless)
    /// - `MCP_RESPONSE_MODE`: must be `json` (default: json)
    /// - `MCP_SERVER_NAME`: server name (default: mcp-lambda)
    /// - `MCP_SERVER_INSTRUCTIONS`: instructions for clients (default: none)
    /// - `MCP_LOCAL_ADDR`: local server address (default: 127.0.0.1:8080)
    /// - `AWS_LAMBDA_RUNTIME_API`: set by Lambda; selects Lambda mode
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = normalize_path(
            &std::env::var("MCP_ENDPOINT_PATH").unwrap_or_else(|_| "/mcp".to_string()),
        )
        .ok_or(ConfigError::Invalid(
            "MCP_ENDPOINT_PATH",
            "must start with '/' and name a non-root path",
        ))?;

        let allowed_methods = parse_methods(
            &std::env::var("MCP_ALLOWED_METHODS")
                .unwrap_or_else(|_| "GET,POST,DELETE".to_string()),
        )?;

        let base_path = match std::env::var("MCP_BASE_PATH") {
            Ok(v) if !v.trim().is_empty() => Some(normalize_path(&v).ok_or(
                ConfigError::Invalid("MCP_BASE_PATH", "must start with '/'"),
            )?),
            _ => None,
        };

        let session_mode = match std::env::var("MCP_SESSION_MODE") {
            Ok(v) if !v.eq_ignore_ascii_case("stateless") => {
                return Err(ConfigError::Invalid(
                    "MCP_SESSION_MODE",
                    "only 'stateless' is supported",
                ));
            }
            _ => SessionMode::Stateless,
        };

        let response_mode = match std::env::var("MCP_RESPONSE_MODE") {
            Ok(v) if !v.eq_ignore_ascii_case("json") => {
                return Err(ConfigError::Invalid(
                    "MCP_RESPONSE_MODE",
                    "only 'json' is supported",
                ));
            }
            _ => ResponseMode::Json,
        };

        let server_name =
            std::env::var("MCP_SERVER_NAME").unwrap_or_else(|_| "mcp-lambda".to_string());

        let server_instructions = std::env::var("MCP_SERVER_INSTRUCTIONS")
            .ok()
            .filter(|v| !v.is_empty());

        let local_addr: SocketAddr = std::env::var("MCP_LOCAL_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("MCP_LOCAL_ADDR", "must be a socket address"))?;

        let runtime_api = std::env::var("AWS_LAMBDA_RUNTIME_API")
            .ok()
            .filter(|v| !v.is_empty());

        Ok(Self {
            endpoint: EndpointConfig {
                path,
                allowed_methods,
                base_path,
            },
            session_mode,
            response_mode,
            server_name,
            server_instructions,
            local_addr,
            runtime_api,
        })
    }
}

/// Strip trailing separators; `None` unless the path is absolute and non-root.
fn normalize_path(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if !raw.starts_with('/') {
        return None;
    }
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn parse_methods(raw: &str) -> Result<Vec<Method>, ConfigError> {
    let mut methods = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let method = Method::from_bytes(item.to_ascii_uppercase().as_bytes())
            .ok()
            .filter(|m| SUPPORTED_METHODS.contains(m))
            .ok_or(ConfigError::Invalid(
                "MCP_ALLOWED_METHODS",
                "methods must be among GET, POST, DELETE",
            ))?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        return Err(ConfigError::Invalid(
            "MCP_ALLOWED_METHODS",
            "at least one method is required",
        ));
    }
    Ok(methods)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 9] = [
        "MCP_ENDPOINT_PATH",
        "MCP_ALLOWED_METHODS",
        "MCP_BASE_PATH",
        "MCP_SESSION_MODE",
        "MCP_RESPONSE_MODE",
        "MCP_SERVER_NAME",
        "MCP_SERVER_INSTRUCTIONS",
        "MCP_LOCAL_ADDR",
        "AWS_LAMBDA_RUNTIME_API",
    ];

    /// Helper to set env vars for a test and restore them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        /// Start from a clean slate for every variable the loader reads.
        fn clean() -> Self {
            let mut guard = Self { vars: Vec::new() };
            for key in VARS {
                guard.remove(key);
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _guard = EnvGuard::clean();

        let config = Config::from_env().unwrap();

        assert_eq!(config.endpoint, EndpointConfig::default());
        assert_eq!(config.session_mode, SessionMode::Stateless);
        assert_eq!(config.response_mode, ResponseMode::Json);
        assert_eq!(config.server_name, "mcp-lambda");
        assert!(config.server_instructions.is_none());
        assert_eq!(config.local_addr.port(), 8080);
        assert!(config.runtime_api.is_none());
    }

    #[test]
    fn test_config_custom_endpoint_and_base_path() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();

        guard.set("MCP_ENDPOINT_PATH", "/api/mcp/");
        guard.set("MCP_BASE_PATH", "/prod/");
        guard.set("MCP_ALLOWED_METHODS", "post, get,POST");

        let config = Config::from_env().unwrap();

        assert_eq!(config.endpoint.path, "/api/mcp");
        assert_eq!(config.endpoint.base_path.as_deref(), Some("/prod"));
        assert_eq!(
            config.endpoint.allowed_methods,
            vec![Method::POST, Method::GET]
        );
    }

    #[test]
    fn test_config_lambda_mode() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();

        guard.set("AWS_LAMBDA_RUNTIME_API", "127.0.0.1:9001");
        guard.set("MCP_SERVER_NAME", "cost-tools");
        guard.set("MCP_SERVER_INSTRUCTIONS", "Use the tools.");

        let config = Config::from_env().unwrap();

        assert_eq!(config.runtime_api.as_deref(), Some("127.0.0.1:9001"));
        assert_eq!(config.server_name, "cost-tools");
        assert_eq!(config.server_instructions.as_deref(), Some("Use the tools."));
    }

    #[test]
    fn test_config_invalid_endpoint_path() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();

        guard.set("MCP_ENDPOINT_PATH", "mcp");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MCP_ENDPOINT_PATH", _)));

        guard.set("MCP_ENDPOINT_PATH", "/");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MCP_ENDPOINT_PATH", _)));
    }

    #[test]
    fn test_config_rejects_unsupported_methods() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();

        guard.set("MCP_ALLOWED_METHODS", "GET,PUT");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MCP_ALLOWED_METHODS", _)));

        guard.set("MCP_ALLOWED_METHODS", " , ");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MCP_ALLOWED_METHODS", _)));
    }

    #[test]
    fn test_config_fixed_modes() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();

        guard.set("MCP_SESSION_MODE", "Stateless");
        guard.set("MCP_RESPONSE_MODE", "JSON");
        let config = Config::from_env().unwrap();
        assert_eq!(config.session_mode.as_str(), "stateless");
        assert_eq!(config.response_mode.as_str(), "json");

        // The logged names are accepted back
        guard.set("MCP_SESSION_MODE", config.session_mode.as_str());
        guard.set("MCP_RESPONSE_MODE", config.response_mode.as_str());
        assert!(Config::from_env().is_ok());

        guard.set("MCP_SESSION_MODE", "stateful");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MCP_SESSION_MODE", _)));

        guard.set("MCP_SESSION_MODE", "stateless");
        guard.set("MCP_RESPONSE_MODE", "sse");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MCP_RESPONSE_MODE", _)));
    }

    #[test]
    fn test_config_invalid_local_addr() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();

        guard.set("MCP_LOCAL_ADDR", "not_an_addr");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MCP_LOCAL_ADDR", _)));
        assert!(err.to_string().contains("MCP_LOCAL_ADDR"));
    }

    #[test]
    fn test_config_error_display() {
        let invalid = ConfigError::Invalid("MY_VAR", "must be a number");
        assert_eq!(
            invalid.to_string(),
            "invalid value for MY_VAR: must be a number"
        );
    }
}
