// toolgate-mcp/src/server.rs
// ============================================================================
// Module: Gateway Server
// Description: JSON-RPC 2.0 MCP server over streamable HTTP and stdio.
// Purpose: Expose registered tools, resources, health, and webhooks.
// Dependencies: toolgate-core, axum, tokio
// ============================================================================

//! ## Overview
//! The server exposes the MCP methods (`initialize`, `ping`, `tools/list`,
//! `tools/call`, `resources/list`, `resources/read`) over two transports: a
//! streamable HTTP endpoint at the configured path and line-oriented stdio
//! (one JSON-RPC message per line). The HTTP host also serves `/healthz`,
//! `/readyz`, and the webhook paths derived from configured webhook URLs.
//! Invocation failures never surface as JSON-RPC errors; they are response
//! triples inside a successful result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use toolgate_core::protocol::ArgumentMap;
use toolgate_core::runtime::context::InvocationContext;

use crate::config::ConfigError;
use crate::config::GatewayConfig;
use crate::config::TransportKind;
use crate::config::webhook_path;
use crate::registry::ToolRegistry;
use crate::webhook::resolve_approval_webhook;
use crate::webhook::resolve_executor_webhook;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted JSON-RPC request body size.
const MAX_BODY_BYTES: usize = 1 << 20;
/// Protocol version reported during the MCP handshake.
const PROTOCOL_VERSION: &str = "2025-03-26";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server lifecycle errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors detected while wiring the server.
    #[error("config error: {0}")]
    Config(String),
    /// Transport failures.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Gateway server bound to one configuration and registry.
pub struct McpServer {
    /// Validated configuration.
    config: GatewayConfig,
    /// Registered tools and resources.
    registry: Arc<ToolRegistry>,
    /// Root shutdown token.
    shutdown: CancellationToken,
    /// Grace period for in-flight work after shutdown begins.
    shutdown_timeout: Duration,
}

impl McpServer {
    /// Creates a server over an already-built registry.
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        registry: Arc<ToolRegistry>,
        shutdown: CancellationToken,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            config,
            registry,
            shutdown,
            shutdown_timeout,
        }
    }

    /// Serves requests on the configured transport until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the transport fails or webhook routes
    /// collide.
    pub async fn serve(self) -> Result<(), ServerError> {
        match self.config.server.transport {
            TransportKind::Stdio => self.serve_stdio().await,
            TransportKind::Http => self.serve_http().await,
        }
    }

    /// Serves line-oriented JSON-RPC over stdin/stdout.
    async fn serve_stdio(self) -> Result<(), ServerError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => {
                    line.map_err(|err| ServerError::Transport(format!("stdio read failed: {err}")))?
                }
                () = self.shutdown.cancelled() => return Ok(()),
            };
            let Some(line) = line else {
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }
            let ctx = InvocationContext::new(self.shutdown.clone());
            let Some(response) = handle_payload(&self.registry, &ctx, line.as_bytes()).await
            else {
                continue;
            };
            let mut payload = serde_json::to_vec(&response.1).map_err(|_| {
                ServerError::Transport("json-rpc serialization failed".to_string())
            })?;
            payload.push(b'\n');
            stdout
                .write_all(&payload)
                .await
                .map_err(|err| ServerError::Transport(format!("stdio write failed: {err}")))?;
            stdout
                .flush()
                .await
                .map_err(|err| ServerError::Transport(format!("stdio write failed: {err}")))?;
        }
    }

    /// Serves JSON-RPC, health, and webhooks over HTTP.
    async fn serve_http(self) -> Result<(), ServerError> {
        let addr = self.config.server.http.listen_addr();
        let path = self.config.server.http.mcp_path();
        let ready = Arc::new(AtomicBool::new(false));
        let state = Arc::new(HttpState {
            registry: Arc::clone(&self.registry),
            shutdown: self.shutdown.clone(),
            ready: Arc::clone(&ready),
        });

        let mut app = Router::new()
            .route(&path, post(handle_mcp))
            .route("/healthz", get(handle_healthz))
            .route("/readyz", get(handle_readyz));
        for (route, kind) in webhook_routes(&self.config)? {
            app = match kind {
                WebhookKind::Approval => app.route(&route, post(handle_approval_webhook)),
                WebhookKind::Executor => app.route(&route, post(handle_executor_webhook)),
            };
        }
        let app = app.with_state(state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        ready.store(true, Ordering::SeqCst);
        tracing::info!(addr = %addr, path = %path, "http server started");

        // Flip readiness as soon as shutdown begins, before draining.
        {
            let ready = Arc::clone(&ready);
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                shutdown.cancelled().await;
                ready.store(false, Ordering::SeqCst);
            });
        }

        let shutdown = self.shutdown.clone();
        let graceful = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned());
        let forced = async {
            self.shutdown.cancelled().await;
            tokio::time::sleep(self.shutdown_timeout).await;
        };
        tokio::select! {
            served = graceful => {
                served.map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
            }
            () = forced => {
                tracing::warn!("shutdown grace period elapsed; dropping in-flight requests");
                Ok(())
            }
        }
    }
}

// ============================================================================
// SECTION: Webhook Routes
// ============================================================================

/// Webhook route kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WebhookKind {
    /// Resolves pending approvals.
    Approval,
    /// Resolves pending executions.
    Executor,
}

/// Collects webhook routes from every configured webhook URL.
///
/// Identical URLs are deduplicated; two different URLs sharing a path are a
/// configuration error.
fn webhook_routes(config: &GatewayConfig) -> Result<Vec<(String, WebhookKind)>, ServerError> {
    let mut seen_urls = std::collections::BTreeSet::new();
    let mut routes: Vec<(String, WebhookKind)> = Vec::new();
    let mut add = |raw: &str, kind: WebhookKind| -> Result<(), ServerError> {
        let raw = raw.trim();
        if raw.is_empty() || !seen_urls.insert(raw.to_string()) {
            return Ok(());
        }
        let Some(path) = webhook_path(raw) else {
            return Ok(());
        };
        if routes.iter().any(|(existing, _)| existing == &path) {
            return Err(ServerError::Config(format!("duplicate webhook route: {path}")));
        }
        routes.push((path, kind));
        Ok(())
    };

    if let Some(url) = &config.server.approval_webhook_url {
        add(url, WebhookKind::Approval)?;
    }
    if let Some(url) = &config.server.executor_webhook_url {
        add(url, WebhookKind::Executor)?;
    }
    for tool in &config.tools {
        for approver in &tool.approvers {
            if let Some(url) = &approver.webhook_url {
                add(url, WebhookKind::Approval)?;
            }
        }
        if let Some(url) = &tool.executor.webhook_url {
            add(url, WebhookKind::Executor)?;
        }
    }
    Ok(routes)
}

// ============================================================================
// SECTION: HTTP Handlers
// ============================================================================

/// Shared state for HTTP handlers.
struct HttpState {
    /// Registered tools and resources.
    registry: Arc<ToolRegistry>,
    /// Root shutdown token for invocation contexts.
    shutdown: CancellationToken,
    /// Readiness flag for `/readyz`.
    ready: Arc<AtomicBool>,
}

/// Handles JSON-RPC requests on the MCP endpoint.
async fn handle_mcp(State(state): State<Arc<HttpState>>, bytes: Bytes) -> Response {
    if bytes.len() > MAX_BODY_BYTES {
        let response = error_response(Value::Null, -32600, "request body too large");
        return json_response(StatusCode::PAYLOAD_TOO_LARGE, &response);
    }
    let ctx = InvocationContext::new(state.shutdown.clone());
    match handle_payload(&state.registry, &ctx, &bytes).await {
        Some((status, response)) => json_response(status, &response),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Handles liveness probes.
async fn handle_healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Handles readiness probes.
async fn handle_readyz(State(state): State<Arc<HttpState>>) -> (StatusCode, &'static str) {
    if state.ready.load(Ordering::SeqCst) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

/// Handles approval webhook callbacks.
async fn handle_approval_webhook(State(state): State<Arc<HttpState>>, bytes: Bytes) -> StatusCode {
    resolve_approval_webhook(state.registry.approvals().as_deref(), &bytes)
}

/// Handles executor webhook callbacks.
async fn handle_executor_webhook(State(state): State<Arc<HttpState>>, bytes: Bytes) -> StatusCode {
    resolve_executor_webhook(state.registry.executions().as_deref(), &bytes)
}

/// Serializes a JSON-RPC response with the right content type.
fn json_response(status: StatusCode, response: &JsonRpcResponse) -> Response {
    match serde_json::to_string(response) {
        Ok(body) => {
            (status, [(CONTENT_TYPE, "application/json")], body).into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Tool arguments; must be an object when present.
    #[serde(default)]
    arguments: Option<Value>,
}

/// Resource read parameters.
#[derive(Debug, Deserialize)]
struct ResourceReadParams {
    /// Resource URI.
    uri: String,
}

/// Builds a successful JSON-RPC response.
fn result_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

/// Builds a JSON-RPC error response.
fn error_response(id: Value, code: i64, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
        }),
    }
}

/// Parses one payload and dispatches it.
///
/// Returns `None` for notifications, which get no response.
async fn handle_payload(
    registry: &ToolRegistry,
    ctx: &InvocationContext,
    bytes: &[u8],
) -> Option<(StatusCode, JsonRpcResponse)> {
    let request: JsonRpcRequest = match serde_json::from_slice(bytes) {
        Ok(request) => request,
        Err(_) => {
            return Some((
                StatusCode::BAD_REQUEST,
                error_response(Value::Null, -32700, "invalid json-rpc request"),
            ));
        }
    };
    if request.jsonrpc != "2.0" {
        let id = request.id.unwrap_or(Value::Null);
        return Some((
            StatusCode::BAD_REQUEST,
            error_response(id, -32600, "invalid json-rpc version"),
        ));
    }
    if request.id.is_none() {
        // Notifications (including notifications/initialized) get no reply.
        return None;
    }
    Some(handle_request(registry, ctx, request).await)
}

/// Dispatches one JSON-RPC request.
async fn handle_request(
    registry: &ToolRegistry,
    ctx: &InvocationContext,
    request: JsonRpcRequest,
) -> (StatusCode, JsonRpcResponse) {
    let id = request.id.unwrap_or(Value::Null);
    match request.method.as_str() {
        "initialize" => (StatusCode::OK, result_response(id, initialize_result(registry))),
        "ping" => (StatusCode::OK, result_response(id, json!({}))),
        "tools/list" => {
            let result = json!({"tools": registry.definitions()});
            (StatusCode::OK, result_response(id, result))
        }
        "tools/call" => handle_tools_call(registry, ctx, id, request.params).await,
        "resources/list" => (StatusCode::OK, result_response(id, resources_list(registry))),
        "resources/read" => handle_resources_read(registry, id, request.params),
        _ => (StatusCode::BAD_REQUEST, error_response(id, -32601, "method not found")),
    }
}

/// Builds the `initialize` result.
fn initialize_result(registry: &ToolRegistry) -> Value {
    let mut capabilities = json!({"tools": {}});
    if !registry.resources().is_empty() {
        capabilities["resources"] = json!({});
    }
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": capabilities,
        "serverInfo": {
            "name": registry.server_name(),
            "version": registry.server_version(),
        },
    })
}

/// Handles `tools/call`.
async fn handle_tools_call(
    registry: &ToolRegistry,
    ctx: &InvocationContext,
    id: Value,
    params: Option<Value>,
) -> (StatusCode, JsonRpcResponse) {
    let params = params.unwrap_or(Value::Null);
    let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
        return (StatusCode::BAD_REQUEST, error_response(id, -32602, "invalid tool params"));
    };
    let arguments: ArgumentMap = match call.arguments {
        None | Some(Value::Null) => ArgumentMap::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return (
                StatusCode::BAD_REQUEST,
                error_response(id, -32602, "tool arguments must be an object"),
            );
        }
    };
    let Some(response) = registry.invoke(&call.name, ctx, arguments).await else {
        return (StatusCode::BAD_REQUEST, error_response(id, -32601, "unknown tool"));
    };
    let Ok(structured) = serde_json::to_value(&response) else {
        return (StatusCode::OK, error_response(id, -32603, "serialization failed"));
    };
    let text = structured.to_string();
    let result = json!({
        "content": [{"type": "text", "text": text}],
        "structuredContent": structured,
    });
    (StatusCode::OK, result_response(id, result))
}

/// Builds the `resources/list` result.
fn resources_list(registry: &ToolRegistry) -> Value {
    let resources: Vec<Value> = registry
        .resources()
        .iter()
        .map(|resource| {
            let mut entry = json!({"uri": resource.uri});
            if let Some(name) = &resource.name {
                entry["name"] = json!(name);
            }
            if let Some(description) = &resource.description {
                entry["description"] = json!(description);
            }
            if let Some(mime_type) = &resource.mime_type {
                entry["mimeType"] = json!(mime_type);
            }
            entry
        })
        .collect();
    json!({"resources": resources})
}

/// Handles `resources/read`.
fn handle_resources_read(
    registry: &ToolRegistry,
    id: Value,
    params: Option<Value>,
) -> (StatusCode, JsonRpcResponse) {
    let params = params.unwrap_or(Value::Null);
    let Ok(read) = serde_json::from_value::<ResourceReadParams>(params) else {
        return (StatusCode::BAD_REQUEST, error_response(id, -32602, "invalid resource params"));
    };
    let Some(resource) = registry.resources().iter().find(|entry| entry.uri == read.uri) else {
        return (StatusCode::OK, error_response(id, -32004, "resource not found"));
    };
    let mut contents = json!({
        "uri": resource.uri,
        "text": resource.text.clone().unwrap_or_default(),
    });
    if let Some(mime_type) = &resource.mime_type {
        contents["mimeType"] = json!(mime_type);
    }
    (StatusCode::OK, result_response(id, json!({"contents": [contents]})))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
