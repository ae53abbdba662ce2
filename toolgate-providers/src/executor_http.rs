// toolgate-providers/src/executor_http.rs
// ============================================================================
// Module: HTTP Executor
// Description: Tool execution through an external HTTP service.
// Purpose: Produce the tool result remotely, sync or webhook-bridged.
// Dependencies: toolgate-core, reqwest
// ============================================================================

//! ## Overview
//! The HTTP executor posts the execution request and interprets the reply.
//! Synchronous executors answer with `{status, result?}`; asynchronous
//! executors acknowledge with HTTP 202 (or a `pending` status) and deliver
//! the result later through the executor webhook. The payload carries a
//! `timeout_sec` hint derived from the remaining invocation time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use toolgate_core::interfaces::ExecutionRequest;
use toolgate_core::interfaces::Executor;
use toolgate_core::interfaces::ExecutorError;
use toolgate_core::protocol::ArgumentMap;
use toolgate_core::protocol::ExecutorRequest;
use toolgate_core::protocol::ExecutorResponse;
use toolgate_core::protocol::ExecutorTool;
use toolgate_core::protocol::WebhookCallback;
use toolgate_core::protocol::stringify_result;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_core::runtime::pending::ExecutionOutcome;
use toolgate_core::runtime::pending::ExecutionPendingStore;
use toolgate_core::runtime::pending::ExecutionStatus;
use toolgate_core::runtime::pending::PendingGuard;

use crate::callout::ClientBuildError;
use crate::callout::build_client;
use crate::callout::read_body_limited;
use crate::callout::resolve_method;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default client timeout for executor callouts.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for one HTTP executor.
#[derive(Debug, Clone)]
pub struct HttpExecutorConfig {
    /// Executor endpoint.
    pub url: String,
    /// HTTP method override; POST by default.
    pub method: Option<String>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Client timeout; defaults to ten seconds when `None`.
    pub timeout: Option<Duration>,
    /// Enables the webhook-bridged asynchronous flow.
    pub async_mode: bool,
    /// Webhook URL advertised to the executor in async mode.
    pub webhook_url: Option<String>,
    /// Declarative executor settings forwarded verbatim.
    pub spec: Option<ArgumentMap>,
    /// Tool metadata forwarded to the executor.
    pub tool: ExecutorTool,
    /// Preferred message language.
    pub lang: Option<String>,
    /// Preferred markup flavor.
    pub markup: Option<String>,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Executor backed by an external HTTP service.
pub struct HttpExecutor {
    /// Executor configuration.
    config: HttpExecutorConfig,
    /// HTTP client with the configured timeout.
    client: reqwest::Client,
    /// Pending store for async results.
    pending: Option<Arc<ExecutionPendingStore>>,
}

impl HttpExecutor {
    /// Creates an HTTP executor.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn new(
        config: HttpExecutorConfig,
        pending: Option<Arc<ExecutionPendingStore>>,
    ) -> Result<Self, ClientBuildError> {
        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = build_client(timeout)?;
        Ok(Self {
            config,
            client,
            pending,
        })
    }

    /// Waits for the webhook result or context cancellation.
    async fn await_result(
        &self,
        ctx: &InvocationContext,
        rx: oneshot::Receiver<ExecutionOutcome>,
    ) -> Result<String, ExecutorError> {
        tokio::select! {
            delivered = rx => match delivered {
                Ok(outcome) => match outcome.status {
                    ExecutionStatus::Success => Ok(outcome.result),
                    ExecutionStatus::Error => {
                        let message = if outcome.result.trim().is_empty() {
                            "executor error".to_string()
                        } else {
                            outcome.result
                        };
                        Err(ExecutorError::failed(message))
                    }
                },
                Err(_) => {
                    Err(ExecutorError::failed("execution webhook channel closed"))
                }
            },
            () = ctx.cancelled() => Err(ExecutorError::Cancelled),
        }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(
        &self,
        ctx: &InvocationContext,
        request: &ExecutionRequest,
    ) -> Result<String, ExecutorError> {
        if self.config.url.trim().is_empty() {
            return Err(ExecutorError::failed("executor url is empty"));
        }
        if self.config.async_mode {
            if self.config.webhook_url.as_deref().unwrap_or("").trim().is_empty() {
                return Err(ExecutorError::failed("executor webhook url is empty"));
            }
            if self.pending.is_none() {
                return Err(ExecutorError::failed("executor async store is not configured"));
            }
        }

        // Remaining invocation time, floored at one second when any remains.
        let timeout_sec = ctx.remaining().and_then(|remaining| {
            if remaining.is_zero() {
                return None;
            }
            Some(remaining.as_secs().max(1))
        });

        let payload = ExecutorRequest {
            correlation_id: request.correlation_id.clone(),
            tool: self.config.tool.clone(),
            arguments: request.arguments.clone(),
            spec: self.config.spec.clone(),
            lang: self.config.lang.clone(),
            markup: self.config.markup.clone(),
            timeout_sec,
            callback: self.config.async_mode.then(|| {
                WebhookCallback {
                    url: self.config.webhook_url.clone().unwrap_or_default(),
                }
            }),
        };

        let mut pending_rx = None;
        let mut _pending_guard = None;
        if self.config.async_mode
            && let Some(store) = &self.pending
        {
            let rx = store
                .register(&request.correlation_id, "executor")
                .map_err(|_| ExecutorError::failed("execution already pending"))?;
            pending_rx = Some(rx);
            _pending_guard = Some(PendingGuard::new(Arc::clone(store), &request.correlation_id));
        }

        let mut outbound = self
            .client
            .request(resolve_method(self.config.method.as_deref()), &self.config.url)
            .json(&payload);
        for (key, value) in &self.config.headers {
            outbound = outbound.header(key, value);
        }
        let response = tokio::select! {
            sent = outbound.send() => {
                sent.map_err(|err| {
                    ExecutorError::failed(format!("executor request failed: {err}"))
                })?
            }
            () = ctx.cancelled() => return Err(ExecutorError::Cancelled),
        };

        let status = response.status();
        let body = read_body_limited(response).await;
        let body_text = String::from_utf8_lossy(&body).trim().to_string();
        if !status.is_success() {
            if self.config.async_mode
                && status == reqwest::StatusCode::ACCEPTED
                && let Some(rx) = pending_rx.take()
            {
                return self.await_result(ctx, rx).await;
            }
            return Err(ExecutorError::failed(format!(
                "executor status {}: {body_text}",
                status.as_u16()
            )));
        }

        if self.config.async_mode
            && status == reqwest::StatusCode::ACCEPTED
            && body_text.is_empty()
            && let Some(rx) = pending_rx.take()
        {
            return self.await_result(ctx, rx).await;
        }

        if let Ok(parsed) = serde_json::from_slice::<ExecutorResponse>(&body)
            && !parsed.status.trim().is_empty()
        {
            let result = stringify_result(parsed.result.as_ref());
            return match parsed.status.trim().to_ascii_lowercase().as_str() {
                "success" => {
                    if result.is_empty() {
                        Ok("ok".to_string())
                    } else {
                        Ok(result)
                    }
                }
                "error" => {
                    let message =
                        if result.is_empty() { "executor error".to_string() } else { result };
                    Err(ExecutorError::failed(message))
                }
                "pending" => {
                    if let Some(rx) = pending_rx.take() {
                        return self.await_result(ctx, rx).await;
                    }
                    Err(ExecutorError::failed("executor returned pending status"))
                }
                other => Err(ExecutorError::failed(format!("unknown executor status: {other}"))),
            };
        }

        if self.config.async_mode
            && status == reqwest::StatusCode::ACCEPTED
            && let Some(rx) = pending_rx.take()
        {
            return self.await_result(ctx, rx).await;
        }
        Ok(body_text)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
