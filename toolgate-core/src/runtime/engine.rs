// toolgate-core/src/runtime/engine.rs
// ============================================================================
// Module: Invocation Engine
// Description: Per-invocation state machine for registered tools.
// Purpose: Sequence correlation, cache, approval, execution, and audit.
// Dependencies: crate::runtime, tracing
// ============================================================================

//! ## Overview
//! One invocation flows through the engine as: derive the correlation ID,
//! consult the idempotency cache, run the approver chain, run the executor,
//! then post-process and cache the response. Every invocation-time failure
//! is normalized into a response triple; nothing escapes to the transport
//! as an error. Context deadlines observed during approval or execution
//! produce the tool's timeout message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::audit::AuditEvent;
use crate::audit::AuditKind;
use crate::audit::AuditSink;
use crate::correlation::CorrelationIdGenerator;
use crate::correlation::DerivedCorrelation;
use crate::correlation::derive_correlation;
use crate::interfaces::ApprovalRequest;
use crate::interfaces::ExecutionRequest;
use crate::interfaces::Executor;
use crate::interfaces::ExecutorError;
use crate::protocol::ArgumentMap;
use crate::protocol::ToolDecision;
use crate::protocol::ToolResponse;
use crate::protocol::ToolStatus;
use crate::redact::redact_arguments;
use crate::runtime::cache::IdempotencyCache;
use crate::runtime::cache_key::KeyStrategy;
use crate::runtime::cache_key::derive_cache_key;
use crate::runtime::chain::ApproverChain;
use crate::runtime::context::InvocationContext;

// ============================================================================
// SECTION: Registered Tool
// ============================================================================

/// A tool wired for invocation.
pub struct RegisteredTool {
    /// Tool name.
    pub name: String,
    /// Invocation timeout; `None` reuses the caller context unchanged.
    pub timeout: Option<Duration>,
    /// Message returned when the invocation times out.
    pub timeout_message: Option<String>,
    /// Forces the approval step even with an empty chain.
    pub requires_approval: bool,
    /// Ordered approver chain.
    pub chain: ApproverChain,
    /// Executor producing the tool result.
    pub executor: Arc<dyn Executor>,
}

impl RegisteredTool {
    /// Returns the timeout message, defaulting to "timeout".
    fn timeout_reason(&self) -> String {
        match &self.timeout_message {
            Some(message) if !message.trim().is_empty() => message.clone(),
            _ => "timeout".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Response Format
// ============================================================================

/// Presentation flavors selected via the `response_format` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseFormat {
    /// Leave the reason untouched.
    Plain,
    /// Rewrite the reason into a markdown summary.
    Markdown,
}

/// Extracts the response format hint from the arguments.
fn response_format(arguments: &ArgumentMap) -> ResponseFormat {
    let raw = match arguments.get("response_format") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => return ResponseFormat::Plain,
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "markdown" => ResponseFormat::Markdown,
        _ => ResponseFormat::Plain,
    }
}

/// Applies response-format post-processing to the reason.
fn apply_response_format(format: ResponseFormat, response: &mut ToolResponse) {
    if format != ResponseFormat::Markdown {
        return;
    }
    let message = response.reason.trim();
    let message = if message.is_empty() { "no details" } else { message };
    response.reason = format!(
        "**status**: {}\n**decision**: {}\n\n{}",
        response.status, response.decision, message
    );
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Glues the runtime components into the per-invocation state machine.
pub struct InvocationEngine {
    /// Correlation ID generator for invocations without a client ID.
    correlation: CorrelationIdGenerator,
    /// Idempotency cache, when configured.
    cache: Option<Arc<IdempotencyCache>>,
    /// Cache key strategy.
    key_strategy: KeyStrategy,
    /// Audit sink for invocation transitions.
    audit: Arc<dyn AuditSink>,
}

impl InvocationEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        cache: Option<Arc<IdempotencyCache>>,
        key_strategy: KeyStrategy,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            correlation: CorrelationIdGenerator::new(),
            cache,
            key_strategy,
            audit,
        }
    }

    /// Runs one invocation to completion.
    pub async fn invoke(
        &self,
        tool: &RegisteredTool,
        ctx: &InvocationContext,
        arguments: ArgumentMap,
    ) -> ToolResponse {
        let correlation = derive_correlation(&arguments, &self.correlation);
        let format = response_format(&arguments);
        let redacted = redact_arguments(&arguments);
        tracing::info!(
            tool = %tool.name,
            correlation_id = %correlation.id,
            args = %serde_json::Value::Object(redacted),
            "tool call"
        );
        self.record(AuditEvent::new(AuditKind::ToolCall, &tool.name, &correlation.id));

        let cache_key = self.cache_key(tool, &correlation, &arguments);
        if let Some(response) = self.cache_lookup(tool, &correlation, cache_key.as_deref()) {
            return response;
        }

        let ctx_tool = match tool.timeout {
            Some(timeout) if !timeout.is_zero() => ctx.with_timeout(timeout),
            _ => ctx.clone(),
        };

        if tool.requires_approval || !tool.chain.is_empty() {
            if tool.chain.is_empty() {
                let mut response = ToolResponse::denied(
                    "approval required but no approvers configured",
                    &correlation.id,
                );
                apply_response_format(format, &mut response);
                return response;
            }
            let request = ApprovalRequest {
                tool_name: tool.name.clone(),
                arguments: arguments.clone(),
                correlation_id: correlation.id.clone(),
            };
            match tool.chain.approve(&ctx_tool, &request).await {
                Err(err) => {
                    if ctx_tool.is_deadline_exceeded() {
                        return self.timeout_response(tool, &correlation, format);
                    }
                    let mut response = ToolResponse::error(err.to_string(), &correlation.id);
                    self.record(
                        AuditEvent::new(AuditKind::ApprovalError, &tool.name, &correlation.id)
                            .with_decision(ToolDecision::Error)
                            .with_reason(err.to_string()),
                    );
                    apply_response_format(format, &mut response);
                    return response;
                }
                Ok(decision) => {
                    if ctx_tool.is_deadline_exceeded() {
                        return self.timeout_response(tool, &correlation, format);
                    }
                    if !decision.allowed {
                        let mut response =
                            ToolResponse::denied(decision.reason.clone(), &correlation.id);
                        self.record(
                            AuditEvent::new(AuditKind::ApprovalDenied, &tool.name, &correlation.id)
                                .with_decision(ToolDecision::Deny)
                                .with_reason(decision.reason),
                        );
                        apply_response_format(format, &mut response);
                        return response;
                    }
                    self.record(
                        AuditEvent::new(AuditKind::ApprovalOk, &tool.name, &correlation.id)
                            .with_decision(ToolDecision::Approve)
                            .with_reason(decision.reason),
                    );
                }
            }
        }

        let request = ExecutionRequest {
            tool_name: tool.name.clone(),
            arguments,
            correlation_id: correlation.id.clone(),
        };
        let output = match tool.executor.execute(&ctx_tool, &request).await {
            Err(err) => {
                if ctx_tool.is_deadline_exceeded() {
                    return self.timeout_response(tool, &correlation, format);
                }
                let reason = match err {
                    ExecutorError::Failed {
                        message,
                        output,
                    } if !output.is_empty() => format!("{message}: {output}"),
                    other => other.to_string(),
                };
                let mut response = ToolResponse::error(reason.clone(), &correlation.id);
                self.record(
                    AuditEvent::new(AuditKind::ToolError, &tool.name, &correlation.id)
                        .with_decision(ToolDecision::Error)
                        .with_reason(reason),
                );
                apply_response_format(format, &mut response);
                return response;
            }
            Ok(output) => output,
        };
        if ctx_tool.is_deadline_exceeded() {
            return self.timeout_response(tool, &correlation, format);
        }

        let mut response = ToolResponse::success(output.clone(), &correlation.id);
        apply_response_format(format, &mut response);
        self.record(
            AuditEvent::new(AuditKind::ToolOk, &tool.name, &correlation.id)
                .with_decision(ToolDecision::Approve)
                .with_reason(output),
        );
        if let (Some(cache), Some(key)) = (&self.cache, cache_key.as_deref())
            && response.status != ToolStatus::Error
        {
            cache.set(key, response.clone());
            tracing::info!(tool = %tool.name, correlation_id = %correlation.id, "tool response cached");
            self.record(
                AuditEvent::new(AuditKind::CacheStore, &tool.name, &correlation.id)
                    .with_decision(response.decision)
                    .with_reason(response.reason.clone()),
            );
        }
        response
    }

    /// Derives the cache key; failures only disable caching for this call.
    fn cache_key(
        &self,
        tool: &RegisteredTool,
        correlation: &DerivedCorrelation,
        arguments: &ArgumentMap,
    ) -> Option<String> {
        self.cache.as_ref()?;
        match derive_cache_key(&tool.name, correlation, arguments, self.key_strategy) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(tool = %tool.name, error = %err, "cache key build failed");
                None
            }
        }
    }

    /// Returns a cached response when one exists.
    fn cache_lookup(
        &self,
        tool: &RegisteredTool,
        correlation: &DerivedCorrelation,
        cache_key: Option<&str>,
    ) -> Option<ToolResponse> {
        let cache = self.cache.as_ref()?;
        let key = cache_key?;
        let mut cached = cache.get(key)?;
        cached.correlation_id = correlation.id.clone();
        tracing::info!(tool = %tool.name, correlation_id = %correlation.id, "tool cache hit");
        self.record(
            AuditEvent::new(AuditKind::CacheHit, &tool.name, &correlation.id)
                .with_decision(cached.decision)
                .with_reason(cached.reason.clone()),
        );
        Some(cached)
    }

    /// Builds the normalized timeout response.
    fn timeout_response(
        &self,
        tool: &RegisteredTool,
        correlation: &DerivedCorrelation,
        format: ResponseFormat,
    ) -> ToolResponse {
        let mut response = ToolResponse::error(tool.timeout_reason(), &correlation.id);
        apply_response_format(format, &mut response);
        response
    }

    /// Records one audit event.
    fn record(&self, event: AuditEvent) {
        self.audit.record(&event);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
