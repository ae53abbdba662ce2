// toolgate-mcp/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Builds runnable tools and listings from the configuration.
// Purpose: Wire executors, approver chains, caching, and pending stores.
// Dependencies: toolgate-core, toolgate-providers
// ============================================================================

//! ## Overview
//! The registry turns validated configuration into registered tools: each
//! tool gets its executor, its approver chain (with timeout decorators),
//! and its listing entry. Pending stores are created once per server when
//! any async callout or webhook URL is configured, so webhook handlers and
//! callouts share the same rendezvous map.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use toolgate_core::audit::AuditSink;
use toolgate_core::interfaces::Approver;
use toolgate_core::interfaces::Executor;
use toolgate_core::messages::Lang;
use toolgate_core::messages::MessageBundle;
use toolgate_core::protocol::ArgumentMap;
use toolgate_core::protocol::ExecutorTool;
use toolgate_core::protocol::ToolResponse;
use toolgate_core::runtime::cache::IdempotencyCache;
use toolgate_core::runtime::chain::ApproverChain;
use toolgate_core::runtime::chain::TimeoutApprover;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_core::runtime::engine::InvocationEngine;
use toolgate_core::runtime::engine::RegisteredTool;
use toolgate_core::runtime::limits::FieldPolicy;
use toolgate_core::runtime::limits::LimitsApprover;
use toolgate_core::runtime::pending::ApprovalPendingStore;
use toolgate_core::runtime::pending::ExecutionPendingStore;
use toolgate_providers::HttpApprover;
use toolgate_providers::HttpApproverConfig;
use toolgate_providers::HttpExecutor;
use toolgate_providers::HttpExecutorConfig;
use toolgate_providers::ShellApprover;
use toolgate_providers::ShellExecutor;

use crate::config::ApproverConfig;
use crate::config::ApproverKind;
use crate::config::ConfigError;
use crate::config::ExecutorKind;
use crate::config::GatewayConfig;
use crate::config::ResourceConfig;
use crate::config::ToolAnnotationsConfig;
use crate::config::ToolConfig;
use crate::config::parse_duration;

// ============================================================================
// SECTION: Listing Entry
// ============================================================================

/// Tool entry surfaced by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-friendly title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Tool description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared input schema; an empty object schema when absent.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Declared output schema.
    #[serde(rename = "outputSchema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Behavior hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotationsConfig>,
    /// Opaque tool metadata.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<ArgumentMap>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Runnable tools plus everything `tools/list` and the webhooks need.
pub struct ToolRegistry {
    /// Server name reported during the MCP handshake.
    server_name: String,
    /// Server version reported during the MCP handshake.
    server_version: String,
    /// Registered tools keyed by name.
    tools: BTreeMap<String, Arc<RegisteredTool>>,
    /// Listing entries in declaration order.
    definitions: Vec<ToolDefinition>,
    /// Static resources in declaration order.
    resources: Vec<ResourceConfig>,
    /// Invocation engine shared by all tools.
    engine: InvocationEngine,
    /// Pending store for async approvals, when configured.
    approvals: Option<Arc<ApprovalPendingStore>>,
    /// Pending store for async executions, when configured.
    executions: Option<Arc<ExecutionPendingStore>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("server_name", &self.server_name)
            .field("server_version", &self.server_version)
            .field("tool_count", &self.tools.len())
            .field("definitions", &self.definitions)
            .field("resources", &self.resources)
            .field("has_approvals", &self.approvals.is_some())
            .field("has_executions", &self.executions.is_some())
            .finish()
    }
}

impl ToolRegistry {
    /// Builds the registry from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when wiring fails (bad regex, client build).
    pub fn from_config(
        config: &GatewayConfig,
        lang: Lang,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ConfigError> {
        let approvals = needs_approval_store(config).then(|| Arc::new(ApprovalPendingStore::new()));
        let executions =
            needs_execution_store(config).then(|| Arc::new(ExecutionPendingStore::new()));

        let cache = if config.server.idempotency_cache.enabled {
            let ttl = config.server.idempotency_cache.resolved_ttl()?;
            let max_entries = config.server.idempotency_cache.resolved_max_entries();
            Some(Arc::new(IdempotencyCache::new(ttl, max_entries)))
        } else {
            None
        };
        let key_strategy = config.server.idempotency_cache.resolved_key_strategy()?;
        let engine = InvocationEngine::new(cache, key_strategy, audit);

        let mut tools = BTreeMap::new();
        let mut definitions = Vec::with_capacity(config.tools.len());
        for tool in &config.tools {
            let registered =
                build_tool(config, tool, lang, approvals.as_ref(), executions.as_ref())
                    .map_err(|err| ConfigError::Invalid(format!("tool {}: {err}", tool.name)))?;
            tools.insert(tool.name.clone(), Arc::new(registered));
            definitions.push(build_definition(tool));
        }

        Ok(Self {
            server_name: config.server.name.clone(),
            server_version: config.server.version.clone(),
            tools,
            definitions,
            resources: config.resources.clone(),
            engine,
            approvals,
            executions,
        })
    }

    /// Returns the configured server name.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Returns the configured server version.
    #[must_use]
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Runs one invocation against a registered tool.
    ///
    /// Returns `None` for unknown tool names.
    pub async fn invoke(
        &self,
        name: &str,
        ctx: &InvocationContext,
        arguments: ArgumentMap,
    ) -> Option<ToolResponse> {
        let tool = self.tools.get(name)?;
        Some(self.engine.invoke(tool, ctx, arguments).await)
    }

    /// Returns the listing entries.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns the static resources.
    #[must_use]
    pub fn resources(&self) -> &[ResourceConfig] {
        &self.resources
    }

    /// Returns the approval pending store, when configured.
    #[must_use]
    pub fn approvals(&self) -> Option<Arc<ApprovalPendingStore>> {
        self.approvals.clone()
    }

    /// Returns the execution pending store, when configured.
    #[must_use]
    pub fn executions(&self) -> Option<Arc<ExecutionPendingStore>> {
        self.executions.clone()
    }
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Returns true when any async HTTP approver or the server-level approval
/// webhook URL is configured.
fn needs_approval_store(config: &GatewayConfig) -> bool {
    if config.server.approval_webhook_url.as_deref().unwrap_or("").trim() != "" {
        return true;
    }
    config.tools.iter().any(|tool| {
        tool.approvers
            .iter()
            .any(|approver| approver.kind == ApproverKind::Http && approver.async_mode)
    })
}

/// Returns true when any async HTTP executor or the server-level executor
/// webhook URL is configured.
fn needs_execution_store(config: &GatewayConfig) -> bool {
    if config.server.executor_webhook_url.as_deref().unwrap_or("").trim() != "" {
        return true;
    }
    config
        .tools
        .iter()
        .any(|tool| tool.executor.kind == ExecutorKind::Http && tool.executor.async_mode)
}

/// Builds one registered tool.
fn build_tool(
    config: &GatewayConfig,
    tool: &ToolConfig,
    lang: Lang,
    approvals: Option<&Arc<ApprovalPendingStore>>,
    executions: Option<&Arc<ExecutionPendingStore>>,
) -> Result<RegisteredTool, ConfigError> {
    let executor = build_executor(config, tool, lang, executions)?;
    let chain = build_chain(config, tool, lang, approvals)?;

    // The executor timeout doubles as the invocation timeout fallback.
    let timeout = match resolve_duration(tool.timeout.as_ref())? {
        Some(timeout) => Some(timeout),
        None => resolve_duration(tool.executor.timeout.as_ref())?,
    };

    Ok(RegisteredTool {
        name: tool.name.clone(),
        timeout,
        timeout_message: tool.timeout_message.clone(),
        requires_approval: tool.requires_approval,
        chain,
        executor,
    })
}

/// Builds the executor for one tool.
fn build_executor(
    config: &GatewayConfig,
    tool: &ToolConfig,
    lang: Lang,
    executions: Option<&Arc<ExecutionPendingStore>>,
) -> Result<Arc<dyn Executor>, ConfigError> {
    match tool.executor.kind {
        ExecutorKind::Shell => Ok(Arc::new(ShellExecutor {
            command: tool.executor.command.clone().unwrap_or_default(),
            args: tool.executor.args.clone(),
            env: tool.executor.env.clone(),
        })),
        ExecutorKind::Http => {
            let webhook_url = tool
                .executor
                .webhook_url
                .clone()
                .or_else(|| config.server.executor_webhook_url.clone());
            let executor_config = HttpExecutorConfig {
                url: tool.executor.url.clone().unwrap_or_default(),
                method: tool.executor.method.clone(),
                headers: tool.executor.headers.clone(),
                timeout: resolve_duration(tool.executor.timeout.as_ref())?,
                async_mode: tool.executor.async_mode,
                webhook_url,
                spec: tool.executor.spec.clone(),
                tool: ExecutorTool {
                    name: tool.name.clone(),
                    title: tool.title.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.input_schema.clone(),
                    output_schema: tool.output_schema.clone(),
                    metadata: tool.metadata.clone(),
                    tags: tool.tags.clone(),
                },
                lang: Some(lang.as_str().to_string()),
                markup: None,
            };
            let executor = HttpExecutor::new(executor_config, executions.cloned())
                .map_err(|err| ConfigError::Invalid(err.to_string()))?;
            Ok(Arc::new(executor))
        }
    }
}

/// Builds the approver chain for one tool.
fn build_chain(
    config: &GatewayConfig,
    tool: &ToolConfig,
    lang: Lang,
    approvals: Option<&Arc<ApprovalPendingStore>>,
) -> Result<ApproverChain, ConfigError> {
    let mut approvers: Vec<Arc<dyn Approver>> = Vec::with_capacity(tool.approvers.len());
    for approver in &tool.approvers {
        let step_timeout = resolve_duration(approver.timeout.as_ref())?.unwrap_or(Duration::ZERO);
        let built: Arc<dyn Approver> = match approver.kind {
            ApproverKind::Http => build_http_approver(config, approver, lang, approvals)?,
            ApproverKind::Shell => Arc::new(ShellApprover {
                label: approver.name.clone().unwrap_or_default(),
                command: approver.command.clone().unwrap_or_default(),
                args: approver.args.clone(),
                env: approver.env.clone(),
                allow_exit_codes: approver.allow_exit_codes.clone(),
            }),
            ApproverKind::Limits => {
                let policies = approver
                    .fields
                    .iter()
                    .map(|(field, policy)| {
                        (
                            field.clone(),
                            FieldPolicy {
                                regex: policy.regex.clone(),
                                min: policy.min,
                                max: policy.max,
                                min_length: policy.min_length,
                                max_length: policy.max_length,
                            },
                        )
                    })
                    .collect();
                let limits = LimitsApprover::new(
                    approver.name.clone().unwrap_or_default(),
                    approver.max_total,
                    approver.rate_per_minute,
                    policies,
                    MessageBundle::new(lang),
                )
                .map_err(|err| ConfigError::Invalid(err.to_string()))?;
                Arc::new(limits)
            }
        };
        approvers.push(TimeoutApprover::wrap(built, step_timeout));
    }
    Ok(ApproverChain::new(approvers))
}

/// Builds one HTTP approver.
fn build_http_approver(
    config: &GatewayConfig,
    approver: &ApproverConfig,
    lang: Lang,
    approvals: Option<&Arc<ApprovalPendingStore>>,
) -> Result<Arc<dyn Approver>, ConfigError> {
    let webhook_url =
        approver.webhook_url.clone().or_else(|| config.server.approval_webhook_url.clone());
    let timeout =
        resolve_duration(approver.timeout.as_ref())?.unwrap_or(Duration::from_secs(10));
    let approver_lang = approver
        .lang
        .as_deref()
        .map_or(lang, Lang::parse);
    let built = HttpApprover::new(
        HttpApproverConfig {
            label: approver.name.clone().unwrap_or_default(),
            url: approver.url.clone().unwrap_or_default(),
            method: approver.method.clone(),
            headers: approver.headers.clone(),
            timeout,
            async_mode: approver.async_mode,
            webhook_url,
            lang: Some(approver_lang.as_str().to_string()),
            markup: approver.markup.clone(),
        },
        approvals.cloned(),
    )
    .map_err(|err| ConfigError::Invalid(err.to_string()))?;
    Ok(Arc::new(built))
}

/// Builds the listing entry for one tool.
fn build_definition(tool: &ToolConfig) -> ToolDefinition {
    ToolDefinition {
        name: tool.name.clone(),
        title: tool.title.clone(),
        description: tool.description.clone(),
        input_schema: tool.input_schema.clone().unwrap_or_else(|| json!({"type": "object"})),
        output_schema: tool.output_schema.clone(),
        annotations: tool.annotations.clone(),
        meta: tool.metadata.clone(),
    }
}

/// Parses an optional, already-validated duration field.
fn resolve_duration(value: Option<&String>) -> Result<Option<Duration>, ConfigError> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_duration(raw).map(Some),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
