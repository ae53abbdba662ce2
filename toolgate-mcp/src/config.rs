// toolgate-mcp/src/config.rs
// ============================================================================
// Module: Gateway Configuration
// Description: YAML DSL types, defaults, and fail-closed validation.
// Purpose: Parse the declarative tool document into a checked configuration.
// Dependencies: serde, serde_yaml, url
// ============================================================================

//! ## Overview
//! The configuration document declares the server, its tools, and static
//! resources. Parsing is strict: unknown keys are rejected, durations must
//! parse, tool names and resource URIs must be unique, and async HTTP
//! callouts must have a webhook URL and the HTTP transport. Any violation
//! fails startup; nothing is repaired silently beyond documented defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use toolgate_core::protocol::ArgumentMap;
use toolgate_core::runtime::cache_key::KeyStrategy;
use url::Url;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum configuration document size in bytes.
pub const MAX_CONFIG_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors; all of them abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the document failed.
    #[error("config read failed: {0}")]
    Io(String),
    /// The YAML document did not parse.
    #[error("config parse failed: {0}")]
    Parse(String),
    /// The document parsed but violates a constraint.
    #[error("{0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Durations
// ============================================================================

/// Parses a duration literal such as `300ms`, `10s`, `5m`, or `1h30m`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for empty or malformed literals.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("invalid duration: {value:?}")));
    }
    let mut total = Duration::ZERO;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|ch: char| !ch.is_ascii_digit() && ch != '.')
            .ok_or_else(|| ConfigError::Invalid(format!("invalid duration: {value:?}")))?;
        let (number, tail) = rest.split_at(digits_end);
        let amount: f64 = number
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid duration: {value:?}")))?;
        let (unit, tail) = split_unit(tail)
            .ok_or_else(|| ConfigError::Invalid(format!("invalid duration: {value:?}")))?;
        let seconds = match unit {
            "ns" => amount / 1_000_000_000.0,
            "us" | "µs" => amount / 1_000_000.0,
            "ms" => amount / 1_000.0,
            "s" => amount,
            "m" => amount * 60.0,
            "h" => amount * 3_600.0,
            _ => return Err(ConfigError::Invalid(format!("invalid duration: {value:?}"))),
        };
        total += Duration::from_secs_f64(seconds);
        rest = tail;
    }
    Ok(total)
}

/// Splits the leading unit off a duration tail.
fn split_unit(tail: &str) -> Option<(&str, &str)> {
    for unit in ["ns", "us", "µs", "ms", "s", "m", "h"] {
        if let Some(rest) = tail.strip_prefix(unit) {
            // "ms" must not be consumed as "m" + "s"; prefer longer units.
            if unit == "m" && rest.starts_with('s') {
                continue;
            }
            return Some((unit, rest));
        }
    }
    None
}

/// Parses an optional duration field, tagging errors with the field name.
fn parse_optional_duration(
    field: &str,
    value: Option<&String>,
) -> Result<Option<Duration>, ConfigError> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_duration(raw)
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{field} is an invalid duration: {raw}"))),
    }
}

// ============================================================================
// SECTION: Server Configuration
// ============================================================================

/// Server transport kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Streamable HTTP endpoint.
    #[default]
    Http,
    /// Line-oriented stdio.
    Stdio,
}

/// Idempotency cache configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdempotencyCacheConfig {
    /// Toggles response caching.
    #[serde(default)]
    pub enabled: bool,
    /// Entry lifetime; defaults to one hour.
    #[serde(default)]
    pub ttl: Option<String>,
    /// Maximum entries; defaults to 1000.
    #[serde(default)]
    pub max_entries: Option<u64>,
    /// Key strategy: auto, correlation_id, or arguments_hash.
    #[serde(default)]
    pub key_strategy: Option<String>,
}

impl IdempotencyCacheConfig {
    /// Returns the resolved TTL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the literal is invalid.
    pub fn resolved_ttl(&self) -> Result<Duration, ConfigError> {
        match parse_optional_duration("server.idempotency_cache.ttl", self.ttl.as_ref())? {
            Some(ttl) => Ok(ttl),
            None => Ok(Duration::from_secs(3600)),
        }
    }

    /// Returns the resolved entry bound.
    #[must_use]
    pub fn resolved_max_entries(&self) -> usize {
        usize::try_from(self.max_entries.unwrap_or(1000)).unwrap_or(usize::MAX)
    }

    /// Returns the resolved key strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unknown strategy labels.
    pub fn resolved_key_strategy(&self) -> Result<KeyStrategy, ConfigError> {
        let label = self.key_strategy.as_deref().unwrap_or("");
        KeyStrategy::from_str(label).map_err(|_| {
            ConfigError::Invalid(
                "server.idempotency_cache.key_strategy must be auto, correlation_id, or \
                 arguments_hash"
                    .to_string(),
            )
        })
    }
}

/// Startup hook configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    /// Command to run.
    pub command: String,
    /// Optional arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment values.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Hook timeout.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpServerConfig {
    /// Listen host; combined with `port` when `listen` is absent.
    #[serde(default)]
    pub host: Option<String>,
    /// Listen port; defaults to 8080.
    #[serde(default)]
    pub port: Option<u16>,
    /// Full listen address; overrides `host`/`port` when present.
    #[serde(default)]
    pub listen: Option<String>,
    /// MCP endpoint path; defaults to `/mcp`.
    #[serde(default)]
    pub path: Option<String>,
    /// Request read timeout.
    #[serde(default)]
    pub read_timeout: Option<String>,
    /// Response write timeout.
    #[serde(default)]
    pub write_timeout: Option<String>,
    /// Idle connection timeout.
    #[serde(default)]
    pub idle_timeout: Option<String>,
    /// Disables session tracking on the streamable endpoint.
    #[serde(default)]
    pub stateless: bool,
}

impl HttpServerConfig {
    /// Returns the effective listen address.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        if let Some(listen) = &self.listen
            && !listen.trim().is_empty()
        {
            return listen.trim().to_string();
        }
        let host = self.host.as_deref().unwrap_or("").trim();
        let port = match self.port {
            Some(port) if port != 0 => port,
            _ => 8080,
        };
        format!("{host}:{port}")
    }

    /// Returns the effective MCP endpoint path.
    #[must_use]
    pub fn mcp_path(&self) -> String {
        match self.path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => "/mcp".to_string(),
        }
    }
}

/// Server section of the configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Server name reported during the MCP handshake.
    #[serde(default)]
    pub name: String,
    /// Server version reported during the MCP handshake.
    #[serde(default)]
    pub version: String,
    /// Transport selection.
    #[serde(default)]
    pub transport: TransportKind,
    /// Graceful shutdown budget.
    #[serde(default)]
    pub shutdown_timeout: Option<String>,
    /// Idempotency cache settings.
    #[serde(default)]
    pub idempotency_cache: IdempotencyCacheConfig,
    /// One-time commands executed before the transport starts.
    #[serde(default)]
    pub startup_hooks: Vec<HookConfig>,
    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Default callback URL for async approvers.
    #[serde(default)]
    pub approval_webhook_url: Option<String>,
    /// Default callback URL for async executors.
    #[serde(default)]
    pub executor_webhook_url: Option<String>,
}

// ============================================================================
// SECTION: Tool Configuration
// ============================================================================

/// Executor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    /// Local subprocess.
    Shell,
    /// External HTTP service.
    Http,
}

/// Executor section of a tool declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Executor kind.
    #[serde(rename = "type")]
    pub kind: ExecutorKind,
    /// Shell command template.
    #[serde(default)]
    pub command: Option<String>,
    /// Shell argument templates.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment value templates.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Executor timeout; also the invocation timeout fallback.
    #[serde(default)]
    pub timeout: Option<String>,
    /// HTTP executor endpoint.
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP method override.
    #[serde(default)]
    pub method: Option<String>,
    /// Extra HTTP headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Enables the webhook-bridged asynchronous flow.
    #[serde(default, rename = "async")]
    pub async_mode: bool,
    /// Per-tool executor webhook URL override.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Declarative settings forwarded to the external executor.
    #[serde(default)]
    pub spec: Option<ArgumentMap>,
}

/// Approver kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverKind {
    /// External HTTP approver.
    Http,
    /// Local subprocess approver.
    Shell,
    /// Built-in limits approver.
    Limits,
}

/// Field validation policy inside a limits approver.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldPolicyConfig {
    /// Regex the string value must match.
    #[serde(default)]
    pub regex: Option<String>,
    /// Numeric minimum.
    #[serde(default)]
    pub min: Option<f64>,
    /// Numeric maximum.
    #[serde(default)]
    pub max: Option<f64>,
    /// String minimum length.
    #[serde(default)]
    pub min_length: Option<usize>,
    /// String maximum length.
    #[serde(default)]
    pub max_length: Option<usize>,
}

/// One approver declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproverConfig {
    /// Approver kind.
    #[serde(rename = "type")]
    pub kind: ApproverKind,
    /// Human-friendly approver name.
    #[serde(default)]
    pub name: Option<String>,
    /// Approver-level timeout.
    #[serde(default)]
    pub timeout: Option<String>,
    /// HTTP approver endpoint.
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP method override.
    #[serde(default)]
    pub method: Option<String>,
    /// Extra HTTP headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Enables the webhook-bridged asynchronous flow.
    #[serde(default, rename = "async")]
    pub async_mode: bool,
    /// Preferred message language override (ru/en).
    #[serde(default)]
    pub lang: Option<String>,
    /// Approver message markup (markdown/html).
    #[serde(default)]
    pub markup: Option<String>,
    /// Per-approver approval webhook URL override.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Shell approver command template.
    #[serde(default)]
    pub command: Option<String>,
    /// Shell approver argument templates.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment value templates.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Nonzero exit codes that still count as approval.
    #[serde(default)]
    pub allow_exit_codes: Vec<i32>,
    /// Total call ceiling for the limits approver.
    #[serde(default)]
    pub max_total: u64,
    /// Calls per minute for the limits approver.
    #[serde(default)]
    pub rate_per_minute: u32,
    /// Field validation policies for the limits approver.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldPolicyConfig>,
}

/// Tool behavior hints surfaced in `tools/list`.
///
/// Hints are declared in snake_case in the YAML document but serialize to
/// the camelCase names the MCP listing uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolAnnotationsConfig {
    /// Indicates a read-only tool.
    #[serde(
        default,
        rename(serialize = "readOnlyHint"),
        skip_serializing_if = "Option::is_none"
    )]
    pub read_only_hint: Option<bool>,
    /// Indicates the tool may be destructive.
    #[serde(
        default,
        rename(serialize = "destructiveHint"),
        skip_serializing_if = "Option::is_none"
    )]
    pub destructive_hint: Option<bool>,
    /// Indicates repeated calls have no additional effect.
    #[serde(
        default,
        rename(serialize = "idempotentHint"),
        skip_serializing_if = "Option::is_none"
    )]
    pub idempotent_hint: Option<bool>,
    /// Indicates interaction with external entities.
    #[serde(
        default,
        rename(serialize = "openWorldHint"),
        skip_serializing_if = "Option::is_none"
    )]
    pub open_world_hint: Option<bool>,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One tool declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Unique tool name.
    pub name: String,
    /// Human-friendly title.
    #[serde(default)]
    pub title: Option<String>,
    /// Tool description for the agent.
    #[serde(default)]
    pub description: Option<String>,
    /// Behavior hints.
    #[serde(default)]
    pub annotations: Option<ToolAnnotationsConfig>,
    /// Forces the approval step even with an empty approver list.
    #[serde(default)]
    pub requires_approval: bool,
    /// Invocation timeout.
    #[serde(default)]
    pub timeout: Option<String>,
    /// Message returned on invocation timeout.
    #[serde(default)]
    pub timeout_message: Option<String>,
    /// JSON Schema for tool input, passed through opaquely.
    #[serde(default)]
    pub input_schema: Option<Value>,
    /// JSON Schema for tool output, passed through opaquely.
    #[serde(default)]
    pub output_schema: Option<Value>,
    /// Executor declaration.
    pub executor: ExecutorConfig,
    /// Ordered approver declarations.
    #[serde(default)]
    pub approvers: Vec<ApproverConfig>,
    /// Opaque metadata.
    #[serde(default)]
    pub metadata: Option<ArgumentMap>,
    /// Tool tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One static resource declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Human-friendly resource name.
    #[serde(default)]
    pub name: Option<String>,
    /// Unique resource URI.
    pub uri: String,
    /// Resource description.
    #[serde(default)]
    pub description: Option<String>,
    /// Content type.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Static text content.
    #[serde(default)]
    pub text: Option<String>,
}

// ============================================================================
// SECTION: Top-Level Document
// ============================================================================

/// The whole configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Tool declarations.
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
    /// Static resources.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl GatewayConfig {
    /// Parses and validates a rendered YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on parse or validation failure.
    pub fn from_yaml(rendered: &str) -> Result<Self, ConfigError> {
        if rendered.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::Invalid("config document exceeds size limit".to_string()));
        }
        let config: Self =
            serde_yaml::from_str(rendered).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any constraint is violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::Invalid("server.name is required".to_string()));
        }
        if self.server.version.trim().is_empty() {
            return Err(ConfigError::Invalid("server.version is required".to_string()));
        }
        parse_optional_duration(
            "server.shutdown_timeout",
            self.server.shutdown_timeout.as_ref(),
        )?;
        self.validate_http()?;
        self.validate_cache()?;
        self.validate_hooks()?;
        self.validate_tools()?;
        self.validate_resources()?;
        if let Some(url) = &self.server.approval_webhook_url {
            validate_webhook_url("server.approval_webhook_url", url)?;
        }
        if let Some(url) = &self.server.executor_webhook_url {
            validate_webhook_url("server.executor_webhook_url", url)?;
        }
        Ok(())
    }

    /// Returns the resolved graceful shutdown budget.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the literal is invalid.
    pub fn shutdown_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        parse_optional_duration("server.shutdown_timeout", self.server.shutdown_timeout.as_ref())
    }

    fn validate_http(&self) -> Result<(), ConfigError> {
        let http = &self.server.http;
        if self.server.transport == TransportKind::Http {
            let listen = http.listen.as_deref().unwrap_or("").trim();
            let host = http.host.as_deref().unwrap_or("").trim();
            if listen.is_empty() && host.is_empty() {
                return Err(ConfigError::Invalid("server.http.host is required".to_string()));
            }
        }
        if !http.mcp_path().starts_with('/') {
            return Err(ConfigError::Invalid(
                "server.http.path must start with '/'".to_string(),
            ));
        }
        parse_optional_duration("server.http.read_timeout", http.read_timeout.as_ref())?;
        parse_optional_duration("server.http.write_timeout", http.write_timeout.as_ref())?;
        parse_optional_duration("server.http.idle_timeout", http.idle_timeout.as_ref())?;
        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        let cache = &self.server.idempotency_cache;
        if !cache.enabled {
            return Ok(());
        }
        cache.resolved_ttl()?;
        cache.resolved_key_strategy()?;
        Ok(())
    }

    fn validate_hooks(&self) -> Result<(), ConfigError> {
        for (index, hook) in self.server.startup_hooks.iter().enumerate() {
            if hook.command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "server.startup_hooks[{index}].command is required"
                )));
            }
            parse_optional_duration(
                &format!("server.startup_hooks[{index}].timeout"),
                hook.timeout.as_ref(),
            )?;
        }
        Ok(())
    }

    fn validate_tools(&self) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        for (index, tool) in self.tools.iter().enumerate() {
            if tool.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("tools[{index}].name is required")));
            }
            if !names.insert(tool.name.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate tool name: {}", tool.name)));
            }
            parse_optional_duration(&format!("tools[{index}].timeout"), tool.timeout.as_ref())?;
            self.validate_executor(index, tool)?;
            for (approver_index, approver) in tool.approvers.iter().enumerate() {
                self.validate_approver(index, approver_index, approver)?;
            }
        }
        Ok(())
    }

    fn validate_executor(&self, index: usize, tool: &ToolConfig) -> Result<(), ConfigError> {
        let executor = &tool.executor;
        parse_optional_duration(
            &format!("tools[{index}].executor.timeout"),
            executor.timeout.as_ref(),
        )?;
        match executor.kind {
            ExecutorKind::Shell => {
                if executor.command.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "tools[{index}].executor.command is required"
                    )));
                }
            }
            ExecutorKind::Http => {
                if executor.url.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "tools[{index}].executor.url is required"
                    )));
                }
                if let Some(url) = &executor.webhook_url {
                    validate_webhook_url(&format!("tools[{index}].executor.webhook_url"), url)?;
                }
                if executor.async_mode {
                    let has_webhook = !executor.webhook_url.as_deref().unwrap_or("").trim().is_empty()
                        || !self
                            .server
                            .executor_webhook_url
                            .as_deref()
                            .unwrap_or("")
                            .trim()
                            .is_empty();
                    if !has_webhook {
                        return Err(ConfigError::Invalid(
                            "async http executor requires server.executor_webhook_url or \
                             executor.webhook_url"
                                .to_string(),
                        ));
                    }
                    if self.server.transport == TransportKind::Stdio {
                        return Err(ConfigError::Invalid(
                            "async http executor requires http transport".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_approver(
        &self,
        tool_index: usize,
        approver_index: usize,
        approver: &ApproverConfig,
    ) -> Result<(), ConfigError> {
        let position = format!("tools[{tool_index}].approvers[{approver_index}]");
        parse_optional_duration(&format!("{position}.timeout"), approver.timeout.as_ref())?;
        if let Some(markup) = approver.markup.as_deref().map(str::trim)
            && !markup.is_empty()
            && markup != "markdown"
            && markup != "html"
        {
            return Err(ConfigError::Invalid(format!(
                "{position}.markup must be markdown or html"
            )));
        }
        match approver.kind {
            ApproverKind::Http => {
                if approver.url.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(ConfigError::Invalid(format!("{position}.url is required")));
                }
                if let Some(url) = &approver.webhook_url {
                    validate_webhook_url(&format!("{position}.webhook_url"), url)?;
                }
                if approver.async_mode {
                    let has_webhook = !approver.webhook_url.as_deref().unwrap_or("").trim().is_empty()
                        || !self
                            .server
                            .approval_webhook_url
                            .as_deref()
                            .unwrap_or("")
                            .trim()
                            .is_empty();
                    if !has_webhook {
                        return Err(ConfigError::Invalid(
                            "async http approver requires server.approval_webhook_url or \
                             approver.webhook_url"
                                .to_string(),
                        ));
                    }
                    if self.server.transport == TransportKind::Stdio {
                        return Err(ConfigError::Invalid(
                            "async http approver requires http transport".to_string(),
                        ));
                    }
                }
            }
            ApproverKind::Shell => {
                if approver.command.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(ConfigError::Invalid(format!("{position}.command is required")));
                }
            }
            ApproverKind::Limits => {}
        }
        Ok(())
    }

    fn validate_resources(&self) -> Result<(), ConfigError> {
        let mut uris = BTreeSet::new();
        for (index, resource) in self.resources.iter().enumerate() {
            if resource.uri.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("resources[{index}].uri is required")));
            }
            if !uris.insert(resource.uri.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate resource uri: {}",
                    resource.uri
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Webhook URLs
// ============================================================================

/// Validates that a webhook URL is absolute and carries a path.
fn validate_webhook_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is invalid: {err}")))?;
    if parsed.scheme().is_empty() || parsed.host_str().unwrap_or("").is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be absolute")));
    }
    if parsed.path().trim_matches('/').is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must include a path")));
    }
    Ok(())
}

/// Returns the path component of a webhook URL, or `None` when unusable.
#[must_use]
pub fn webhook_path(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let path = parsed.path().trim();
    if path.is_empty() || path == "/" {
        return None;
    }
    Some(path.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
