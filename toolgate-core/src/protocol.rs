// toolgate-core/src/protocol.rs
// ============================================================================
// Module: Invocation Protocol Types
// Description: Response triple and wire payloads for approvers and executors.
// Purpose: Fix the JSON shapes exchanged with clients, approvers, executors.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every tool invocation produces a [`ToolResponse`] triple of status,
//! decision, and reason, tagged with the invocation correlation ID. The
//! remaining types are the JSON payloads sent to external HTTP approvers and
//! executors and the webhook payloads they send back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Tool invocation arguments as an ordered JSON object.
pub type ArgumentMap = serde_json::Map<String, Value>;

// ============================================================================
// SECTION: Response Triple
// ============================================================================

/// Invocation status reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// The executor ran and produced a result.
    Success,
    /// An approver denied the invocation.
    Denied,
    /// The invocation failed or timed out.
    Error,
}

impl ToolStatus {
    /// Returns the wire label for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval decision reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolDecision {
    /// The approver chain allowed the invocation.
    Approve,
    /// The approver chain denied the invocation.
    Deny,
    /// The invocation failed before or during execution.
    Error,
}

impl ToolDecision {
    /// Returns the wire label for this decision.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ToolDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured response returned for every tool invocation.
///
/// # Invariants
/// - `(status, decision)` is one of (success, approve), (denied, deny),
///   (error, error).
/// - `correlation_id` always matches the ID derived for the invocation,
///   cache hits included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Invocation status.
    pub status: ToolStatus,
    /// Approval decision.
    pub decision: ToolDecision,
    /// Human-readable details for the client.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Correlation ID of the invocation.
    pub correlation_id: String,
}

impl ToolResponse {
    /// Builds a success response.
    #[must_use]
    pub fn success(reason: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            decision: ToolDecision::Approve,
            reason: reason.into(),
            correlation_id: correlation_id.into(),
        }
    }

    /// Builds a denied response.
    #[must_use]
    pub fn denied(reason: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Denied,
            decision: ToolDecision::Deny,
            reason: reason.into(),
            correlation_id: correlation_id.into(),
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn error(reason: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            decision: ToolDecision::Error,
            reason: reason.into(),
            correlation_id: correlation_id.into(),
        }
    }
}

// ============================================================================
// SECTION: Approver Wire Payloads
// ============================================================================

/// Human-friendly code link forwarded to HTTP approvers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverLink {
    /// Link label.
    pub text: String,
    /// Link target.
    pub url: String,
}

/// Webhook callback settings for async callouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookCallback {
    /// URL the external service should POST its decision to.
    pub url: String,
}

/// Payload sent to external HTTP approvers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproverRequest {
    /// Correlation ID of the invocation.
    pub correlation_id: String,
    /// Tool name.
    pub tool: String,
    /// Tool arguments, unredacted.
    pub arguments: ArgumentMap,
    /// Short caller-supplied justification (10-500 codepoints).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    /// Caller-supplied description of the requested action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_request: Option<String>,
    /// Caller-supplied risk assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<String>,
    /// Optional code references (capped at 5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links_to_code: Option<Vec<ApproverLink>>,
    /// Preferred message language (ru/en).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Preferred message markup (markdown/html).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    /// Approver timeout hint in seconds; zero means no hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
    /// Callback settings for async approvers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<WebhookCallback>,
}

/// Synchronous reply expected from HTTP approvers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproverResponse {
    /// Decision label: approve, deny, error, or pending.
    #[serde(default)]
    pub decision: String,
    /// Optional human-readable context.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Decision delivered to the approval webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApproverWebhookDecision {
    /// Correlation ID of the pending approval.
    #[serde(default)]
    pub correlation_id: String,
    /// Decision label: approve, deny, or error.
    #[serde(default)]
    pub decision: String,
    /// Optional human-readable context.
    #[serde(default)]
    pub reason: Option<String>,
    /// Optional tool name for observability.
    #[serde(default)]
    pub tool: Option<String>,
    /// Optional opaque metadata.
    #[serde(default)]
    pub metadata: Option<ArgumentMap>,
    /// Optional external identifier.
    #[serde(default)]
    pub request_id: Option<String>,
}

// ============================================================================
// SECTION: Executor Wire Payloads
// ============================================================================

/// Tool metadata forwarded to external HTTP executors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorTool {
    /// Tool name.
    pub name: String,
    /// Optional human-friendly title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional tool description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared input schema, passed through opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// Declared output schema, passed through opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Opaque tool metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ArgumentMap>,
    /// Tool tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Payload sent to external HTTP executors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorRequest {
    /// Correlation ID of the invocation.
    pub correlation_id: String,
    /// Tool metadata.
    pub tool: ExecutorTool,
    /// Tool arguments, unredacted.
    pub arguments: ArgumentMap,
    /// Declarative executor settings from the configuration document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<ArgumentMap>,
    /// Preferred message language (ru/en).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Preferred message markup (markdown/html).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    /// Remaining invocation time in seconds; zero means no deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
    /// Callback settings for async executors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<WebhookCallback>,
}

/// Synchronous reply expected from HTTP executors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorResponse {
    /// Status label: success, error, or pending.
    #[serde(default)]
    pub status: String,
    /// Execution output.
    #[serde(default)]
    pub result: Option<Value>,
}

/// Result delivered to the executor webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorWebhookDecision {
    /// Correlation ID of the pending execution.
    #[serde(default)]
    pub correlation_id: String,
    /// Status label: success or error.
    #[serde(default)]
    pub status: String,
    /// Execution output or error details.
    #[serde(default)]
    pub result: Option<Value>,
    /// Optional tool name for observability.
    #[serde(default)]
    pub tool: Option<String>,
    /// Optional opaque metadata.
    #[serde(default)]
    pub metadata: Option<ArgumentMap>,
    /// Optional external identifier.
    #[serde(default)]
    pub request_id: Option<String>,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders an executor result value as a plain string.
///
/// Null becomes empty, strings are trimmed, and everything else is encoded
/// as compact JSON.
#[must_use]
pub fn stringify_result(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default().trim().to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use serde_json::json;

    use super::ToolResponse;
    use super::stringify_result;

    #[test]
    fn response_serializes_snake_case_labels() {
        let response = ToolResponse::success("done", "corr-1");
        let value = serde_json::to_value(&response).expect("serialize response");
        assert_eq!(value["status"], "success");
        assert_eq!(value["decision"], "approve");
        assert_eq!(value["reason"], "done");
        assert_eq!(value["correlation_id"], "corr-1");
    }

    #[test]
    fn response_omits_empty_reason() {
        let response = ToolResponse::success("", "corr-2");
        let value = serde_json::to_value(&response).expect("serialize response");
        assert!(value.get("reason").is_none());
    }

    #[test]
    fn stringify_trims_strings_and_encodes_objects() {
        assert_eq!(stringify_result(None), "");
        assert_eq!(stringify_result(Some(&json!(null))), "");
        assert_eq!(stringify_result(Some(&json!("  hi  "))), "hi");
        assert_eq!(stringify_result(Some(&json!({"a": 1}))), "{\"a\":1}");
        assert_eq!(stringify_result(Some(&json!(42))), "42");
    }
}
