// toolgate-core/src/audit.rs
// ============================================================================
// Module: Audit Events
// Description: Structured audit events for invocation transitions.
// Purpose: Emit redacted audit records without hard sink dependencies.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The invocation engine emits one audit event per state transition. The
//! sink trait is intentionally small so deployments can route events to
//! their preferred logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::protocol::ToolDecision;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event kinds emitted during an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// An invocation arrived.
    ToolCall,
    /// A cached response was returned.
    CacheHit,
    /// The approver chain allowed the invocation.
    ApprovalOk,
    /// The approver chain denied the invocation.
    ApprovalDenied,
    /// An approver failed internally.
    ApprovalError,
    /// The executor produced a result.
    ToolOk,
    /// The executor failed.
    ToolError,
    /// The response was stored in the idempotency cache.
    CacheStore,
}

impl AuditKind {
    /// Returns a stable label for this event kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToolCall => "tool_call",
            Self::CacheHit => "cache_hit",
            Self::ApprovalOk => "approval_ok",
            Self::ApprovalDenied => "approval_denied",
            Self::ApprovalError => "approval_error",
            Self::ToolOk => "tool_ok",
            Self::ToolError => "tool_error",
            Self::CacheStore => "cache_store",
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Event kind.
    pub kind: AuditKind,
    /// Tool name.
    pub tool: String,
    /// Correlation ID of the invocation.
    pub correlation_id: String,
    /// Approval decision when one was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<ToolDecision>,
    /// Human-readable context.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl AuditEvent {
    /// Creates an event without decision or reason.
    #[must_use]
    pub fn new(kind: AuditKind, tool: &str, correlation_id: &str) -> Self {
        Self {
            kind,
            tool: tool.to_string(),
            correlation_id: correlation_id.to_string(),
            decision: None,
            reason: String::new(),
        }
    }

    /// Attaches a decision to the event.
    #[must_use]
    pub fn with_decision(mut self, decision: ToolDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Attaches a reason to the event.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Audit sink for invocation events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}
