// toolgate-mcp/src/audit.rs
// ============================================================================
// Module: Audit Sinks
// Description: Audit sink implementations for the gateway host.
// Purpose: Route invocation audit events into the logging pipeline.
// Dependencies: toolgate-core, tracing
// ============================================================================

//! ## Overview
//! The default sink forwards audit events to `tracing` as structured
//! records under the `audit` target, so deployments shipping JSON logs get
//! audit lines alongside regular logs without extra wiring.

// ============================================================================
// SECTION: Imports
// ============================================================================

use toolgate_core::audit::AuditEvent;
use toolgate_core::audit::AuditSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink writing structured records through `tracing`.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let decision = event.decision.map(|decision| decision.as_str()).unwrap_or("");
        tracing::info!(
            target: "audit",
            kind = event.kind.as_str(),
            tool = %event.tool,
            correlation_id = %event.correlation_id,
            decision,
            reason = %event.reason,
            "audit"
        );
    }
}
