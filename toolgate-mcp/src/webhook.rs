// toolgate-mcp/src/webhook.rs
// ============================================================================
// Module: Webhook Resolvers
// Description: HTTP endpoints resolving pending approvals and executions.
// Purpose: Bridge external async decisions back to waiting invocations.
// Dependencies: toolgate-core, axum
// ============================================================================

//! ## Overview
//! Async approvers and executors acknowledge a callout and later POST their
//! decision to the configured webhook path. The handlers validate the
//! payload (400 on malformed or incomplete input), look up the pending slot
//! (404 when the correlation ID is not pending, which also covers webhooks
//! arriving after the invocation was cancelled), and resolve it (200).
//! Non-POST methods receive 405 from the router; a missing store is a 500.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::StatusCode;
use toolgate_core::interfaces::Decision;
use toolgate_core::protocol::ApproverWebhookDecision;
use toolgate_core::protocol::ExecutorWebhookDecision;
use toolgate_core::protocol::stringify_result;
use toolgate_core::runtime::pending::ApprovalPendingStore;
use toolgate_core::runtime::pending::ExecutionOutcome;
use toolgate_core::runtime::pending::ExecutionPendingStore;
use toolgate_core::runtime::pending::ExecutionStatus;

// ============================================================================
// SECTION: Approval Webhook
// ============================================================================

/// Resolves a pending approval from a webhook payload.
#[must_use]
pub fn resolve_approval_webhook(
    store: Option<&ApprovalPendingStore>,
    body: &[u8],
) -> StatusCode {
    let Some(store) = store else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    let Ok(payload) = serde_json::from_slice::<ApproverWebhookDecision>(body) else {
        return StatusCode::BAD_REQUEST;
    };
    let correlation_id = payload.correlation_id.trim();
    let decision_label = payload.decision.trim().to_ascii_lowercase();
    if correlation_id.is_empty() || decision_label.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    let reason = payload.reason.unwrap_or_default();
    let decision = match decision_label.as_str() {
        "approve" => Decision::allow(reason, ""),
        "deny" => Decision::deny(fallback(reason, "denied"), ""),
        "error" => Decision::deny(fallback(reason, "approver error"), ""),
        _ => return StatusCode::BAD_REQUEST,
    };
    if store.resolve(correlation_id, decision) {
        StatusCode::OK
    } else {
        tracing::warn!(correlation_id, "approval webhook not found");
        StatusCode::NOT_FOUND
    }
}

// ============================================================================
// SECTION: Executor Webhook
// ============================================================================

/// Resolves a pending execution from a webhook payload.
#[must_use]
pub fn resolve_executor_webhook(
    store: Option<&ExecutionPendingStore>,
    body: &[u8],
) -> StatusCode {
    let Some(store) = store else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    let Ok(payload) = serde_json::from_slice::<ExecutorWebhookDecision>(body) else {
        return StatusCode::BAD_REQUEST;
    };
    let correlation_id = payload.correlation_id.trim();
    let status_label = payload.status.trim().to_ascii_lowercase();
    if correlation_id.is_empty() || status_label.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    let status = match status_label.as_str() {
        "success" => ExecutionStatus::Success,
        "error" => ExecutionStatus::Error,
        _ => return StatusCode::BAD_REQUEST,
    };
    let mut result = stringify_result(payload.result.as_ref());
    if result.trim().is_empty() {
        result = match status {
            ExecutionStatus::Success => "ok".to_string(),
            ExecutionStatus::Error => "executor error".to_string(),
        };
    }
    let outcome = ExecutionOutcome {
        status,
        result,
    };
    if store.resolve(correlation_id, outcome) {
        StatusCode::OK
    } else {
        tracing::warn!(correlation_id, "executor webhook not found");
        StatusCode::NOT_FOUND
    }
}

/// Falls back to a default when the reason is blank.
fn fallback(reason: String, default: &str) -> String {
    if reason.trim().is_empty() { default.to_string() } else { reason }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
