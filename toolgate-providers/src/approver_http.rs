// toolgate-providers/src/approver_http.rs
// ============================================================================
// Module: HTTP Approver
// Description: Approval decisions from an external HTTP service.
// Purpose: Forward invocation context to approvers, sync or webhook-bridged.
// Dependencies: toolgate-core, reqwest
// ============================================================================

//! ## Overview
//! The HTTP approver posts an approval request and interprets the reply.
//! Synchronous approvers answer with `{decision, reason?}`; asynchronous
//! approvers acknowledge with HTTP 202 (or a `pending` decision) and deliver
//! the real decision later through the approval webhook, which resolves the
//! pending-store slot this approver waits on. A deferred cancel guarantees
//! the slot is removed on every exit path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use toolgate_core::interfaces::ApprovalRequest;
use toolgate_core::interfaces::Approver;
use toolgate_core::interfaces::ApproverError;
use toolgate_core::interfaces::Decision;
use toolgate_core::protocol::ApproverLink;
use toolgate_core::protocol::ApproverRequest;
use toolgate_core::protocol::ApproverResponse;
use toolgate_core::protocol::ArgumentMap;
use toolgate_core::protocol::WebhookCallback;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_core::runtime::pending::ApprovalPendingStore;
use toolgate_core::runtime::pending::PendingGuard;

use crate::callout::ClientBuildError;
use crate::callout::build_client;
use crate::callout::read_body_limited;
use crate::callout::resolve_method;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for one HTTP approver.
#[derive(Debug, Clone)]
pub struct HttpApproverConfig {
    /// Human-friendly approver name.
    pub label: String,
    /// Approver endpoint.
    pub url: String,
    /// HTTP method override; POST by default.
    pub method: Option<String>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Client timeout for the callout.
    pub timeout: Duration,
    /// Enables the webhook-bridged asynchronous flow.
    pub async_mode: bool,
    /// Webhook URL advertised to the approver in async mode.
    pub webhook_url: Option<String>,
    /// Preferred message language forwarded to the approver.
    pub lang: Option<String>,
    /// Preferred markup flavor forwarded to the approver.
    pub markup: Option<String>,
}

// ============================================================================
// SECTION: Approver
// ============================================================================

/// Approver backed by an external HTTP service.
pub struct HttpApprover {
    /// Approver configuration.
    config: HttpApproverConfig,
    /// HTTP client with the configured timeout.
    client: reqwest::Client,
    /// Pending store for async decisions.
    pending: Option<Arc<ApprovalPendingStore>>,
}

impl HttpApprover {
    /// Creates an HTTP approver.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn new(
        config: HttpApproverConfig,
        pending: Option<Arc<ApprovalPendingStore>>,
    ) -> Result<Self, ClientBuildError> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            pending,
        })
    }

    /// Builds the approval request payload.
    fn build_payload(&self, request: &ApprovalRequest) -> Result<ApproverRequest, Decision> {
        let mut payload = ApproverRequest {
            correlation_id: request.correlation_id.clone(),
            tool: request.tool_name.clone(),
            arguments: request.arguments.clone(),
            justification: None,
            approval_request: None,
            risk_assessment: None,
            links_to_code: None,
            lang: self.config.lang.clone(),
            markup: self.config.markup.clone(),
            timeout_sec: None,
            callback: None,
        };
        if self.config.async_mode {
            payload.callback = self.config.webhook_url.clone().map(|url| WebhookCallback {
                url,
            });
            let seconds = self.config.timeout.as_secs();
            if seconds > 0 {
                payload.timeout_sec = Some(seconds);
            }
        }

        payload.justification =
            self.validated_reason(&request.arguments, "justification")?;
        payload.approval_request =
            self.validated_reason(&request.arguments, "approval_request")?;
        payload.risk_assessment =
            self.validated_reason(&request.arguments, "risk_assessment")?;

        if let Some(links) = extract_links(&request.arguments) {
            payload.links_to_code = Some(links);
        }
        Ok(payload)
    }

    /// Extracts and validates one caller-supplied reason field.
    ///
    /// A length violation yields an immediate deny decision.
    fn validated_reason(
        &self,
        arguments: &ArgumentMap,
        field: &str,
    ) -> Result<Option<String>, Decision> {
        let Some(value) = extract_string(arguments, field) else {
            return Ok(None);
        };
        match validate_reason_length(field, &value) {
            Ok(()) => Ok(Some(value)),
            Err(reason) => Err(Decision::deny(reason, self.name())),
        }
    }

    /// Waits for the webhook decision or context cancellation.
    async fn await_decision(
        &self,
        ctx: &InvocationContext,
        rx: oneshot::Receiver<Decision>,
    ) -> Result<Decision, ApproverError> {
        tokio::select! {
            delivered = rx => match delivered {
                Ok(mut decision) => {
                    if decision.source.is_empty() {
                        decision.source = self.name().to_string();
                    }
                    Ok(decision)
                }
                Err(_) => {
                    Err(ApproverError::Failed("approval webhook channel closed".to_string()))
                }
            },
            () = ctx.cancelled() => Err(ApproverError::Cancelled),
        }
    }
}

#[async_trait]
impl Approver for HttpApprover {
    fn name(&self) -> &str {
        if self.config.label.is_empty() { "http" } else { &self.config.label }
    }

    async fn approve(
        &self,
        ctx: &InvocationContext,
        request: &ApprovalRequest,
    ) -> Result<Decision, ApproverError> {
        if self.config.url.trim().is_empty() {
            return Ok(Decision::deny("approver url is empty", self.name()));
        }
        if self.config.async_mode {
            if self.config.webhook_url.as_deref().unwrap_or("").trim().is_empty() {
                return Ok(Decision::deny("approver webhook url is empty", self.name()));
            }
            if self.pending.is_none() {
                return Ok(Decision::deny("approver async store is not configured", self.name()));
            }
        }

        let payload = match self.build_payload(request) {
            Ok(payload) => payload,
            Err(denied) => return Ok(denied),
        };

        let mut pending_rx = None;
        let mut _pending_guard = None;
        if self.config.async_mode
            && let Some(store) = &self.pending
        {
            let rx = store
                .register(&request.correlation_id, self.name())
                .map_err(|_| ApproverError::Failed("approval already pending".to_string()))?;
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
                    ApproverError::Failed(format!("approver request failed: {err}"))
                })?
            }
            () = ctx.cancelled() => return Err(ApproverError::Cancelled),
        };

        let status = response.status();
        let body = read_body_limited(response).await;
        if !status.is_success() {
            let excerpt = String::from_utf8_lossy(&body).trim().to_string();
            return Ok(Decision::deny(
                format!("approver status {}: {excerpt}", status.as_u16()),
                self.name(),
            ));
        }

        if self.config.async_mode
            && status == reqwest::StatusCode::ACCEPTED
            && body.iter().all(u8::is_ascii_whitespace)
            && let Some(rx) = pending_rx.take()
        {
            return self.await_decision(ctx, rx).await;
        }

        let parsed: ApproverResponse = serde_json::from_slice(&body)
            .map_err(|_| ApproverError::Failed("invalid approver response".to_string()))?;
        let reason = parsed.reason.unwrap_or_default();
        match parsed.decision.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Decision::allow(fallback_reason(reason, "approved"), self.name())),
            "deny" => Ok(Decision::deny(fallback_reason(reason, "denied"), self.name())),
            "error" => Ok(Decision::deny(fallback_reason(reason, "approver error"), self.name())),
            "pending" => {
                if let Some(rx) = pending_rx.take() {
                    return self.await_decision(ctx, rx).await;
                }
                Ok(Decision::deny("approver returned pending decision", self.name()))
            }
            other => Err(ApproverError::Failed(format!("unknown approver decision: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Falls back to a default when the reason is blank.
fn fallback_reason(reason: String, fallback: &str) -> String {
    if reason.trim().is_empty() { fallback.to_string() } else { reason }
}

/// Extracts a trimmed, nonempty string argument.
fn extract_string(arguments: &ArgumentMap, key: &str) -> Option<String> {
    match arguments.get(key) {
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

/// Validates the 10-500 codepoint rule for caller-supplied reasons.
fn validate_reason_length(field: &str, value: &str) -> Result<(), String> {
    let length = value.trim().chars().count();
    if length == 0 {
        return Err(format!("{field} is empty"));
    }
    if !(10..=500).contains(&length) {
        return Err(format!("{field} must be 10-500 characters"));
    }
    Ok(())
}

/// Extracts `links_to_code` entries, capped at five items.
fn extract_links(arguments: &ArgumentMap) -> Option<Vec<ApproverLink>> {
    let Some(Value::Array(items)) = arguments.get("links_to_code") else {
        return None;
    };
    let mut links = Vec::new();
    for item in items.iter().take(5) {
        let Value::Object(object) = item else {
            continue;
        };
        let text = object.get("text").and_then(Value::as_str).unwrap_or("").trim();
        let url = object.get("url").and_then(Value::as_str).unwrap_or("").trim();
        if text.is_empty() || url.is_empty() {
            continue;
        }
        links.push(ApproverLink {
            text: text.to_string(),
            url: url.to_string(),
        });
    }
    (!links.is_empty()).then_some(links)
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
    use toolgate_core::protocol::ArgumentMap;

    use super::extract_links;
    use super::extract_string;
    use super::validate_reason_length;

    fn arguments(value: serde_json::Value) -> ArgumentMap {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn extract_string_trims_and_skips_empty() {
        let args = arguments(json!({"justification": "  needs deploy access  ", "empty": "  "}));
        assert_eq!(extract_string(&args, "justification").as_deref(), Some("needs deploy access"));
        assert!(extract_string(&args, "empty").is_none());
        assert!(extract_string(&args, "missing").is_none());
    }

    #[test]
    fn reason_length_bounds_are_enforced() {
        assert!(validate_reason_length("justification", "too short").is_err());
        assert!(validate_reason_length("justification", "long enough justification").is_ok());
        let oversized = "x".repeat(501);
        let err = validate_reason_length("justification", &oversized).expect_err("too long");
        assert_eq!(err, "justification must be 10-500 characters");
    }

    #[test]
    fn links_are_capped_and_filtered() {
        let mut items = Vec::new();
        for index in 0..8 {
            items.push(json!({"text": format!("link {index}"), "url": format!("https://x/{index}")}));
        }
        let args = arguments(json!({"links_to_code": items}));
        let links = extract_links(&args).expect("links");
        assert_eq!(links.len(), 5);

        let args = arguments(json!({"links_to_code": [{"text": "", "url": "https://x"}]}));
        assert!(extract_links(&args).is_none());
        let args = arguments(json!({"links_to_code": "not a list"}));
        assert!(extract_links(&args).is_none());
    }
}
