// toolgate-providers/src/approver_shell.rs
// ============================================================================
// Module: Shell Approver
// Description: Approval decisions from subprocess exit codes.
// Purpose: Let operators gate tools behind local scripts.
// Dependencies: toolgate-core, tokio
// ============================================================================

//! ## Overview
//! The shell approver runs a template-rendered command and maps its exit
//! status to a decision: zero allows, nonzero denies unless the code is
//! listed in `allow_exit_codes`. The decision reason is the trimmed combined
//! output, falling back to "approved" or "denied".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use toolgate_core::interfaces::ApprovalRequest;
use toolgate_core::interfaces::Approver;
use toolgate_core::interfaces::ApproverError;
use toolgate_core::interfaces::Decision;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_core::template::TemplateContext;

use crate::shell::CommandError;
use crate::shell::run_command;

// ============================================================================
// SECTION: Approver
// ============================================================================

/// Approver backed by a subprocess.
pub struct ShellApprover {
    /// Human-friendly approver name.
    pub label: String,
    /// Command template.
    pub command: String,
    /// Argument templates.
    pub args: Vec<String>,
    /// Extra environment value templates.
    pub env: BTreeMap<String, String>,
    /// Nonzero exit codes that still count as approval.
    pub allow_exit_codes: Vec<i32>,
}

#[async_trait]
impl Approver for ShellApprover {
    fn name(&self) -> &str {
        if self.label.is_empty() { "shell" } else { &self.label }
    }

    async fn approve(
        &self,
        ctx: &InvocationContext,
        request: &ApprovalRequest,
    ) -> Result<Decision, ApproverError> {
        let template_ctx = TemplateContext {
            tool_name: &request.tool_name,
            correlation_id: &request.correlation_id,
            arguments: &request.arguments,
        };
        let result =
            run_command(ctx, &self.command, &self.args, &self.env, &template_ctx).await;
        let output = match result {
            Ok(output) => output,
            Err(CommandError::Cancelled) => return Err(ApproverError::Cancelled),
            Err(err) => {
                return Err(ApproverError::Failed(format!("approver command failed: {err}")));
            }
        };

        let allowed = output.success || self.allow_exit_codes.contains(&output.exit_code);
        let mut reason = output.output.trim().to_string();
        if reason.is_empty() {
            reason = if allowed { "approved".to_string() } else { "denied".to_string() };
        }
        Ok(Decision {
            allowed,
            reason,
            source: self.name().to_string(),
        })
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

    use std::collections::BTreeMap;

    use serde_json::json;
    use toolgate_core::interfaces::ApprovalRequest;
    use toolgate_core::interfaces::Approver;
    use toolgate_core::runtime::context::InvocationContext;

    use super::ShellApprover;

    fn approver(command: &str, allow_exit_codes: Vec<i32>) -> ShellApprover {
        ShellApprover {
            label: "guard".to_string(),
            command: command.to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            allow_exit_codes,
        }
    }

    fn request(arguments: serde_json::Value) -> ApprovalRequest {
        ApprovalRequest {
            tool_name: "echo".to_string(),
            arguments: arguments.as_object().expect("object").clone(),
            correlation_id: "corr-1".to_string(),
        }
    }

    #[tokio::test]
    async fn exit_zero_allows_with_output_reason() {
        let approver = approver("echo fine", Vec::new());
        let decision = approver
            .approve(&InvocationContext::background(), &request(json!({})))
            .await
            .expect("decision");
        assert!(decision.allowed);
        assert_eq!(decision.reason, "fine");
        assert_eq!(decision.source, "guard");
    }

    #[tokio::test]
    async fn nonzero_exit_denies_with_fallback_reason() {
        let approver = approver("exit 1", Vec::new());
        let decision = approver
            .approve(&InvocationContext::background(), &request(json!({})))
            .await
            .expect("decision");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "denied");
    }

    #[tokio::test]
    async fn allow_exit_codes_turn_nonzero_into_approval() {
        let approver = approver("exit 3", vec![3]);
        let decision = approver
            .approve(&InvocationContext::background(), &request(json!({})))
            .await
            .expect("decision");
        assert!(decision.allowed);
        assert_eq!(decision.reason, "approved");
    }

    #[tokio::test]
    async fn arguments_reach_the_command() {
        let approver = approver(r#"test "{{arg "user"}}" = "root""#, Vec::new());
        let allowed = approver
            .approve(&InvocationContext::background(), &request(json!({"user": "root"})))
            .await
            .expect("decision");
        assert!(allowed.allowed);
        let denied = approver
            .approve(&InvocationContext::background(), &request(json!({"user": "guest"})))
            .await
            .expect("decision");
        assert!(!denied.allowed);
    }
}
