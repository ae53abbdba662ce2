// toolgate-providers/src/executor_shell.rs
// ============================================================================
// Module: Shell Executor
// Description: Tool execution through a local subprocess.
// Purpose: Produce the tool result from a template-rendered command.
// Dependencies: toolgate-core, tokio
// ============================================================================

//! ## Overview
//! The shell executor returns the trimmed combined output on exit zero. A
//! nonzero exit is an execution failure carrying the trimmed output so the
//! engine can combine both into the response reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use toolgate_core::interfaces::ExecutionRequest;
use toolgate_core::interfaces::Executor;
use toolgate_core::interfaces::ExecutorError;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_core::template::TemplateContext;

use crate::shell::CommandError;
use crate::shell::run_command;

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Executor backed by a subprocess.
pub struct ShellExecutor {
    /// Command template.
    pub command: String,
    /// Argument templates.
    pub args: Vec<String>,
    /// Extra environment value templates.
    pub env: BTreeMap<String, String>,
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(
        &self,
        ctx: &InvocationContext,
        request: &ExecutionRequest,
    ) -> Result<String, ExecutorError> {
        let template_ctx = TemplateContext {
            tool_name: &request.tool_name,
            correlation_id: &request.correlation_id,
            arguments: &request.arguments,
        };
        let result =
            run_command(ctx, &self.command, &self.args, &self.env, &template_ctx).await;
        let output = match result {
            Ok(output) => output,
            Err(CommandError::Cancelled) => return Err(ExecutorError::Cancelled),
            Err(err) => return Err(ExecutorError::failed(err.to_string())),
        };

        let trimmed = output.output.trim().to_string();
        if output.success {
            return Ok(trimmed);
        }
        Err(ExecutorError::Failed {
            message: format!("command exited with status {}", output.exit_code),
            output: trimmed,
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
    use toolgate_core::interfaces::ExecutionRequest;
    use toolgate_core::interfaces::Executor;
    use toolgate_core::interfaces::ExecutorError;
    use toolgate_core::runtime::context::InvocationContext;

    use super::ShellExecutor;

    fn executor(command: &str) -> ShellExecutor {
        ShellExecutor {
            command: command.to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    fn request(arguments: serde_json::Value) -> ExecutionRequest {
        ExecutionRequest {
            tool_name: "echo".to_string(),
            arguments: arguments.as_object().expect("object").clone(),
            correlation_id: "corr-1".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_trimmed_output_on_success() {
        let executor = executor(r#"printf '%s' {{arg "msg"}}"#);
        let output = executor
            .execute(&InvocationContext::background(), &request(json!({"msg": "hi"})))
            .await
            .expect("output");
        assert_eq!(output, "hi");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failure_with_output() {
        let executor = executor("echo broken; exit 2");
        let err = executor
            .execute(&InvocationContext::background(), &request(json!({})))
            .await
            .expect_err("failure");
        match err {
            ExecutorError::Failed {
                message,
                output,
            } => {
                assert_eq!(message, "command exited with status 2");
                assert_eq!(output, "broken");
            }
            ExecutorError::Cancelled => panic!("unexpected cancellation"),
        }
    }

    #[tokio::test]
    async fn empty_output_on_success_is_allowed() {
        let executor = executor("true");
        let output = executor
            .execute(&InvocationContext::background(), &request(json!({})))
            .await
            .expect("output");
        assert_eq!(output, "");
    }
}
