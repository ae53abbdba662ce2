// toolgate-mcp/src/hooks.rs
// ============================================================================
// Module: Startup Hooks
// Description: One-time commands executed before the transport starts.
// Purpose: Let operators prepare the environment; any failure aborts startup.
// Dependencies: toolgate-providers, tracing
// ============================================================================

//! ## Overview
//! Hooks run sequentially in declaration order. Each hook may carry its own
//! timeout; a nonzero exit or timeout fails startup with exit code 1. Hook
//! output is logged either way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use toolgate_core::protocol::ArgumentMap;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_core::template::TemplateContext;
use toolgate_providers::run_command;

use crate::config::HookConfig;
use crate::config::parse_duration;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Startup hook failures; all abort startup.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook command failed or could not run.
    #[error("startup hook {index} failed: {message}")]
    Failed {
        /// Hook position in the configuration.
        index: usize,
        /// Failure description.
        message: String,
    },
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs all startup hooks sequentially.
///
/// # Errors
///
/// Returns [`HookError`] for the first failing hook.
pub async fn run_startup_hooks(
    ctx: &InvocationContext,
    hooks: &[HookConfig],
) -> Result<(), HookError> {
    let empty_arguments = ArgumentMap::new();
    let template_ctx = TemplateContext {
        tool_name: "",
        correlation_id: "",
        arguments: &empty_arguments,
    };
    for (index, hook) in hooks.iter().enumerate() {
        if hook.command.trim().is_empty() {
            continue;
        }
        let hook_ctx = match &hook.timeout {
            Some(raw) if !raw.trim().is_empty() => {
                let timeout = parse_duration(raw).map_err(|err| HookError::Failed {
                    index,
                    message: err.to_string(),
                })?;
                ctx.with_timeout(timeout)
            }
            _ => ctx.clone(),
        };

        tracing::info!(index, "running startup hook");
        let result =
            run_command(&hook_ctx, &hook.command, &hook.args, &hook.env, &template_ctx)
                .await
                .map_err(|err| HookError::Failed {
                    index,
                    message: err.to_string(),
                })?;
        let output = result.output.trim();
        if !result.success {
            if !output.is_empty() {
                tracing::error!(index, output, "startup hook failed");
            }
            return Err(HookError::Failed {
                index,
                message: format!("exit status {}", result.exit_code),
            });
        }
        if !output.is_empty() {
            tracing::info!(index, output, "startup hook output");
        }
    }
    Ok(())
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

    use toolgate_core::runtime::context::InvocationContext;

    use super::run_startup_hooks;
    use crate::config::HookConfig;

    fn hook(command: &str, timeout: Option<&str>) -> HookConfig {
        HookConfig {
            command: command.to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: timeout.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn hooks_run_in_order() {
        let ctx = InvocationContext::background();
        let hooks = vec![hook("true", None), hook("echo ready", None)];
        run_startup_hooks(&ctx, &hooks).await.expect("hooks succeed");
    }

    #[tokio::test]
    async fn failing_hooks_abort_startup() {
        let ctx = InvocationContext::background();
        let hooks = vec![hook("true", None), hook("exit 7", None)];
        let err = run_startup_hooks(&ctx, &hooks).await.expect_err("hook failure");
        assert_eq!(err.to_string(), "startup hook 1 failed: exit status 7");
    }

    #[tokio::test]
    async fn hook_timeouts_abort_startup() {
        let ctx = InvocationContext::background();
        let hooks = vec![hook("sleep 5", Some("50ms"))];
        let err = run_startup_hooks(&ctx, &hooks).await.expect_err("hook timeout");
        assert!(err.to_string().contains("startup hook 0 failed"));
    }

    #[tokio::test]
    async fn blank_commands_are_skipped() {
        let ctx = InvocationContext::background();
        let hooks = vec![hook("   ", None), hook("true", None)];
        run_startup_hooks(&ctx, &hooks).await.expect("hooks succeed");
    }
}
