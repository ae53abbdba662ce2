// toolgate-providers/src/shell.rs
// ============================================================================
// Module: Subprocess Runner
// Description: Template-rendered subprocess execution with cancellation.
// Purpose: Shared command runner for shell approvers and executors.
// Dependencies: toolgate-core, tokio
// ============================================================================

//! ## Overview
//! The runner renders the command, arguments, and extra environment values
//! against the invocation, then spawns the process. Without explicit
//! arguments the command line runs through `bash -c`; with arguments the
//! rendered command is executed directly. Stdout and stderr are captured
//! together. Cancellation of the invocation context kills the child.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_core::template::TemplateContext;
use toolgate_core::template::TemplateError;
use toolgate_core::template::render_template;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Captured result of a finished subprocess.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Combined stdout and stderr.
    pub output: String,
    /// Process exit code; -1 when unavailable.
    pub exit_code: i32,
    /// True when the process exited with status zero.
    pub success: bool,
}

/// Errors raised while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A command, argument, or env template failed to render.
    #[error("{0}")]
    Template(#[from] TemplateError),
    /// The process could not be spawned or awaited.
    #[error("command failed: {0}")]
    Io(String),
    /// The invocation context was cancelled while the process ran.
    #[error("command cancelled")]
    Cancelled,
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Renders and runs a command, capturing combined output.
///
/// # Errors
///
/// Returns [`CommandError`] on render failure, spawn failure, or
/// cancellation. A nonzero exit is NOT an error here; callers decide what
/// an exit code means.
pub async fn run_command(
    ctx: &InvocationContext,
    command: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
    template_ctx: &TemplateContext<'_>,
) -> Result<CommandOutput, CommandError> {
    let rendered_command = render_template(command, template_ctx)?;
    let mut rendered_args = Vec::with_capacity(args.len());
    for arg in args {
        rendered_args.push(render_template(arg, template_ctx)?);
    }

    let mut cmd = if rendered_args.is_empty() {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(&rendered_command);
        cmd
    } else {
        let mut cmd = Command::new(&rendered_command);
        cmd.args(&rendered_args);
        cmd
    };
    for (key, value) in env {
        let rendered = render_template(value, template_ctx)?;
        cmd.env(key, rendered);
    }
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    // Dropping the child on the cancellation path must kill the process.
    cmd.kill_on_drop(true);

    let child = cmd.spawn().map_err(|err| CommandError::Io(err.to_string()))?;
    let output = tokio::select! {
        result = child.wait_with_output() => {
            result.map_err(|err| CommandError::Io(err.to_string()))?
        }
        () = ctx.cancelled() => return Err(CommandError::Cancelled),
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(CommandOutput {
        output: combined,
        exit_code: output.status.code().unwrap_or(-1),
        success: output.status.success(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
