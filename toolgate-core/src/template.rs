// toolgate-core/src/template.rs
// ============================================================================
// Module: Invocation Templates
// Description: Minimal template renderer for commands, args, and env values.
// Purpose: Let operators splice invocation data into shell command lines.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Shell approvers and executors render their command, argument, and
//! environment templates against the current invocation. Supported
//! placeholders are `{{.ToolName}}`, `{{.CorrelationID}}`, and
//! `{{arg "field"}}`; anything else inside `{{ }}` is an error so typos in
//! operator configuration fail loudly instead of silently expanding to
//! nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::protocol::ArgumentMap;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Invocation data exposed to templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    /// Tool name.
    pub tool_name: &'a str,
    /// Correlation ID of the invocation.
    pub correlation_id: &'a str,
    /// Tool arguments.
    pub arguments: &'a ArgumentMap,
}

/// Errors raised while rendering a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{{` had no matching `}}`.
    #[error("template parse: unterminated placeholder")]
    Unterminated,
    /// A placeholder expression was not recognized.
    #[error("template parse: unknown placeholder: {0}")]
    UnknownPlaceholder(String),
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a template string against the invocation context.
///
/// # Errors
///
/// Returns [`TemplateError`] for unterminated or unrecognized placeholders.
pub fn render_template(template: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(TemplateError::Unterminated);
        };
        let expr = after[..end].trim();
        out.push_str(&evaluate(expr, ctx)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Evaluates a single placeholder expression.
fn evaluate(expr: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
    match expr {
        ".ToolName" => Ok(ctx.tool_name.to_string()),
        ".CorrelationID" => Ok(ctx.correlation_id.to_string()),
        _ => {
            if let Some(name) = parse_arg_lookup(expr) {
                return Ok(render_value(ctx.arguments.get(name)));
            }
            Err(TemplateError::UnknownPlaceholder(expr.to_string()))
        }
    }
}

/// Parses an `arg "field"` lookup expression.
fn parse_arg_lookup(expr: &str) -> Option<&str> {
    let rest = expr.strip_prefix("arg")?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('"')?;
    let rest = rest.strip_suffix('"')?;
    if rest.contains('"') {
        return None;
    }
    Some(rest)
}

/// Renders an argument value the way it should appear on a command line.
fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
