// toolgate-mcp/src/render.rs
// ============================================================================
// Module: Configuration Preprocessor
// Description: Env-expanding template pass over the raw YAML document.
// Purpose: Let operators splice environment values into the configuration.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! Before YAML parsing, the document runs through a small template pass.
//! Placeholders are `{{ function args... }}` with string-literal or nested
//! parenthesized arguments. Unknown functions are fatal, and every `env`
//! reference to an unset variable is collected and reported as a fatal
//! error listing all missing names.
//!
//! Invocation-time placeholders (`{{arg "field"}}`, `{{.ToolName}}`,
//! `{{.CorrelationID}}`) belong to command templates rendered per call, not
//! to this pass; they are copied through verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while rendering the configuration document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// A placeholder did not parse.
    #[error("parse template: {0}")]
    Syntax(String),
    /// A placeholder referenced an unknown helper.
    #[error("parse template: unknown function: {0}")]
    UnknownFunction(String),
    /// A helper was called with the wrong number of arguments.
    #[error("parse template: {0} arguments are invalid")]
    Arity(String),
    /// Referenced environment variables are unset.
    #[error("missing env vars: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a raw configuration document.
///
/// # Errors
///
/// Returns [`RenderError`] for syntax errors, unknown helpers, and missing
/// environment variables.
pub fn render_config(raw: &str) -> Result<String, RenderError> {
    let mut missing = BTreeSet::new();
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(RenderError::Syntax("unterminated placeholder".to_string()));
        };
        let expr = &after[..end];
        if is_invocation_placeholder(expr) {
            out.push_str("{{");
            out.push_str(expr);
            out.push_str("}}");
        } else {
            let mut parser = Parser::new(expr);
            let value = parser.parse_call(&mut missing)?;
            parser.expect_end()?;
            out.push_str(&value);
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    if !missing.is_empty() {
        return Err(RenderError::MissingEnv(missing.into_iter().collect()));
    }
    Ok(out)
}

/// Returns true when the placeholder is rendered at invocation time.
fn is_invocation_placeholder(expr: &str) -> bool {
    let trimmed = expr.trim_start();
    trimmed.starts_with('.') || trimmed.starts_with("arg ") || trimmed.starts_with("arg\"")
}

// ============================================================================
// SECTION: Expression Parser
// ============================================================================

/// Recursive-descent parser over one placeholder expression.
struct Parser<'a> {
    /// Remaining unparsed input.
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            rest: input,
        }
    }

    /// Parses `function arg*` and evaluates it.
    fn parse_call(&mut self, missing: &mut BTreeSet<String>) -> Result<String, RenderError> {
        self.skip_whitespace();
        let name = self.parse_ident()?;
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            match self.rest.chars().next() {
                Some('"') => args.push(self.parse_string()?),
                Some('(') => {
                    self.rest = &self.rest[1..];
                    let value = self.parse_call(missing)?;
                    self.skip_whitespace();
                    let Some(tail) = self.rest.strip_prefix(')') else {
                        return Err(RenderError::Syntax("expected ')'".to_string()));
                    };
                    self.rest = tail;
                    args.push(value);
                }
                _ => break,
            }
        }
        evaluate(&name, &args, missing)
    }

    /// Parses a helper identifier.
    fn parse_ident(&mut self) -> Result<String, RenderError> {
        let end = self
            .rest
            .find(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(RenderError::Syntax("expected function name".to_string()));
        }
        let (name, tail) = self.rest.split_at(end);
        self.rest = tail;
        Ok(name.to_string())
    }

    /// Parses a double-quoted string literal with backslash escapes.
    fn parse_string(&mut self) -> Result<String, RenderError> {
        let mut chars = self.rest.char_indices();
        let _ = chars.next();
        let mut value = String::new();
        let mut escaped = false;
        for (index, ch) in chars {
            if escaped {
                value.push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => {
                    self.rest = &self.rest[index + 1..];
                    return Ok(value);
                }
                other => value.push(other),
            }
        }
        Err(RenderError::Syntax("unterminated string literal".to_string()))
    }

    /// Requires the expression to be fully consumed.
    fn expect_end(&mut self) -> Result<(), RenderError> {
        self.skip_whitespace();
        if self.rest.is_empty() {
            return Ok(());
        }
        Err(RenderError::Syntax(format!("unexpected trailing input: {}", self.rest)))
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Evaluates one helper call.
fn evaluate(
    name: &str,
    args: &[String],
    missing: &mut BTreeSet<String>,
) -> Result<String, RenderError> {
    match name {
        "env" => {
            let [key] = args else {
                return Err(RenderError::Arity("env".to_string()));
            };
            match env::var(key) {
                Ok(value) => Ok(value),
                Err(_) => {
                    missing.insert(key.clone());
                    Ok(String::new())
                }
            }
        }
        "envOr" => {
            let [key, fallback] = args else {
                return Err(RenderError::Arity("envOr".to_string()));
            };
            Ok(env::var(key).unwrap_or_else(|_| fallback.clone()))
        }
        "default" => {
            let [fallback, value] = args else {
                return Err(RenderError::Arity("default".to_string()));
            };
            Ok(if value.is_empty() { fallback.clone() } else { value.clone() })
        }
        "ternary" => {
            let [condition, when_true, when_false] = args else {
                return Err(RenderError::Arity("ternary".to_string()));
            };
            let truthy = matches!(condition.trim().to_ascii_lowercase().as_str(), "true" | "1");
            Ok(if truthy { when_true.clone() } else { when_false.clone() })
        }
        "join" => {
            let Some((separator, items)) = args.split_first() else {
                return Err(RenderError::Arity("join".to_string()));
            };
            Ok(items.join(separator))
        }
        "lower" => {
            let [value] = args else {
                return Err(RenderError::Arity("lower".to_string()));
            };
            Ok(value.to_lowercase())
        }
        "upper" => {
            let [value] = args else {
                return Err(RenderError::Arity("upper".to_string()));
            };
            Ok(value.to_uppercase())
        }
        "trimPrefix" => {
            let [value, prefix] = args else {
                return Err(RenderError::Arity("trimPrefix".to_string()));
            };
            Ok(value.strip_prefix(prefix.as_str()).unwrap_or(value).to_string())
        }
        "trimSuffix" => {
            let [value, suffix] = args else {
                return Err(RenderError::Arity("trimSuffix".to_string()));
            };
            Ok(value.strip_suffix(suffix.as_str()).unwrap_or(value).to_string())
        }
        "replace" => {
            let [value, from, to] = args else {
                return Err(RenderError::Arity("replace".to_string()));
            };
            Ok(value.replace(from.as_str(), to))
        }
        other => Err(RenderError::UnknownFunction(other.to_string())),
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

    use super::RenderError;
    use super::render_config;

    // Env-var tests each use a unique variable name so parallel tests do
    // not race on shared process state.

    #[test]
    fn plain_documents_pass_through() {
        assert_eq!(render_config("server:\n  name: demo\n").expect("render"), "server:\n  name: demo\n");
    }

    #[test]
    fn env_expands_set_variables() {
        unsafe { std::env::set_var("TOOLGATE_RENDER_TEST_HOST", "10.0.0.1") };
        let rendered = render_config("host: {{ env \"TOOLGATE_RENDER_TEST_HOST\" }}").expect("render");
        assert_eq!(rendered, "host: 10.0.0.1");
    }

    #[test]
    fn missing_env_variables_are_fatal_and_collected() {
        let err = render_config(
            "a: {{ env \"TOOLGATE_RENDER_TEST_MISSING_A\" }}\nb: {{ env \"TOOLGATE_RENDER_TEST_MISSING_B\" }}",
        )
        .expect_err("missing env");
        assert_eq!(
            err,
            RenderError::MissingEnv(vec![
                "TOOLGATE_RENDER_TEST_MISSING_A".to_string(),
                "TOOLGATE_RENDER_TEST_MISSING_B".to_string(),
            ])
        );
    }

    #[test]
    fn env_or_falls_back() {
        let rendered =
            render_config("port: {{ envOr \"TOOLGATE_RENDER_TEST_UNSET_PORT\" \"8080\" }}")
                .expect("render");
        assert_eq!(rendered, "port: 8080");
    }

    #[test]
    fn helpers_compose_through_nesting() {
        unsafe { std::env::set_var("TOOLGATE_RENDER_TEST_NAME", "Gateway") };
        let rendered =
            render_config("name: {{ lower (env \"TOOLGATE_RENDER_TEST_NAME\") }}").expect("render");
        assert_eq!(rendered, "name: gateway");
    }

    #[test]
    fn default_replaces_empty_values() {
        let rendered = render_config(
            "log: {{ default \"info\" (envOr \"TOOLGATE_RENDER_TEST_UNSET_LOG\" \"\") }}",
        )
        .expect("render");
        assert_eq!(rendered, "log: info");
    }

    #[test]
    fn ternary_selects_branches() {
        assert_eq!(
            render_config("{{ ternary \"true\" \"a\" \"b\" }}").expect("render"),
            "a"
        );
        assert_eq!(
            render_config("{{ ternary \"no\" \"a\" \"b\" }}").expect("render"),
            "b"
        );
    }

    #[test]
    fn string_helpers_work() {
        assert_eq!(render_config("{{ upper \"abc\" }}").expect("render"), "ABC");
        assert_eq!(render_config("{{ trimPrefix \"v1.2\" \"v\" }}").expect("render"), "1.2");
        assert_eq!(render_config("{{ trimSuffix \"name.yaml\" \".yaml\" }}").expect("render"), "name");
        assert_eq!(render_config("{{ replace \"a-b-c\" \"-\" \".\" }}").expect("render"), "a.b.c");
        assert_eq!(render_config("{{ join \",\" \"a\" \"b\" \"c\" }}").expect("render"), "a,b,c");
    }

    #[test]
    fn unknown_functions_are_fatal() {
        let err = render_config("{{ secrets \"x\" }}").expect_err("unknown function");
        assert_eq!(err, RenderError::UnknownFunction("secrets".to_string()));
    }

    #[test]
    fn invocation_placeholders_pass_through_verbatim() {
        let document = "command: \"printf '%s' {{arg \\\"msg\\\"}} {{.ToolName}}\"";
        assert_eq!(render_config(document).expect("render"), document);
    }

    #[test]
    fn unterminated_placeholders_are_fatal() {
        let err = render_config("{{ env \"X\" ").expect_err("unterminated");
        assert!(matches!(err, RenderError::Syntax(_)));
    }
}
