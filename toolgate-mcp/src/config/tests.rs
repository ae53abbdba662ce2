// toolgate-mcp/src/config/tests.rs
// ============================================================================
// Module: Gateway Configuration Tests
// Description: Unit tests for DSL parsing, defaults, and validation.
// Purpose: Validate fail-closed behavior for malformed documents.
// Dependencies: toolgate-mcp
// ============================================================================

//! ## Overview
//! Parses representative YAML documents and checks defaults, duplicate
//! detection, duration parsing, strategy labels, async-over-stdio
//! rejection, and webhook URL constraints.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::time::Duration;

use toolgate_core::runtime::cache_key::KeyStrategy;

use super::GatewayConfig;
use super::TransportKind;
use super::parse_duration;
use super::webhook_path;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const MINIMAL: &str = r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: echo
    executor:
      type: shell
      command: "printf '%s' {{arg \"msg\"}}"
"#;

fn parse(document: &str) -> GatewayConfig {
    GatewayConfig::from_yaml(document).expect("valid config")
}

fn parse_err(document: &str) -> String {
    GatewayConfig::from_yaml(document).expect_err("invalid config").to_string()
}

// ============================================================================
// SECTION: Parsing and Defaults
// ============================================================================

#[test]
fn minimal_document_parses_with_defaults() {
    let config = parse(MINIMAL);
    assert_eq!(config.server.name, "demo");
    assert_eq!(config.server.transport, TransportKind::Http);
    assert_eq!(config.server.http.listen_addr(), "127.0.0.1:8080");
    assert_eq!(config.server.http.mcp_path(), "/mcp");
    assert_eq!(config.tools.len(), 1);
}

#[test]
fn listen_overrides_host_and_port() {
    let config = parse(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    listen: 0.0.0.0:9000
    host: ignored
    port: 1234
"#,
    );
    assert_eq!(config.server.http.listen_addr(), "0.0.0.0:9000");
}

#[test]
fn cache_defaults_resolve() {
    let config = parse(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
  idempotency_cache:
    enabled: true
"#,
    );
    let cache = &config.server.idempotency_cache;
    assert_eq!(cache.resolved_ttl().expect("ttl"), Duration::from_secs(3600));
    assert_eq!(cache.resolved_max_entries(), 1000);
    assert_eq!(cache.resolved_key_strategy().expect("strategy"), KeyStrategy::Auto);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
  surprise: true
"#,
    );
    assert!(err.contains("config parse failed"));
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn server_name_and_version_are_required() {
    let err = parse_err("server:\n  version: \"1.0\"\n");
    assert!(err.contains("server.name is required"));
    let err = parse_err("server:\n  name: demo\n");
    assert!(err.contains("server.version is required"));
}

#[test]
fn http_transport_requires_a_host() {
    let err = parse_err("server:\n  name: demo\n  version: \"1.0\"\n");
    assert!(err.contains("server.http.host is required"));
}

#[test]
fn stdio_transport_does_not_require_a_host() {
    let config = parse(
        r#"
server:
  name: demo
  version: "1.0"
  transport: stdio
"#,
    );
    assert_eq!(config.server.transport, TransportKind::Stdio);
}

#[test]
fn duplicate_tool_names_are_rejected() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: echo
    executor: {type: shell, command: "true"}
  - name: echo
    executor: {type: shell, command: "true"}
"#,
    );
    assert!(err.contains("duplicate tool name: echo"));
}

#[test]
fn duplicate_resource_uris_are_rejected() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
resources:
  - {uri: "doc://a", text: "x"}
  - {uri: "doc://a", text: "y"}
"#,
    );
    assert!(err.contains("duplicate resource uri: doc://a"));
}

#[test]
fn shell_executor_requires_a_command() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: echo
    executor: {type: shell}
"#,
    );
    assert!(err.contains("tools[0].executor.command is required"));
}

#[test]
fn invalid_durations_are_rejected() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: echo
    timeout: "soon"
    executor: {type: shell, command: "true"}
"#,
    );
    assert!(err.contains("tools[0].timeout is an invalid duration"));
}

#[test]
fn invalid_key_strategies_are_rejected() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
  idempotency_cache:
    enabled: true
    key_strategy: bogus
"#,
    );
    assert!(err.contains("key_strategy must be auto, correlation_id, or arguments_hash"));
}

#[test]
fn async_http_approver_requires_a_webhook() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: deploy
    executor: {type: shell, command: "true"}
    approvers:
      - {type: http, url: "https://approver.example/check", async: true}
"#,
    );
    assert!(err.contains("async http approver requires"));
}

#[test]
fn async_http_approver_over_stdio_is_rejected() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  transport: stdio
  approval_webhook_url: "https://gateway.example/webhook/approval"
tools:
  - name: deploy
    executor: {type: shell, command: "true"}
    approvers:
      - {type: http, url: "https://approver.example/check", async: true}
"#,
    );
    assert!(err.contains("async http approver requires http transport"));
}

#[test]
fn async_http_executor_over_stdio_is_rejected() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  transport: stdio
  executor_webhook_url: "https://gateway.example/webhook/executor"
tools:
  - name: deploy
    executor: {type: http, url: "https://runner.example/run", async: true}
"#,
    );
    assert!(err.contains("async http executor requires http transport"));
}

#[test]
fn webhook_urls_must_be_absolute_with_a_path() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
  approval_webhook_url: "https://gateway.example/"
"#,
    );
    assert!(err.contains("must include a path"));
}

#[test]
fn invalid_markup_is_rejected() {
    let err = parse_err(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: deploy
    executor: {type: shell, command: "true"}
    approvers:
      - {type: http, url: "https://approver.example/check", markup: plain}
"#,
    );
    assert!(err.contains("markup must be markdown or html"));
}

// ============================================================================
// SECTION: Durations and Webhook Paths
// ============================================================================

#[test]
fn duration_literals_parse() {
    assert_eq!(parse_duration("300ms").expect("duration"), Duration::from_millis(300));
    assert_eq!(parse_duration("10s").expect("duration"), Duration::from_secs(10));
    assert_eq!(parse_duration("5m").expect("duration"), Duration::from_secs(300));
    assert_eq!(parse_duration("1h30m").expect("duration"), Duration::from_secs(5400));
    assert_eq!(parse_duration("1.5s").expect("duration"), Duration::from_millis(1500));
}

#[test]
fn malformed_durations_fail() {
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("s").is_err());
    assert!(parse_duration("10 s").is_err());
    assert!(parse_duration("10w").is_err());
}

#[test]
fn webhook_paths_are_extracted() {
    assert_eq!(
        webhook_path("https://gateway.example/webhook/approval").as_deref(),
        Some("/webhook/approval")
    );
    assert!(webhook_path("https://gateway.example/").is_none());
    assert!(webhook_path("not a url").is_none());
}
