// toolgate-mcp/src/registry/tests.rs
// ============================================================================
// Module: Tool Registry Tests
// Description: Unit tests for registry wiring and end-to-end invocations.
// Purpose: Validate built tools, listings, stores, and invocation flow.
// Dependencies: toolgate-mcp
// ============================================================================

//! ## Overview
//! Builds registries from YAML documents and drives invocations through
//! them: shell execution, limits denial, idempotency caching, pending-store
//! creation rules, and listing shapes.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::sync::Arc;

use serde_json::json;
use toolgate_core::audit::NoopAuditSink;
use toolgate_core::messages::Lang;
use toolgate_core::protocol::ArgumentMap;
use toolgate_core::protocol::ToolDecision;
use toolgate_core::protocol::ToolStatus;
use toolgate_core::runtime::context::InvocationContext;

use super::ToolRegistry;
use crate::config::GatewayConfig;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn registry(document: &str) -> ToolRegistry {
    let config = GatewayConfig::from_yaml(document).expect("valid config");
    ToolRegistry::from_config(&config, Lang::En, Arc::new(NoopAuditSink)).expect("registry")
}

fn arguments(value: serde_json::Value) -> ArgumentMap {
    value.as_object().expect("object").clone()
}

const ECHO: &str = r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: echo
    description: Echo a message
    executor:
      type: shell
      command: "printf '%s' {{arg \"msg\"}}"
"#;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn shell_tool_invokes_end_to_end() {
    let registry = registry(ECHO);
    let response = registry
        .invoke("echo", &InvocationContext::background(), arguments(json!({"msg": "hi"})))
        .await
        .expect("known tool");
    assert_eq!(response.status, ToolStatus::Success);
    assert_eq!(response.decision, ToolDecision::Approve);
    assert_eq!(response.reason, "hi");
}

#[tokio::test]
async fn unknown_tools_return_none() {
    let registry = registry(ECHO);
    let response = registry
        .invoke("missing", &InvocationContext::background(), ArgumentMap::new())
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn limits_approver_denies_the_second_call() {
    let registry = registry(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: drop
    executor:
      type: shell
      command: "printf ok"
    approvers:
      - type: limits
        max_total: 1
"#,
    );
    let ctx = InvocationContext::background();
    let first = registry.invoke("drop", &ctx, ArgumentMap::new()).await.expect("tool");
    assert_eq!(first.status, ToolStatus::Success);
    assert_eq!(first.reason, "ok");
    let second = registry.invoke("drop", &ctx, ArgumentMap::new()).await.expect("tool");
    assert_eq!(second.status, ToolStatus::Denied);
    assert_eq!(second.reason, "Maximum number of calls exceeded");
}

#[tokio::test]
async fn idempotency_cache_replays_responses() {
    let registry = registry(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
  idempotency_cache:
    enabled: true
    key_strategy: correlation_id
tools:
  - name: stamp
    executor:
      type: shell
      command: "printf '%s' {{arg \"x\"}}"
"#,
    );
    let ctx = InvocationContext::background();
    let first = registry
        .invoke("stamp", &ctx, arguments(json!({"correlation_id": "abc", "x": "1"})))
        .await
        .expect("tool");
    assert_eq!(first.reason, "1");
    let second = registry
        .invoke("stamp", &ctx, arguments(json!({"correlation_id": "abc", "x": "999"})))
        .await
        .expect("tool");
    assert_eq!(second.reason, "1");
    assert_eq!(second.correlation_id, "abc");
}

#[test]
fn pending_stores_follow_configuration() {
    let none = registry(ECHO);
    assert!(none.approvals().is_none());
    assert!(none.executions().is_none());

    let with_webhooks = registry(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
  approval_webhook_url: "https://gateway.example/webhook/approval"
  executor_webhook_url: "https://gateway.example/webhook/executor"
tools:
  - name: echo
    executor:
      type: shell
      command: "printf ok"
"#,
    );
    assert!(with_webhooks.approvals().is_some());
    assert!(with_webhooks.executions().is_some());
}

#[test]
fn listing_reports_schemas_and_annotations() {
    let registry = registry(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: lookup
    title: Lookup
    annotations:
      read_only_hint: true
    input_schema:
      type: object
      properties:
        id: {type: string}
    metadata:
      team: search
    executor:
      type: shell
      command: "printf ok"
"#,
    );
    let definitions = registry.definitions();
    assert_eq!(definitions.len(), 1);
    let value = serde_json::to_value(&definitions[0]).expect("definition json");
    assert_eq!(value["name"], "lookup");
    assert_eq!(value["title"], "Lookup");
    assert_eq!(value["inputSchema"]["type"], "object");
    assert_eq!(value["annotations"]["readOnlyHint"], true);
    assert_eq!(value["_meta"]["team"], "search");
}

#[test]
fn invalid_limit_regexes_fail_the_build() {
    let config = GatewayConfig::from_yaml(
        r#"
server:
  name: demo
  version: "1.0"
  http:
    host: 127.0.0.1
tools:
  - name: drop
    executor:
      type: shell
      command: "printf ok"
    approvers:
      - type: limits
        fields:
          name: {regex: "["}
"#,
    )
    .expect("valid document");
    let err = ToolRegistry::from_config(&config, Lang::En, Arc::new(NoopAuditSink))
        .expect_err("invalid regex");
    assert!(err.to_string().contains("invalid regex"));
}
