// toolgate-core/src/runtime/limits/tests.rs
// ============================================================================
// Module: Limits Approver Tests
// Description: Unit tests for field policies, counters, and rate limiting.
// Purpose: Validate denial messages and per-tool state isolation.
// Dependencies: toolgate-core
// ============================================================================

//! ## Overview
//! Exercises field policy checks (regex, numeric bounds, string lengths),
//! the max-total counter, the non-blocking token bucket, and per-tool state
//! isolation inside a single approver instance.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::time::Duration;
use std::time::Instant;

use serde_json::json;

use super::FieldPolicy;
use super::LimitsApprover;
use super::TokenBucket;
use crate::interfaces::ApprovalRequest;
use crate::interfaces::Approver;
use crate::messages::Lang;
use crate::messages::MessageBundle;
use crate::runtime::context::InvocationContext;

fn approver(max_total: u64, rate_per_minute: u32) -> LimitsApprover {
    LimitsApprover::new("limits", max_total, rate_per_minute, Vec::new(), MessageBundle::default())
        .expect("limits approver")
}

fn request(tool: &str, arguments: serde_json::Value) -> ApprovalRequest {
    ApprovalRequest {
        tool_name: tool.to_string(),
        arguments: arguments.as_object().expect("object arguments").clone(),
        correlation_id: "corr-1".to_string(),
    }
}

#[tokio::test]
async fn max_total_denies_after_the_ceiling() {
    let limits = approver(1, 0);
    let ctx = InvocationContext::background();
    let first = limits.approve(&ctx, &request("drop", json!({}))).await.expect("decision");
    assert!(first.allowed);
    let second = limits.approve(&ctx, &request("drop", json!({}))).await.expect("decision");
    assert!(!second.allowed);
    assert_eq!(second.reason, "Maximum number of calls exceeded");
    assert_eq!(second.source, "limits");
}

#[tokio::test]
async fn counters_are_per_tool() {
    let limits = approver(1, 0);
    let ctx = InvocationContext::background();
    assert!(limits.approve(&ctx, &request("a", json!({}))).await.expect("decision").allowed);
    assert!(limits.approve(&ctx, &request("b", json!({}))).await.expect("decision").allowed);
    assert!(!limits.approve(&ctx, &request("a", json!({}))).await.expect("decision").allowed);
}

#[tokio::test]
async fn rate_limit_denies_once_the_bucket_is_empty() {
    let limits = approver(0, 2);
    let ctx = InvocationContext::background();
    assert!(limits.approve(&ctx, &request("t", json!({}))).await.expect("decision").allowed);
    assert!(limits.approve(&ctx, &request("t", json!({}))).await.expect("decision").allowed);
    let third = limits.approve(&ctx, &request("t", json!({}))).await.expect("decision");
    assert!(!third.allowed);
    assert_eq!(third.reason, "Rate limit exceeded");
}

#[tokio::test]
async fn russian_messages_are_rendered() {
    let limits =
        LimitsApprover::new("limits", 1, 0, Vec::new(), MessageBundle::new(Lang::Ru))
            .expect("limits approver");
    let ctx = InvocationContext::background();
    assert!(limits.approve(&ctx, &request("t", json!({}))).await.expect("decision").allowed);
    let denied = limits.approve(&ctx, &request("t", json!({}))).await.expect("decision");
    assert_eq!(denied.reason, "Превышено максимальное количество вызовов");
}

#[tokio::test]
async fn regex_policy_denies_mismatches() {
    let policies = vec![(
        "name".to_string(),
        FieldPolicy {
            regex: Some("^[a-z]+$".to_string()),
            ..FieldPolicy::default()
        },
    )];
    let limits = LimitsApprover::new("limits", 0, 0, policies, MessageBundle::default())
        .expect("limits approver");
    let ctx = InvocationContext::background();
    let ok = limits.approve(&ctx, &request("t", json!({"name": "abc"}))).await.expect("decision");
    assert!(ok.allowed);
    let bad = limits.approve(&ctx, &request("t", json!({"name": "ABC1"}))).await.expect("decision");
    assert!(!bad.allowed);
    assert_eq!(bad.reason, "Field name does not match required format");
}

#[tokio::test]
async fn numeric_bounds_are_enforced() {
    let policies = vec![(
        "count".to_string(),
        FieldPolicy {
            min: Some(1.0),
            max: Some(10.0),
            ..FieldPolicy::default()
        },
    )];
    let limits = LimitsApprover::new("limits", 0, 0, policies, MessageBundle::default())
        .expect("limits approver");
    let ctx = InvocationContext::background();
    let low = limits.approve(&ctx, &request("t", json!({"count": 0}))).await.expect("decision");
    assert!(!low.allowed);
    assert_eq!(low.reason, "Field count is below minimum value 1");
    let high = limits.approve(&ctx, &request("t", json!({"count": 11.5}))).await.expect("decision");
    assert!(!high.allowed);
    assert_eq!(high.reason, "Field count is above maximum value 10");
    let ok = limits.approve(&ctx, &request("t", json!({"count": 5}))).await.expect("decision");
    assert!(ok.allowed);
}

#[tokio::test]
async fn string_length_bounds_are_enforced() {
    let policies = vec![(
        "name".to_string(),
        FieldPolicy {
            min_length: Some(2),
            max_length: Some(4),
            ..FieldPolicy::default()
        },
    )];
    let limits = LimitsApprover::new("limits", 0, 0, policies, MessageBundle::default())
        .expect("limits approver");
    let ctx = InvocationContext::background();
    let short = limits.approve(&ctx, &request("t", json!({"name": "a"}))).await.expect("decision");
    assert!(!short.allowed);
    assert_eq!(short.reason, "Field name is too short (minimum 2 characters)");
    let long =
        limits.approve(&ctx, &request("t", json!({"name": "abcde"}))).await.expect("decision");
    assert!(!long.allowed);
    assert_eq!(long.reason, "Field name is too long (maximum 4 characters)");
}

#[tokio::test]
async fn absent_fields_are_not_checked() {
    let policies = vec![(
        "name".to_string(),
        FieldPolicy {
            min_length: Some(2),
            ..FieldPolicy::default()
        },
    )];
    let limits = LimitsApprover::new("limits", 0, 0, policies, MessageBundle::default())
        .expect("limits approver");
    let ctx = InvocationContext::background();
    let decision = limits.approve(&ctx, &request("t", json!({}))).await.expect("decision");
    assert!(decision.allowed);
}

#[test]
fn invalid_regex_is_a_construction_error() {
    let policies = vec![(
        "name".to_string(),
        FieldPolicy {
            regex: Some("[".to_string()),
            ..FieldPolicy::default()
        },
    )];
    let err = LimitsApprover::new("limits", 0, 0, policies, MessageBundle::default())
        .expect_err("invalid regex");
    assert!(err.to_string().contains("invalid regex for field name"));
}

#[test]
fn token_bucket_refills_over_time() {
    let mut bucket = TokenBucket::per_minute(60);
    let start = Instant::now();
    for _ in 0..60 {
        assert!(bucket.try_acquire(start));
    }
    assert!(!bucket.try_acquire(start));
    // One token per second at 60/min.
    assert!(bucket.try_acquire(start + Duration::from_secs(1)));
    assert!(!bucket.try_acquire(start + Duration::from_secs(1)));
}
