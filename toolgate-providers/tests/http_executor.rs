// toolgate-providers/tests/http_executor.rs
// ============================================================================
// Module: HTTP Executor Tests
// Description: Callout tests against a local loopback executor stub.
// Purpose: Validate result parsing, failures, and the async webhook bridge.
// Dependencies: toolgate-providers, toolgate-core, tiny_http
// ============================================================================

//! ## Overview
//! Runs the HTTP executor against a loopback `tiny_http` stub: success and
//! error statuses, result stringification, raw-body fallback, non-2xx
//! failures, the 202-then-webhook asynchronous path, and cancellation.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tiny_http::Response;
use tiny_http::Server;
use toolgate_core::interfaces::ExecutionRequest;
use toolgate_core::interfaces::Executor;
use toolgate_core::interfaces::ExecutorError;
use toolgate_core::protocol::ArgumentMap;
use toolgate_core::protocol::ExecutorTool;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_core::runtime::pending::ExecutionOutcome;
use toolgate_core::runtime::pending::ExecutionPendingStore;
use toolgate_core::runtime::pending::ExecutionStatus;
use toolgate_providers::HttpExecutor;
use toolgate_providers::HttpExecutorConfig;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Spawns a loopback stub that answers one request with the given reply.
fn spawn_stub(status: u16, body: &'static str) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("stub server");
    let addr = server.server_addr().to_ip().expect("stub addr");
    let url = format!("http://{addr}/run");
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let response = Response::from_string(body).with_status_code(status);
            let _ = request.respond(response);
        }
    });
    (url, handle)
}

fn executor(url: &str) -> HttpExecutor {
    HttpExecutor::new(
        HttpExecutorConfig {
            url: url.to_string(),
            method: None,
            headers: BTreeMap::new(),
            timeout: Some(Duration::from_secs(5)),
            async_mode: false,
            webhook_url: None,
            spec: None,
            tool: ExecutorTool {
                name: "deploy".to_string(),
                ..ExecutorTool::default()
            },
            lang: None,
            markup: None,
        },
        None,
    )
    .expect("executor")
}

fn async_executor(url: &str, store: Arc<ExecutionPendingStore>) -> HttpExecutor {
    HttpExecutor::new(
        HttpExecutorConfig {
            url: url.to_string(),
            method: None,
            headers: BTreeMap::new(),
            timeout: Some(Duration::from_secs(5)),
            async_mode: true,
            webhook_url: Some("https://gateway.example/webhook/executor".to_string()),
            spec: None,
            tool: ExecutorTool {
                name: "deploy".to_string(),
                ..ExecutorTool::default()
            },
            lang: None,
            markup: None,
        },
        Some(store),
    )
    .expect("executor")
}

fn request() -> ExecutionRequest {
    ExecutionRequest {
        tool_name: "deploy".to_string(),
        arguments: ArgumentMap::new(),
        correlation_id: "cid-1".to_string(),
    }
}

// ============================================================================
// SECTION: Synchronous Results
// ============================================================================

#[tokio::test]
async fn success_returns_the_result_string() {
    let (url, handle) = spawn_stub(200, r#"{"status": "success", "result": "deployed"}"#);
    let output =
        executor(&url).execute(&InvocationContext::background(), &request()).await.expect("output");
    handle.join().expect("stub thread");
    assert_eq!(output, "deployed");
}

#[tokio::test]
async fn structured_results_are_canonical_json() {
    let (url, handle) = spawn_stub(200, r#"{"status": "success", "result": {"a": 1}}"#);
    let output =
        executor(&url).execute(&InvocationContext::background(), &request()).await.expect("output");
    handle.join().expect("stub thread");
    assert_eq!(output, "{\"a\":1}");
}

#[tokio::test]
async fn empty_success_results_become_ok() {
    let (url, handle) = spawn_stub(200, r#"{"status": "success"}"#);
    let output =
        executor(&url).execute(&InvocationContext::background(), &request()).await.expect("output");
    handle.join().expect("stub thread");
    assert_eq!(output, "ok");
}

#[tokio::test]
async fn error_status_is_a_failure() {
    let (url, handle) = spawn_stub(200, r#"{"status": "error", "result": "disk full"}"#);
    let err = executor(&url)
        .execute(&InvocationContext::background(), &request())
        .await
        .expect_err("failure");
    handle.join().expect("stub thread");
    assert_eq!(err.to_string(), "disk full");
}

#[tokio::test]
async fn empty_error_results_become_executor_error() {
    let (url, handle) = spawn_stub(200, r#"{"status": "error"}"#);
    let err = executor(&url)
        .execute(&InvocationContext::background(), &request())
        .await
        .expect_err("failure");
    handle.join().expect("stub thread");
    assert_eq!(err.to_string(), "executor error");
}

#[tokio::test]
async fn unknown_statuses_are_failures() {
    let (url, handle) = spawn_stub(200, r#"{"status": "later"}"#);
    let err = executor(&url)
        .execute(&InvocationContext::background(), &request())
        .await
        .expect_err("failure");
    handle.join().expect("stub thread");
    assert_eq!(err.to_string(), "unknown executor status: later");
}

#[tokio::test]
async fn unrecognized_bodies_fall_back_to_trimmed_text() {
    let (url, handle) = spawn_stub(200, "  plain output  ");
    let output =
        executor(&url).execute(&InvocationContext::background(), &request()).await.expect("output");
    handle.join().expect("stub thread");
    assert_eq!(output, "plain output");
}

#[tokio::test]
async fn non_2xx_is_a_failure_with_status_and_body() {
    let (url, handle) = spawn_stub(500, "kaput");
    let err = executor(&url)
        .execute(&InvocationContext::background(), &request())
        .await
        .expect_err("failure");
    handle.join().expect("stub thread");
    assert_eq!(err.to_string(), "executor status 500: kaput");
}

#[tokio::test]
async fn pending_without_async_is_a_failure() {
    let (url, handle) = spawn_stub(200, r#"{"status": "pending"}"#);
    let err = executor(&url)
        .execute(&InvocationContext::background(), &request())
        .await
        .expect_err("failure");
    handle.join().expect("stub thread");
    assert_eq!(err.to_string(), "executor returned pending status");
}

// ============================================================================
// SECTION: Async Webhook Bridge
// ============================================================================

#[tokio::test]
async fn accepted_reply_waits_for_the_webhook_result() {
    let (url, handle) = spawn_stub(202, "");
    let store = Arc::new(ExecutionPendingStore::new());
    let executor = async_executor(&url, Arc::clone(&store));

    let resolver = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..50 {
                let outcome = ExecutionOutcome {
                    status: ExecutionStatus::Success,
                    result: "async done".to_string(),
                };
                if store.resolve("cid-1", outcome) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("pending execution never registered");
        })
    };

    let output =
        executor.execute(&InvocationContext::background(), &request()).await.expect("output");
    handle.join().expect("stub thread");
    resolver.await.expect("resolver task");
    assert_eq!(output, "async done");
    assert!(store.is_empty());
}

#[tokio::test]
async fn webhook_error_results_fail_the_execution() {
    let (url, handle) = spawn_stub(202, "");
    let store = Arc::new(ExecutionPendingStore::new());
    let executor = async_executor(&url, Arc::clone(&store));

    let resolver = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..50 {
                let outcome = ExecutionOutcome {
                    status: ExecutionStatus::Error,
                    result: "remote failure".to_string(),
                };
                if store.resolve("cid-1", outcome) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("pending execution never registered");
        })
    };

    let err = executor
        .execute(&InvocationContext::background(), &request())
        .await
        .expect_err("failure");
    handle.join().expect("stub thread");
    resolver.await.expect("resolver task");
    assert_eq!(err.to_string(), "remote failure");
}

#[tokio::test]
async fn cancellation_while_pending_is_an_execution_timeout() {
    let (url, handle) = spawn_stub(202, "");
    let store = Arc::new(ExecutionPendingStore::new());
    let executor = async_executor(&url, Arc::clone(&store));
    let ctx = InvocationContext::background().with_timeout(Duration::from_millis(200));

    let err = executor.execute(&ctx, &request()).await.expect_err("cancelled");
    handle.join().expect("stub thread");
    assert!(matches!(err, ExecutorError::Cancelled));
    assert_eq!(err.to_string(), "execution timeout");
    assert!(store.is_empty());
}
