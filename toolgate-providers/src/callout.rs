// toolgate-providers/src/callout.rs
// ============================================================================
// Module: HTTP Callout Plumbing
// Description: Shared client construction and bounded body reads.
// Purpose: Keep HTTP approver and executor request handling consistent.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! Both HTTP callouts build their client once with an explicit timeout and
//! cap response bodies at 1 MiB. Bodies are read chunk by chunk so an
//! oversized response is truncated rather than buffered whole.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::Method;
use reqwest::Response;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum bytes read from a callout response body.
pub const MAX_RESPONSE_BYTES: usize = 1 << 20;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error raised when the HTTP client cannot be constructed.
#[derive(Debug, Error)]
#[error("http client build failed: {0}")]
pub struct ClientBuildError(pub String);

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an HTTP client with the given total request timeout.
///
/// # Errors
///
/// Returns [`ClientBuildError`] when the client cannot be constructed.
pub fn build_client(timeout: Duration) -> Result<Client, ClientBuildError> {
    Client::builder().timeout(timeout).build().map_err(|err| ClientBuildError(err.to_string()))
}

/// Resolves the HTTP method, defaulting to POST.
#[must_use]
pub fn resolve_method(method: Option<&str>) -> Method {
    method
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| Method::from_bytes(value.to_ascii_uppercase().as_bytes()).ok())
        .unwrap_or(Method::POST)
}

/// Reads a response body, truncated at [`MAX_RESPONSE_BYTES`].
pub async fn read_body_limited(mut response: Response) -> Vec<u8> {
    let mut body = Vec::new();
    while let Ok(Some(chunk)) = response.chunk().await {
        let remaining = MAX_RESPONSE_BYTES.saturating_sub(body.len());
        if remaining == 0 {
            break;
        }
        let take = remaining.min(chunk.len());
        body.extend_from_slice(&chunk[..take]);
        if take < chunk.len() {
            break;
        }
    }
    body
}

// ============================================================================
// SECTION: Tests
// ============================================================================
