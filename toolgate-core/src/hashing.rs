// toolgate-core/src/hashing.rs
// ============================================================================
// Module: Canonical Hashing
// Description: RFC 8785 JSON canonicalization and argument hashing.
// Purpose: Provide deterministic cache keys independent of key order.
// Dependencies: serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Cache keys derived from arguments must not depend on map iteration order,
//! so arguments are encoded as RFC 8785 (JCS) canonical JSON before hashing.
//! The digest is SHA-256, rendered as lowercase hex.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::protocol::ArgumentMap;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes the arguments for cache keying.
///
/// `correlation_id` and `request_id` are removed before hashing so that a
/// repeated call with a fresh identifier still maps to the same key.
///
/// # Errors
///
/// Returns [`HashError`] when canonicalization fails.
pub fn hash_arguments(arguments: &ArgumentMap) -> Result<String, HashError> {
    let mut filtered = ArgumentMap::new();
    for (key, value) in arguments {
        if key == "correlation_id" || key == "request_id" {
            continue;
        }
        filtered.insert(key.clone(), value.clone());
    }
    let bytes = canonical_json_bytes(&filtered)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex_encode(&digest))
}

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
