// toolgate-core/src/redact.rs
// ============================================================================
// Module: Argument Redaction
// Description: Masks sensitive argument values before logging and audit.
// Purpose: Keep secrets out of logs while leaving the invocation untouched.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Redaction is applied only to the copies of arguments that reach logs and
//! audit events; approvers and executors always receive the original values.
//! A key is sensitive when its lowercased, trimmed form contains one of the
//! known secret-bearing substrings and is not explicitly allow-listed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::protocol::ArgumentMap;

// ============================================================================
// SECTION: Key Classification
// ============================================================================

/// Substrings that mark an argument key as sensitive.
const SENSITIVE_SUBSTRINGS: &[&str] = &[
    "token",
    "password",
    "authorization",
    "apikey",
    "api_key",
    "access_key",
    "private_key",
    "credentials",
    "auth",
    "passwd",
    "key",
    "sig",
    "signature",
    "cookie",
    "session",
    "jwt",
    "bearer",
    "credential",
    "pwd",
    "passphrase",
    "secret_value",
];

/// Keys that are never redacted.
const ALLOW_LIST: &[&str] = &["secret_name"];

/// Returns true when the key should be masked.
fn is_sensitive_key(key: &str) -> bool {
    let lower = key.trim().to_lowercase();
    if ALLOW_LIST.contains(&lower.as_str()) {
        return false;
    }
    if lower.contains("secret") && lower.contains("name") {
        return false;
    }
    SENSITIVE_SUBSTRINGS.iter().any(|part| lower.contains(part))
}

// ============================================================================
// SECTION: Redaction
// ============================================================================

/// Returns a shallow copy of the arguments with sensitive values masked.
///
/// The output always carries exactly the same key set as the input; values
/// for sensitive keys are replaced by the literal `***`.
#[must_use]
pub fn redact_arguments(arguments: &ArgumentMap) -> ArgumentMap {
    let mut redacted = ArgumentMap::new();
    for (key, value) in arguments {
        if is_sensitive_key(key) {
            redacted.insert(key.clone(), Value::String("***".to_string()));
        } else {
            redacted.insert(key.clone(), value.clone());
        }
    }
    redacted
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

    use serde_json::json;

    use super::is_sensitive_key;
    use super::redact_arguments;
    use crate::protocol::ArgumentMap;

    fn arguments(value: serde_json::Value) -> ArgumentMap {
        value.as_object().expect("object arguments").clone()
    }

    #[test]
    fn masks_sensitive_keys_and_keeps_the_rest() {
        let args = arguments(json!({"user": "u", "password": "p", "secret_name": "db"}));
        let redacted = redact_arguments(&args);
        assert_eq!(redacted["user"], "u");
        assert_eq!(redacted["password"], "***");
        assert_eq!(redacted["secret_name"], "db");
    }

    #[test]
    fn preserves_the_exact_key_set() {
        let args = arguments(json!({"api_key": "k", "count": 3, "Authorization": "x"}));
        let redacted = redact_arguments(&args);
        let keys: Vec<&String> = args.keys().collect();
        let redacted_keys: Vec<&String> = redacted.keys().collect();
        assert_eq!(keys, redacted_keys);
        assert_eq!(redacted["api_key"], "***");
        assert_eq!(redacted["Authorization"], "***");
        assert_eq!(redacted["count"], 3);
    }

    #[test]
    fn secret_name_variants_are_allowed() {
        assert!(!is_sensitive_key("secret_name"));
        assert!(!is_sensitive_key("  Secret_Name "));
        assert!(!is_sensitive_key("db_secret_name"));
        assert!(is_sensitive_key("secret_value"));
        assert!(is_sensitive_key("SESSION"));
        assert!(is_sensitive_key("x-cookie"));
    }

    #[test]
    fn plain_keys_are_untouched() {
        assert!(!is_sensitive_key("message"));
        assert!(!is_sensitive_key("path"));
    }
}
