// toolgate-core/src/correlation.rs
// ============================================================================
// Module: Correlation ID Policy
// Description: Extraction and generation of per-invocation correlation IDs.
// Purpose: Thread one stable identifier through cache, audit, and webhooks.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Callers may supply their own correlation ID in the tool arguments
//! (`correlation_id`, falling back to `request_id`). When neither is present
//! the gateway mints one from a boot-scoped random seed plus a monotonic
//! counter, which guarantees uniqueness within the process lifetime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;

use crate::protocol::ArgumentMap;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Boot-scoped correlation ID generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct CorrelationIdGenerator {
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for IDs issued in this process.
    counter: AtomicU64,
}

impl CorrelationIdGenerator {
    /// Creates a new generator seeded from the OS random source.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new correlation ID.
    #[must_use]
    pub fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("corr-{:016x}-{:016x}", self.boot_id, seq)
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Correlation ID derived for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedCorrelation {
    /// The correlation ID threaded through the invocation.
    pub id: String,
    /// True when the caller supplied the ID in the arguments.
    pub provided: bool,
}

/// Derives the correlation ID for an invocation.
///
/// `correlation_id` wins over `request_id` when both are present; empty
/// strings count as absent.
#[must_use]
pub fn derive_correlation(
    arguments: &ArgumentMap,
    generator: &CorrelationIdGenerator,
) -> DerivedCorrelation {
    for key in ["correlation_id", "request_id"] {
        if let Some(Value::String(raw)) = arguments.get(key)
            && !raw.is_empty()
        {
            return DerivedCorrelation {
                id: raw.clone(),
                provided: true,
            };
        }
    }
    DerivedCorrelation {
        id: generator.issue(),
        provided: false,
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

    use std::collections::HashSet;

    use serde_json::json;

    use super::CorrelationIdGenerator;
    use super::derive_correlation;
    use crate::protocol::ArgumentMap;

    fn arguments(value: serde_json::Value) -> ArgumentMap {
        value.as_object().expect("object arguments").clone()
    }

    #[test]
    fn client_correlation_id_wins() {
        let generator = CorrelationIdGenerator::new();
        let args = arguments(json!({"correlation_id": "abc", "request_id": "req"}));
        let derived = derive_correlation(&args, &generator);
        assert_eq!(derived.id, "abc");
        assert!(derived.provided);
    }

    #[test]
    fn request_id_used_when_correlation_absent() {
        let generator = CorrelationIdGenerator::new();
        let args = arguments(json!({"request_id": "req-7"}));
        let derived = derive_correlation(&args, &generator);
        assert_eq!(derived.id, "req-7");
        assert!(derived.provided);
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let generator = CorrelationIdGenerator::new();
        let args = arguments(json!({"correlation_id": "", "request_id": ""}));
        let derived = derive_correlation(&args, &generator);
        assert!(!derived.provided);
        assert!(derived.id.starts_with("corr-"));
    }

    #[test]
    fn minted_ids_are_unique() {
        let generator = CorrelationIdGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generator.issue()));
        }
    }

    #[test]
    fn non_string_values_are_ignored() {
        let generator = CorrelationIdGenerator::new();
        let args = arguments(json!({"correlation_id": 17}));
        let derived = derive_correlation(&args, &generator);
        assert!(!derived.provided);
    }
}
