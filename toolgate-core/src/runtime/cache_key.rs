// toolgate-core/src/runtime/cache_key.rs
// ============================================================================
// Module: Cache Key Derivation
// Description: Key strategy selection and cache key formatting.
// Purpose: Map one invocation to a stable idempotency cache key.
// Dependencies: crate::hashing
// ============================================================================

//! ## Overview
//! Three strategies exist: the correlation ID as-is, a canonical hash of the
//! arguments, and `auto`, which uses the client-provided correlation ID when
//! one exists and falls back to the argument hash otherwise. The final key
//! is `<tool>:<key>`; an empty derived key disables caching for the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::correlation::DerivedCorrelation;
use crate::hashing::HashError;
use crate::hashing::hash_arguments;
use crate::protocol::ArgumentMap;

// ============================================================================
// SECTION: Strategy
// ============================================================================

/// Cache key strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Client-provided correlation ID when present, argument hash otherwise.
    #[default]
    Auto,
    /// Always the correlation ID.
    CorrelationId,
    /// Always the canonical argument hash.
    ArgumentsHash,
}

/// Error raised for unrecognized strategy labels.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported cache key strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for KeyStrategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "correlation_id" => Ok(Self::CorrelationId),
            "arguments_hash" => Ok(Self::ArgumentsHash),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Derives the cache key for one invocation.
///
/// Returns `None` when the derived key is empty, which disables caching for
/// this invocation only.
///
/// # Errors
///
/// Returns [`HashError`] when argument canonicalization fails.
pub fn derive_cache_key(
    tool_name: &str,
    correlation: &DerivedCorrelation,
    arguments: &ArgumentMap,
    strategy: KeyStrategy,
) -> Result<Option<String>, HashError> {
    let key = match strategy {
        KeyStrategy::CorrelationId => correlation.id.clone(),
        KeyStrategy::ArgumentsHash => hash_arguments(arguments)?,
        KeyStrategy::Auto => {
            if correlation.provided && !correlation.id.is_empty() {
                correlation.id.clone()
            } else {
                hash_arguments(arguments)?
            }
        }
    };
    if key.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("{tool_name}:{key}")))
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

    use super::KeyStrategy;
    use super::derive_cache_key;
    use crate::correlation::DerivedCorrelation;
    use crate::protocol::ArgumentMap;

    fn provided(id: &str) -> DerivedCorrelation {
        DerivedCorrelation {
            id: id.to_string(),
            provided: true,
        }
    }

    fn minted(id: &str) -> DerivedCorrelation {
        DerivedCorrelation {
            id: id.to_string(),
            provided: false,
        }
    }

    fn arguments(value: serde_json::Value) -> ArgumentMap {
        value.as_object().expect("object arguments").clone()
    }

    #[test]
    fn correlation_strategy_uses_the_id_verbatim() {
        let key = derive_cache_key("echo", &provided("abc"), &ArgumentMap::new(), KeyStrategy::CorrelationId)
            .expect("derive");
        assert_eq!(key.as_deref(), Some("echo:abc"));
    }

    #[test]
    fn auto_prefers_client_provided_ids() {
        let args = arguments(json!({"x": 1}));
        let key = derive_cache_key("echo", &provided("abc"), &args, KeyStrategy::Auto).expect("derive");
        assert_eq!(key.as_deref(), Some("echo:abc"));
    }

    #[test]
    fn auto_falls_back_to_argument_hash_for_minted_ids() {
        let args = arguments(json!({"x": 1}));
        let auto = derive_cache_key("echo", &minted("corr-1"), &args, KeyStrategy::Auto).expect("derive");
        let hashed =
            derive_cache_key("echo", &minted("corr-2"), &args, KeyStrategy::ArgumentsHash).expect("derive");
        assert_eq!(auto, hashed);
    }

    #[test]
    fn empty_derived_keys_disable_caching() {
        let key = derive_cache_key("echo", &minted(""), &ArgumentMap::new(), KeyStrategy::CorrelationId)
            .expect("derive");
        assert!(key.is_none());
    }

    #[test]
    fn strategy_labels_parse() {
        assert_eq!("auto".parse::<KeyStrategy>().expect("parse"), KeyStrategy::Auto);
        assert_eq!(
            "correlation_id".parse::<KeyStrategy>().expect("parse"),
            KeyStrategy::CorrelationId
        );
        assert_eq!(
            " Arguments_Hash ".parse::<KeyStrategy>().expect("parse"),
            KeyStrategy::ArgumentsHash
        );
        assert!("bogus".parse::<KeyStrategy>().is_err());
    }
}
