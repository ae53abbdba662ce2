// toolgate-core/src/runtime/limits.rs
// ============================================================================
// Module: Limits Approver
// Description: Field validation, call counting, and rate limiting.
// Purpose: Enforce declarative usage limits without external callouts.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! The limits approver checks field policies first without taking the state
//! mutex, then consults per-tool usage state under the mutex. The token
//! bucket never blocks: it reports allowance immediately, so the mutex is
//! never held across a suspension point. Counters are owned per approver
//! instance and keyed by tool name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::interfaces::ApprovalRequest;
use crate::interfaces::Approver;
use crate::interfaces::ApproverError;
use crate::interfaces::Decision;
use crate::messages::MessageBundle;
use crate::protocol::ArgumentMap;
use crate::runtime::context::InvocationContext;

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Validation rules for a single argument field.
#[derive(Debug, Clone, Default)]
pub struct FieldPolicy {
    /// Regex the string value must match.
    pub regex: Option<String>,
    /// Numeric minimum.
    pub min: Option<f64>,
    /// Numeric maximum.
    pub max: Option<f64>,
    /// String minimum length.
    pub min_length: Option<usize>,
    /// String maximum length.
    pub max_length: Option<usize>,
}

/// Field policy with its regex compiled.
struct CompiledPolicy {
    /// Source policy.
    policy: FieldPolicy,
    /// Compiled regex, when one is configured.
    regex: Option<Regex>,
}

/// Errors raised while constructing a limits approver.
#[derive(Debug, Error)]
pub enum LimitsError {
    /// A field policy regex did not compile.
    #[error("invalid regex for field {field}: {message}")]
    InvalidRegex {
        /// Field the policy applies to.
        field: String,
        /// Regex compiler diagnostic.
        message: String,
    },
}

// ============================================================================
// SECTION: Token Bucket
// ============================================================================

/// Non-blocking token bucket limiter.
///
/// # Invariants
/// - `try_acquire` never waits; it reports allowance for this instant.
#[derive(Debug)]
struct TokenBucket {
    /// Maximum tokens the bucket can hold.
    capacity: f64,
    /// Tokens currently available.
    tokens: f64,
    /// Tokens added per second.
    refill_per_sec: f64,
    /// Last refill time.
    refilled_at: Instant,
}

impl TokenBucket {
    /// Creates a bucket sized for `rate_per_minute`, starting full.
    fn per_minute(rate_per_minute: u32) -> Self {
        let capacity = f64::from(rate_per_minute);
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec: capacity / 60.0,
            refilled_at: Instant::now(),
        }
    }

    /// Takes one token when available.
    fn try_acquire(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.refilled_at);
        self.refilled_at = now;
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return true;
        }
        false
    }
}

// ============================================================================
// SECTION: Approver
// ============================================================================

/// Per-tool usage state.
#[derive(Debug, Default)]
struct ToolUsage {
    /// Total calls admitted so far.
    count: u64,
    /// Rate limiter, when a rate is configured.
    bucket: Option<TokenBucket>,
}

/// Declarative limits approver.
pub struct LimitsApprover {
    /// Approver label used in decisions and audit.
    label: String,
    /// Total call ceiling; zero disables the check.
    max_total: u64,
    /// Calls per minute; zero disables the rate limit.
    rate_per_minute: u32,
    /// Field policies with compiled regexes.
    policies: Vec<(String, CompiledPolicy)>,
    /// Localized denial messages.
    messages: MessageBundle,
    /// Per-tool usage keyed by tool name.
    usage: Mutex<HashMap<String, ToolUsage>>,
}

impl std::fmt::Debug for LimitsApprover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitsApprover")
            .field("label", &self.label)
            .field("max_total", &self.max_total)
            .field("rate_per_minute", &self.rate_per_minute)
            .field("policy_count", &self.policies.len())
            .finish()
    }
}

impl LimitsApprover {
    /// Creates a limits approver, compiling field regexes.
    ///
    /// # Errors
    ///
    /// Returns [`LimitsError`] when a policy regex is invalid; this is a
    /// configuration error and fails startup.
    pub fn new(
        label: impl Into<String>,
        max_total: u64,
        rate_per_minute: u32,
        field_policies: Vec<(String, FieldPolicy)>,
        messages: MessageBundle,
    ) -> Result<Self, LimitsError> {
        let mut policies = Vec::with_capacity(field_policies.len());
        for (field, policy) in field_policies {
            let regex = match &policy.regex {
                Some(pattern) if !pattern.is_empty() => {
                    Some(Regex::new(pattern).map_err(|err| LimitsError::InvalidRegex {
                        field: field.clone(),
                        message: err.to_string(),
                    })?)
                }
                _ => None,
            };
            policies.push((
                field,
                CompiledPolicy {
                    policy,
                    regex,
                },
            ));
        }
        Ok(Self {
            label: label.into(),
            max_total,
            rate_per_minute,
            policies,
            messages,
            usage: Mutex::new(HashMap::new()),
        })
    }

    /// Checks field policies against the arguments. No mutex is taken.
    fn check_fields(&self, arguments: &ArgumentMap) -> Result<(), String> {
        for (field, compiled) in &self.policies {
            let Some(value) = arguments.get(field) else {
                continue;
            };
            match value {
                Value::String(text) => {
                    self.check_string(field, text, compiled)?;
                }
                Value::Number(number) => {
                    if let Some(value) = number.as_f64() {
                        self.check_range(field, value, &compiled.policy)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Validates a string field against length bounds and the regex.
    fn check_string(
        &self,
        field: &str,
        text: &str,
        compiled: &CompiledPolicy,
    ) -> Result<(), String> {
        let length = text.chars().count();
        if let Some(min_length) = compiled.policy.min_length
            && length < min_length
        {
            return Err(self.messages.render(
                "limits.field_min_length",
                &[("field", field.to_string()), ("min_length", min_length.to_string())],
            ));
        }
        if let Some(max_length) = compiled.policy.max_length
            && length > max_length
        {
            return Err(self.messages.render(
                "limits.field_max_length",
                &[("field", field.to_string()), ("max_length", max_length.to_string())],
            ));
        }
        if let Some(regex) = &compiled.regex
            && !regex.is_match(text)
        {
            return Err(
                self.messages.render("limits.field_regex", &[("field", field.to_string())])
            );
        }
        Ok(())
    }

    /// Validates a numeric field against min/max bounds.
    fn check_range(&self, field: &str, value: f64, policy: &FieldPolicy) -> Result<(), String> {
        if let Some(min) = policy.min
            && value < min
        {
            return Err(self.messages.render(
                "limits.field_min",
                &[("field", field.to_string()), ("min", min.to_string())],
            ));
        }
        if let Some(max) = policy.max
            && value > max
        {
            return Err(self.messages.render(
                "limits.field_max",
                &[("field", field.to_string()), ("max", max.to_string())],
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Approver for LimitsApprover {
    fn name(&self) -> &str {
        if self.label.is_empty() { "limits" } else { &self.label }
    }

    async fn approve(
        &self,
        _ctx: &InvocationContext,
        request: &ApprovalRequest,
    ) -> Result<Decision, ApproverError> {
        if let Err(message) = self.check_fields(&request.arguments) {
            return Ok(Decision::deny(message, self.name()));
        }

        let Ok(mut usage) = self.usage.lock() else {
            return Err(ApproverError::Failed("limits state unavailable".to_string()));
        };
        let state = usage.entry(request.tool_name.clone()).or_insert_with(|| {
            let bucket =
                (self.rate_per_minute > 0).then(|| TokenBucket::per_minute(self.rate_per_minute));
            ToolUsage {
                count: 0,
                bucket,
            }
        });

        if self.max_total > 0 && state.count >= self.max_total {
            let message = self.messages.render("limits.max_total", &[]);
            return Ok(Decision::deny(message, self.name()));
        }
        if let Some(bucket) = &mut state.bucket
            && !bucket.try_acquire(Instant::now())
        {
            let message = self.messages.render("limits.rate_limit", &[]);
            return Ok(Decision::deny(message, self.name()));
        }

        state.count += 1;
        Ok(Decision::allow("approved", self.name()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
