// toolgate-core/src/interfaces.rs
// ============================================================================
// Module: Runtime Interfaces
// Description: Approver and executor traits plus their request types.
// Purpose: Decouple the invocation engine from concrete callout backends.
// Dependencies: async-trait
// ============================================================================

//! ## Overview
//! Approvers decide whether an invocation may proceed; executors produce its
//! result. Both receive the invocation context so cancellation and deadlines
//! propagate into their waits. Concrete implementations live in
//! `toolgate-providers` (shell and HTTP) and in
//! [`crate::runtime::limits`] for the built-in limits approver.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::ArgumentMap;
use crate::runtime::context::InvocationContext;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Input handed to each approver in the chain.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Tool being approved.
    pub tool_name: String,
    /// Tool arguments, unredacted.
    pub arguments: ArgumentMap,
    /// Correlation ID of the invocation.
    pub correlation_id: String,
}

/// Input handed to the executor.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Tool being executed.
    pub tool_name: String,
    /// Tool arguments, unredacted.
    pub arguments: ArgumentMap,
    /// Correlation ID of the invocation.
    pub correlation_id: String,
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Outcome of a single approver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// True when the approver allows the invocation.
    pub allowed: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Approver that produced the decision.
    pub source: String,
}

impl Decision {
    /// Builds an allow decision.
    #[must_use]
    pub fn allow(reason: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            source: source.into(),
        }
    }

    /// Builds a deny decision.
    #[must_use]
    pub fn deny(reason: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            source: source.into(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Internal approver failures.
///
/// A denial is a normal [`Decision`], never an error; errors halt the chain
/// and surface as error responses.
#[derive(Debug, Error)]
pub enum ApproverError {
    /// The invocation context was cancelled while waiting for a decision.
    #[error("approval timeout")]
    Cancelled,
    /// The approver failed internally.
    #[error("{0}")]
    Failed(String),
}

/// Executor failures.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The invocation context was cancelled while waiting for a result.
    #[error("execution timeout")]
    Cancelled,
    /// The executor failed, optionally with partial output.
    #[error("{message}")]
    Failed {
        /// Failure description.
        message: String,
        /// Captured output, empty when none exists.
        output: String,
    },
}

impl ExecutorError {
    /// Builds a failure without captured output.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            output: String::new(),
        }
    }
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// A pluggable approval step.
#[async_trait]
pub trait Approver: Send + Sync {
    /// Returns the approver identifier used in audit and decisions.
    fn name(&self) -> &str;

    /// Decides whether the invocation may proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ApproverError`] on internal failure or cancellation.
    async fn approve(
        &self,
        ctx: &InvocationContext,
        request: &ApprovalRequest,
    ) -> Result<Decision, ApproverError>;
}

/// A pluggable executor producing the tool result.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs the tool and returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] on failure or cancellation.
    async fn execute(
        &self,
        ctx: &InvocationContext,
        request: &ExecutionRequest,
    ) -> Result<String, ExecutorError>;
}
