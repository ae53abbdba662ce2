// toolgate-core/src/runtime/chain.rs
// ============================================================================
// Module: Approver Chain
// Description: Ordered approver evaluation with a timeout decorator.
// Purpose: Run approvers sequentially and short-circuit on deny or error.
// Dependencies: crate::interfaces, tokio
// ============================================================================

//! ## Overview
//! The chain evaluates approvers in declared order. The first deny or error
//! halts the chain; when every approver allows, the chain reports approval.
//! A per-approver timeout is a decorator: the wrapped approver runs against
//! a derived deadline and an elapse turns into a deny with reason
//! "approval timeout" regardless of the inner outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::interfaces::ApprovalRequest;
use crate::interfaces::Approver;
use crate::interfaces::ApproverError;
use crate::interfaces::Decision;
use crate::runtime::context::InvocationContext;

// ============================================================================
// SECTION: Chain
// ============================================================================

/// Ordered pipeline of approvers.
#[derive(Clone, Default)]
pub struct ApproverChain {
    /// Approvers in evaluation order.
    approvers: Vec<Arc<dyn Approver>>,
}

impl ApproverChain {
    /// Creates a chain over the given approvers.
    #[must_use]
    pub fn new(approvers: Vec<Arc<dyn Approver>>) -> Self {
        Self {
            approvers,
        }
    }

    /// Returns true when no approvers are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.approvers.is_empty()
    }

    /// Evaluates the chain in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ApproverError`]; the chain halts at that point.
    pub async fn approve(
        &self,
        ctx: &InvocationContext,
        request: &ApprovalRequest,
    ) -> Result<Decision, ApproverError> {
        for approver in &self.approvers {
            let mut decision = approver.approve(ctx, request).await?;
            if !decision.allowed {
                if decision.source.is_empty() {
                    decision.source = approver.name().to_string();
                }
                return Ok(decision);
            }
        }
        Ok(Decision::allow("approved", ""))
    }
}

// ============================================================================
// SECTION: Timeout Decorator
// ============================================================================

/// Wraps an approver with a per-step deadline.
pub struct TimeoutApprover {
    /// Wrapped approver.
    inner: Arc<dyn Approver>,
    /// Maximum time the inner approver may take.
    timeout: Duration,
}

impl TimeoutApprover {
    /// Wraps `inner` with `timeout`. Non-positive timeouts return the inner
    /// approver unchanged.
    #[must_use]
    pub fn wrap(inner: Arc<dyn Approver>, timeout: Duration) -> Arc<dyn Approver> {
        if timeout.is_zero() {
            return inner;
        }
        Arc::new(Self {
            inner,
            timeout,
        })
    }
}

#[async_trait]
impl Approver for TimeoutApprover {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn approve(
        &self,
        ctx: &InvocationContext,
        request: &ApprovalRequest,
    ) -> Result<Decision, ApproverError> {
        let derived = ctx.with_timeout(self.timeout);
        let result = tokio::select! {
            result = self.inner.approve(&derived, request) => result,
            () = derived.deadline_elapsed() => {
                return Ok(Decision::deny("approval timeout", self.name()));
            }
        };
        if derived.is_deadline_exceeded() {
            return Ok(Decision::deny("approval timeout", self.name()));
        }
        result
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
