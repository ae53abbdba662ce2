// toolgate-core/src/runtime/context.rs
// ============================================================================
// Module: Invocation Context
// Description: Deadline and cancellation propagation for one invocation.
// Purpose: Let every suspension point observe timeouts and shutdown.
// Dependencies: tokio, tokio-util
// ============================================================================

//! ## Overview
//! An invocation context carries an optional deadline plus the process
//! shutdown token. Deriving a child context never extends the parent
//! deadline; the earlier deadline always wins. Approvers, executors, and
//! pending-store waits race their work against [`InvocationContext::cancelled`]
//! so a caller disconnect, a tool timeout, or process shutdown unblocks them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Cooperative cancellation context for one invocation.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Absolute deadline, when the invocation is time-bounded.
    deadline: Option<Instant>,
    /// Process-wide shutdown token.
    shutdown: CancellationToken,
}

impl InvocationContext {
    /// Creates a context without a deadline, bound to a shutdown token.
    #[must_use]
    pub const fn new(shutdown: CancellationToken) -> Self {
        Self {
            deadline: None,
            shutdown,
        }
    }

    /// Creates a detached context with no deadline and no shutdown signal.
    #[must_use]
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Derives a child context bounded by `timeout` from now.
    ///
    /// The parent deadline still applies when it is earlier.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Returns the remaining time before the deadline, if one is set.
    ///
    /// A deadline in the past yields `Some(Duration::ZERO)`.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns true when the deadline has passed.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns true when the context can no longer make progress.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled() || self.is_deadline_exceeded()
    }

    /// Completes when the deadline elapses; pends forever without one.
    pub async fn deadline_elapsed(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    /// Completes on shutdown or deadline elapse, whichever happens first.
    pub async fn cancelled(&self) {
        tokio::select! {
            () = self.shutdown.cancelled() => {}
            () = self.deadline_elapsed() => {}
        }
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

    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::InvocationContext;

    #[tokio::test]
    async fn background_context_has_no_deadline() {
        let ctx = InvocationContext::background();
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_deadline_exceeded());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapses_after_timeout() {
        let ctx = InvocationContext::background().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_deadline_exceeded());
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(ctx.is_deadline_exceeded());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        ctx.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn child_deadline_never_extends_the_parent() {
        let parent = InvocationContext::background().with_timeout(Duration::from_millis(20));
        let child = parent.with_timeout(Duration::from_secs(60));
        tokio::time::advance(Duration::from_millis(30)).await;
        assert!(child.is_deadline_exceeded());
    }

    #[tokio::test]
    async fn shutdown_cancels_the_context() {
        let token = CancellationToken::new();
        let ctx = InvocationContext::new(token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
        ctx.cancelled().await;
    }
}
