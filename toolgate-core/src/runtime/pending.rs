// toolgate-core/src/runtime/pending.rs
// ============================================================================
// Module: Pending Stores
// Description: One-shot rendezvous slots keyed by correlation ID.
// Purpose: Bridge async webhook callbacks to synchronously waiting callouts.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! An async HTTP callout registers its correlation ID before sending the
//! request and then waits on a single-slot channel. The matching webhook
//! resolves the slot with the external decision; cancellation drops the slot
//! so the waiter observes a closed channel. Exactly one of resolve and
//! cancel wins, guaranteed by the store mutex, and the slot is always
//! removed on finalization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::interfaces::Decision;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when registering a pending slot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PendingError {
    /// A slot already exists for this correlation ID.
    #[error("already pending")]
    AlreadyPending,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// One registered rendezvous slot.
struct PendingSlot<T> {
    /// Delivery side of the single-slot channel.
    tx: oneshot::Sender<T>,
    /// Label of the registering approver or executor.
    label: String,
}

/// Mutex-guarded map of pending rendezvous slots.
///
/// # Invariants
/// - At most one slot per correlation ID.
/// - After resolve or cancel the slot is absent and its channel closed.
pub struct PendingStore<T> {
    /// Slots keyed by correlation ID.
    slots: Mutex<HashMap<String, PendingSlot<T>>>,
}

impl<T> PendingStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a slot for `correlation_id` and returns its receiver.
    ///
    /// # Errors
    ///
    /// Returns [`PendingError::AlreadyPending`] on double registration.
    pub fn register(
        &self,
        correlation_id: &str,
        label: &str,
    ) -> Result<oneshot::Receiver<T>, PendingError> {
        let Ok(mut slots) = self.slots.lock() else {
            return Err(PendingError::AlreadyPending);
        };
        if slots.contains_key(correlation_id) {
            return Err(PendingError::AlreadyPending);
        }
        let (tx, rx) = oneshot::channel();
        slots.insert(
            correlation_id.to_string(),
            PendingSlot {
                tx,
                label: label.to_string(),
            },
        );
        Ok(rx)
    }

    /// Resolves the slot for `correlation_id` with `payload`.
    ///
    /// Returns false when no slot is registered. Delivery never blocks: when
    /// no receiver is waiting yet, the payload rides the slot.
    pub fn resolve(&self, correlation_id: &str, payload: T) -> bool {
        let Some(slot) = self.take(correlation_id) else {
            return false;
        };
        let _ = slot.tx.send(payload);
        true
    }

    /// Removes the slot for `correlation_id` without delivering.
    ///
    /// The receiver observes a closed channel.
    pub fn cancel(&self, correlation_id: &str) {
        drop(self.take(correlation_id));
    }

    /// Returns the label recorded for `correlation_id`, if pending.
    #[must_use]
    pub fn label(&self, correlation_id: &str) -> Option<String> {
        let slots = self.slots.lock().ok()?;
        slots.get(correlation_id).map(|slot| slot.label.clone())
    }

    /// Returns the number of registered slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().map_or(0, |slots| slots.len())
    }

    /// Returns true when no slots are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically removes and returns the slot for `correlation_id`.
    fn take(&self, correlation_id: &str) -> Option<PendingSlot<T>> {
        let Ok(mut slots) = self.slots.lock() else {
            return None;
        };
        slots.remove(correlation_id)
    }
}

impl<T> Default for PendingStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Store Payloads
// ============================================================================

/// Status delivered by the executor webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// The external executor succeeded.
    Success,
    /// The external executor failed.
    Error,
}

/// Result delivered to a waiting async executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Completion status.
    pub status: ExecutionStatus,
    /// Stringified execution result.
    pub result: String,
}

/// Pending store for async approvals.
pub type ApprovalPendingStore = PendingStore<Decision>;
/// Pending store for async executions.
pub type ExecutionPendingStore = PendingStore<ExecutionOutcome>;

/// Guard that cancels a pending slot when dropped.
///
/// Callouts hold one of these across their webhook wait so the slot is
/// removed on every exit path, including cancellation and errors. Cancel
/// after resolve is a no-op because the slot is already gone.
pub struct PendingGuard<T> {
    /// Store holding the slot.
    store: Arc<PendingStore<T>>,
    /// Correlation ID of the slot.
    correlation_id: String,
}

impl<T> PendingGuard<T> {
    /// Creates a guard for a registered slot.
    #[must_use]
    pub fn new(store: Arc<PendingStore<T>>, correlation_id: &str) -> Self {
        Self {
            store,
            correlation_id: correlation_id.to_string(),
        }
    }
}

impl<T> Drop for PendingGuard<T> {
    fn drop(&mut self) {
        self.store.cancel(&self.correlation_id);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
