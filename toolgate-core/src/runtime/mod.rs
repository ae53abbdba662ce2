// toolgate-core/src/runtime/mod.rs
// ============================================================================
// Module: Invocation Runtime
// Description: Per-invocation state machine and its supporting stores.
// Purpose: Coordinate cache, approval, execution, and audit for one call.
// Dependencies: crate::interfaces, tokio
// ============================================================================

//! ## Overview
//! The runtime owns everything that happens between receiving an arguments
//! map and returning a response triple: context and deadline handling, the
//! idempotency cache, cache key derivation, the approver chain, the limits
//! approver, pending-store rendezvous, and the engine that sequences them.

pub mod cache;
pub mod cache_key;
pub mod chain;
pub mod context;
pub mod engine;
pub mod limits;
pub mod pending;
