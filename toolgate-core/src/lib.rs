// toolgate-core/src/lib.rs
// ============================================================================
// Module: Toolgate Core
// Description: Runtime core for the declarative tool gateway.
// Purpose: Provide the per-invocation state machine and its building blocks.
// Dependencies: serde, serde_json, sha2, tokio
// ============================================================================

//! ## Overview
//! Toolgate Core contains the pieces that run one tool invocation end to end:
//! correlation ID policy, argument redaction, canonical cache keys, the
//! idempotency cache, the approver chain, pending-store rendezvous for async
//! callouts, and the invocation engine that glues them together. Transport
//! and configuration concerns live in `toolgate-mcp`; outbound callouts live
//! in `toolgate-providers`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod correlation;
pub mod hashing;
pub mod interfaces;
pub mod messages;
pub mod protocol;
pub mod redact;
pub mod runtime;
pub mod template;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditKind;
pub use audit::AuditSink;
pub use audit::NoopAuditSink;
pub use correlation::CorrelationIdGenerator;
pub use correlation::DerivedCorrelation;
pub use correlation::derive_correlation;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_arguments;
pub use interfaces::ApprovalRequest;
pub use interfaces::Approver;
pub use interfaces::ApproverError;
pub use interfaces::Decision;
pub use interfaces::ExecutionRequest;
pub use interfaces::Executor;
pub use interfaces::ExecutorError;
pub use messages::Lang;
pub use messages::MessageBundle;
pub use protocol::ArgumentMap;
pub use protocol::ToolDecision;
pub use protocol::ToolResponse;
pub use protocol::ToolStatus;
pub use redact::redact_arguments;
pub use runtime::cache::IdempotencyCache;
pub use runtime::cache_key::KeyStrategy;
pub use runtime::cache_key::derive_cache_key;
pub use runtime::chain::ApproverChain;
pub use runtime::chain::TimeoutApprover;
pub use runtime::context::InvocationContext;
pub use runtime::engine::InvocationEngine;
pub use runtime::engine::RegisteredTool;
pub use runtime::limits::FieldPolicy;
pub use runtime::limits::LimitsApprover;
pub use runtime::pending::ApprovalPendingStore;
pub use runtime::pending::ExecutionOutcome;
pub use runtime::pending::ExecutionPendingStore;
pub use runtime::pending::ExecutionStatus;
pub use runtime::pending::PendingError;
pub use runtime::pending::PendingStore;
pub use template::TemplateContext;
pub use template::render_template;
