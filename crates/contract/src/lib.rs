//! Agent I/O contract: the envelope exchanged between an agent process and its orchestrator
//!
//! This crate contains:
//! - Envelope and body types (the statically typed surface)
//! - The declarative envelope JSON Schema and its validator
//! - The OpenAPI description of the endpoints that carry envelopes
//! - Server-sent-events framing for envelope streams
//! - Shared errors
//!
//! Wire input is untrusted: validate it with [`EnvelopeSchema`] before
//! dispatching on its kind.
//!
//! ```
//! use contract::{EnvelopeSchema, KindedEnvelope};
//! use serde_json::json;
//!
//! let schema = EnvelopeSchema::shared().unwrap();
//! let value = json!({
//!     "version": "1.0",
//!     "id": "run-123",
//!     "timestamp": "2025-01-01T00:00:00Z",
//!     "kind": "action",
//!     "body": {"name": "search", "input": {"query": "lithium supply chain"}}
//! });
//!
//! match schema.parse(&value).unwrap().into_kinded() {
//!     KindedEnvelope::Action(action) => assert_eq!(action.body.name, "search"),
//!     other => panic!("unexpected {}", other.kind()),
//! }
//! ```

pub mod api;
pub mod envelope;
pub mod error;
pub mod fields;
pub mod schema;
pub mod sse;

// Re-export commonly used types
pub use api::{ApiDescription, Operation};
pub use envelope::{
    Action, ActionBody, ActionEnvelope, ActionInvocationResponse, AgentEnvelope,
    AgentStreamEvent, Body, Envelope, EnvelopeBody, EnvelopeKind, FinalAnswer, FinalBody,
    FinalEnvelope, FinalFailure, FinalSuccess, InvokeRequest, KindedEnvelope, Metadata,
    MetadataValue, Progress, ProgressBody, ProgressEnvelope, ProgressStatus,
};
pub use error::ContractError;
pub use fields::{Fraction, NonEmptyString, StepIndex, Timestamp, Version};
pub use schema::{EnvelopeSchema, Rule, ValidationReport, Violation};
