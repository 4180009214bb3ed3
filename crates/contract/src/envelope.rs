//! Envelope and body types for the agent I/O contract v1.0
//!
//! This is the statically typed mirror of `schema/agent-io.schema.json`.
//! Wire input should go through [`EnvelopeSchema::parse`](crate::EnvelopeSchema::parse);
//! deserializing these types directly is strict as well, but only the schema
//! reports every violation at once.
//!
//! A failed final answer cannot be built without its error:
//!
//! ```compile_fail
//! use contract::FinalFailure;
//!
//! let failure = FinalFailure {
//!     message: "bad".to_string(),
//!     citations: None,
//!     data: None,
//! };
//! ```
//!
//! ```
//! use contract::{FinalBody, NonEmptyString};
//!
//! let error = NonEmptyString::new("Traceback...").unwrap();
//! let body = FinalBody::failure("Tool crashed", error);
//! assert!(body.is_failure());
//! ```

use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ContractError;
use crate::fields::{present, Fraction, NonEmptyString, StepIndex, Timestamp, Version};

/// Envelope kinds; selects the body shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Progress,
    Action,
    Final,
}

impl EnvelopeKind {
    pub const ALL: [EnvelopeKind; 3] = [
        EnvelopeKind::Progress,
        EnvelopeKind::Action,
        EnvelopeKind::Final,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::Progress => "progress",
            EnvelopeKind::Action => "action",
            EnvelopeKind::Final => "final",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// A final envelope ends its run
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnvelopeKind::Final)
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(Number),
    String(String),
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Number(value.into())
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        MetadataValue::Number(value.into())
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

/// Free-form, additive envelope metadata
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Canonical envelope, generic over its body.
///
/// `kind` is not stored: it is derived from the body on serialization and
/// checked against the body type on deserialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<B> {
    pub version: Version,
    /// Run / correlation identifier
    pub id: NonEmptyString,
    pub timestamp: Timestamp,
    pub metadata: Option<Metadata>,
    pub body: B,
}

pub type ProgressEnvelope = Envelope<ProgressBody>;
pub type ActionEnvelope = Envelope<ActionBody>;
pub type FinalEnvelope = Envelope<FinalBody>;
/// Envelope of any kind, as read off a stream
pub type AgentEnvelope = Envelope<Body>;
pub type AgentStreamEvent = AgentEnvelope;

/// Body types that can ride in an envelope
pub trait EnvelopeBody: Serialize + Sized {
    fn kind(&self) -> EnvelopeKind;

    /// Build the body from its wire value, given the envelope's declared kind
    fn from_wire(kind: EnvelopeKind, body: Value) -> Result<Self, ContractError>;
}

impl<B> Envelope<B> {
    /// New envelope stamped with the current time
    pub fn new(id: NonEmptyString, body: B) -> Self {
        Self {
            version: Version::CURRENT,
            id,
            timestamp: Timestamp::now(),
            metadata: None,
            body,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn map_body<C>(self, f: impl FnOnce(B) -> C) -> Envelope<C> {
        Envelope {
            version: self.version,
            id: self.id,
            timestamp: self.timestamp,
            metadata: self.metadata,
            body: f(self.body),
        }
    }
}

impl<B: EnvelopeBody> Envelope<B> {
    pub fn kind(&self) -> EnvelopeKind {
        self.body.kind()
    }

    pub fn to_value(&self) -> Result<Value, ContractError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl<B: EnvelopeBody> Serialize for Envelope<B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.metadata.is_some() { 6 } else { 5 };
        let mut state = serializer.serialize_struct("Envelope", len)?;
        state.serialize_field("version", &self.version)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("kind", &self.body.kind())?;
        match &self.metadata {
            Some(metadata) => state.serialize_field("metadata", metadata)?,
            None => state.skip_field("metadata")?,
        }
        state.serialize_field("body", &self.body)?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEnvelope {
    version: Version,
    id: NonEmptyString,
    timestamp: Timestamp,
    kind: EnvelopeKind,
    #[serde(default, deserialize_with = "present")]
    metadata: Option<Metadata>,
    body: Value,
}

impl<'de, B: EnvelopeBody> Deserialize<'de> for Envelope<B> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireEnvelope::deserialize(deserializer)?;
        let body = B::from_wire(wire.kind, wire.body).map_err(|e| match e {
            ContractError::Json(inner) => de::Error::custom(inner),
            other => de::Error::custom(other),
        })?;
        Ok(Envelope {
            version: wire.version,
            id: wire.id,
            timestamp: wire.timestamp,
            metadata: wire.metadata,
            body,
        })
    }
}

fn expect_kind(expected: EnvelopeKind, found: EnvelopeKind) -> Result<(), ContractError> {
    if expected == found {
        Ok(())
    } else {
        Err(ContractError::KindMismatch { expected, found })
    }
}

/// Progress status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Pending,
    Running,
    Blocked,
    Complete,
}

/// Progress update: lightweight status of the running agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgressBody {
    pub status: ProgressStatus,
    pub message: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub progress: Option<Fraction>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub step: Option<StepIndex>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl ProgressBody {
    pub fn new(status: ProgressStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            progress: None,
            step: None,
            details: None,
        }
    }

    pub fn with_progress(mut self, progress: Fraction) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_step(mut self, step: u64) -> Self {
        self.step = Some(StepIndex::new(step));
        self
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }
}

impl EnvelopeBody for ProgressBody {
    fn kind(&self) -> EnvelopeKind {
        EnvelopeKind::Progress
    }

    fn from_wire(kind: EnvelopeKind, body: Value) -> Result<Self, ContractError> {
        expect_kind(EnvelopeKind::Progress, kind)?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Request to invoke an action or tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionBody {
    /// Correlation id for this action instance
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Arbitrary JSON input for the action
    pub input: Value,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(
        rename = "expectReply",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub expect_reply: Option<bool>,
}

impl ActionBody {
    pub fn new(name: impl Into<String>, input: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            input,
            reason: None,
            expect_reply: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn expecting_reply(mut self, expect_reply: bool) -> Self {
        self.expect_reply = Some(expect_reply);
        self
    }
}

impl EnvelopeBody for ActionBody {
    fn kind(&self) -> EnvelopeKind {
        EnvelopeKind::Action
    }

    fn from_wire(kind: EnvelopeKind, body: Value) -> Result<Self, ContractError> {
        expect_kind(EnvelopeKind::Action, kind)?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Final answer, tagged on `outcome`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum FinalBody {
    Success(FinalSuccess),
    Failure(FinalFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalSuccess {
    pub message: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// A failed run. `error` is mandatory and never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalFailure {
    pub message: String,
    pub error: NonEmptyString,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl FinalBody {
    pub fn success(message: impl Into<String>) -> Self {
        FinalBody::Success(FinalSuccess {
            message: message.into(),
            citations: None,
            data: None,
        })
    }

    pub fn failure(message: impl Into<String>, error: NonEmptyString) -> Self {
        FinalBody::Failure(FinalFailure {
            message: message.into(),
            error,
            citations: None,
            data: None,
        })
    }

    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        match &mut self {
            FinalBody::Success(body) => body.citations = Some(citations),
            FinalBody::Failure(body) => body.citations = Some(citations),
        }
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        match &mut self {
            FinalBody::Success(body) => body.data = Some(data),
            FinalBody::Failure(body) => body.data = Some(data),
        }
        self
    }

    pub fn message(&self) -> &str {
        match self {
            FinalBody::Success(body) => &body.message,
            FinalBody::Failure(body) => &body.message,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FinalBody::Success(_) => None,
            FinalBody::Failure(body) => Some(body.error.as_str()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FinalBody::Failure(_))
    }
}

impl EnvelopeBody for FinalBody {
    fn kind(&self) -> EnvelopeKind {
        EnvelopeKind::Final
    }

    fn from_wire(kind: EnvelopeKind, body: Value) -> Result<Self, ContractError> {
        expect_kind(EnvelopeKind::Final, kind)?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Body of any kind.
///
/// Serializes as the bare inner body; the discriminant lives on the
/// envelope as `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Body {
    Progress(ProgressBody),
    Action(ActionBody),
    Final(FinalBody),
}

impl EnvelopeBody for Body {
    fn kind(&self) -> EnvelopeKind {
        match self {
            Body::Progress(_) => EnvelopeKind::Progress,
            Body::Action(_) => EnvelopeKind::Action,
            Body::Final(_) => EnvelopeKind::Final,
        }
    }

    fn from_wire(kind: EnvelopeKind, body: Value) -> Result<Self, ContractError> {
        Ok(match kind {
            EnvelopeKind::Progress => Body::Progress(serde_json::from_value(body)?),
            EnvelopeKind::Action => Body::Action(serde_json::from_value(body)?),
            EnvelopeKind::Final => Body::Final(serde_json::from_value(body)?),
        })
    }
}

impl From<ProgressBody> for Body {
    fn from(body: ProgressBody) -> Self {
        Body::Progress(body)
    }
}

impl From<ActionBody> for Body {
    fn from(body: ActionBody) -> Self {
        Body::Action(body)
    }
}

impl From<FinalBody> for Body {
    fn from(body: FinalBody) -> Self {
        Body::Final(body)
    }
}

/// An envelope narrowed to its kind, for dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum KindedEnvelope {
    Progress(ProgressEnvelope),
    Action(ActionEnvelope),
    Final(FinalEnvelope),
}

impl AgentEnvelope {
    pub fn into_kinded(self) -> KindedEnvelope {
        let Envelope {
            version,
            id,
            timestamp,
            metadata,
            body,
        } = self;
        match body {
            Body::Progress(body) => KindedEnvelope::Progress(Envelope {
                version,
                id,
                timestamp,
                metadata,
                body,
            }),
            Body::Action(body) => KindedEnvelope::Action(Envelope {
                version,
                id,
                timestamp,
                metadata,
                body,
            }),
            Body::Final(body) => KindedEnvelope::Final(Envelope {
                version,
                id,
                timestamp,
                metadata,
                body,
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }
}

impl From<ProgressEnvelope> for AgentEnvelope {
    fn from(envelope: ProgressEnvelope) -> Self {
        envelope.map_body(Body::Progress)
    }
}

impl From<ActionEnvelope> for AgentEnvelope {
    fn from(envelope: ActionEnvelope) -> Self {
        envelope.map_body(Body::Action)
    }
}

impl From<FinalEnvelope> for AgentEnvelope {
    fn from(envelope: FinalEnvelope) -> Self {
        envelope.map_body(Body::Final)
    }
}

impl TryFrom<AgentEnvelope> for ProgressEnvelope {
    type Error = ContractError;

    fn try_from(envelope: AgentEnvelope) -> Result<Self, Self::Error> {
        match envelope.into_kinded() {
            KindedEnvelope::Progress(envelope) => Ok(envelope),
            other => Err(ContractError::KindMismatch {
                expected: EnvelopeKind::Progress,
                found: other.kind(),
            }),
        }
    }
}

impl TryFrom<AgentEnvelope> for ActionEnvelope {
    type Error = ContractError;

    fn try_from(envelope: AgentEnvelope) -> Result<Self, Self::Error> {
        match envelope.into_kinded() {
            KindedEnvelope::Action(envelope) => Ok(envelope),
            other => Err(ContractError::KindMismatch {
                expected: EnvelopeKind::Action,
                found: other.kind(),
            }),
        }
    }
}

impl TryFrom<AgentEnvelope> for FinalEnvelope {
    type Error = ContractError;

    fn try_from(envelope: AgentEnvelope) -> Result<Self, Self::Error> {
        match envelope.into_kinded() {
            KindedEnvelope::Final(envelope) => Ok(envelope),
            other => Err(ContractError::KindMismatch {
                expected: EnvelopeKind::Final,
                found: other.kind(),
            }),
        }
    }
}

impl KindedEnvelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            KindedEnvelope::Progress(_) => EnvelopeKind::Progress,
            KindedEnvelope::Action(_) => EnvelopeKind::Action,
            KindedEnvelope::Final(_) => EnvelopeKind::Final,
        }
    }

    pub fn id(&self) -> &NonEmptyString {
        match self {
            KindedEnvelope::Progress(envelope) => &envelope.id,
            KindedEnvelope::Action(envelope) => &envelope.id,
            KindedEnvelope::Final(envelope) => &envelope.id,
        }
    }
}

/// Response of `POST /action`: the action's correlation id and the envelope it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionInvocationResponse {
    pub id: String,
    pub envelope: AgentEnvelope,
}

/// Request body of `POST /invoke`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvokeRequest {
    pub input: Value,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

// Names used by the original contract surface
pub type FinalAnswer = FinalBody;
pub type Progress = ProgressBody;
pub type Action = ActionBody;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_id() -> NonEmptyString {
        NonEmptyString::new("run-abc").unwrap()
    }

    fn fixed_time() -> Timestamp {
        "2025-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_serialize_action_envelope() {
        let envelope: AgentEnvelope = Envelope::new(
            run_id(),
            Body::from(ActionBody::new("search", json!({"query": "lithium supply chain"}))),
        )
        .with_timestamp(fixed_time());

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "version": "1.0",
                "id": "run-abc",
                "timestamp": "2025-01-01T00:00:00Z",
                "kind": "action",
                "body": {"name": "search", "input": {"query": "lithium supply chain"}}
            })
        );
    }

    #[test]
    fn test_serialize_failure_carries_outcome_and_error() {
        let envelope = FinalEnvelope::new(
            run_id(),
            FinalBody::failure("Tool crashed", NonEmptyString::new("Traceback...").unwrap()),
        )
        .with_timestamp(fixed_time())
        .with_metadata("attempt", 2u64);

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["kind"], "final");
        assert_eq!(value["metadata"], json!({"attempt": 2}));
        assert_eq!(
            value["body"],
            json!({"outcome": "failure", "message": "Tool crashed", "error": "Traceback..."})
        );
    }

    #[test]
    fn test_deserialize_dispatches_on_kind() {
        let value = json!({
            "version": "1.0",
            "id": "run-123",
            "timestamp": "2025-01-01T00:00:00Z",
            "kind": "progress",
            "body": {"status": "pending", "message": "Queued"}
        });

        let envelope: AgentEnvelope = serde_json::from_value(value).unwrap();
        match envelope.into_kinded() {
            KindedEnvelope::Progress(progress) => {
                assert_eq!(progress.body.status, ProgressStatus::Pending);
                assert_eq!(progress.id.as_str(), "run-123");
            }
            other => panic!("expected progress, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_deserialize_rejects_failure_without_error() {
        let value = json!({
            "version": "1.0",
            "id": "run-123",
            "timestamp": "2025-01-01T00:00:00Z",
            "kind": "final",
            "body": {"outcome": "failure", "message": "Could not complete request"}
        });

        assert!(serde_json::from_value::<AgentEnvelope>(value).is_err());
    }

    #[test]
    fn test_deserialize_rejects_unknown_and_null_fields() {
        let extra_top = json!({
            "version": "1.0",
            "id": "run-1",
            "timestamp": "2025-01-01T00:00:00Z",
            "kind": "action",
            "extra": 1,
            "body": {"name": "search", "input": null}
        });
        assert!(serde_json::from_value::<AgentEnvelope>(extra_top).is_err());

        let extra_body = json!({
            "version": "1.0",
            "id": "run-1",
            "timestamp": "2025-01-01T00:00:00Z",
            "kind": "final",
            "body": {"outcome": "success", "message": "done", "extra": true}
        });
        assert!(serde_json::from_value::<AgentEnvelope>(extra_body).is_err());

        let null_metadata = json!({
            "version": "1.0",
            "id": "run-1",
            "timestamp": "2025-01-01T00:00:00Z",
            "kind": "action",
            "metadata": null,
            "body": {"name": "search", "input": null}
        });
        assert!(serde_json::from_value::<AgentEnvelope>(null_metadata).is_err());
    }

    #[test]
    fn test_body_error_is_reported_once() {
        let value = json!({
            "version": "1.0",
            "id": "run-1",
            "timestamp": "2025-01-01T00:00:00Z",
            "kind": "progress",
            "body": {"status": "running", "message": "m", "step": -1}
        });

        let err = serde_json::from_value::<AgentEnvelope>(value).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("not a non-negative integer"), "{}", message);
        assert!(!message.contains("JSON error"), "{}", message);
    }

    #[test]
    fn test_step_and_timestamp_keep_wire_form() {
        let value = json!({
            "version": "1.0",
            "id": "run-1",
            "timestamp": "2025-06-30T12:30:00.125+02:00",
            "kind": "progress",
            "body": {"status": "running", "message": "m", "step": 1.0}
        });

        let envelope: ProgressEnvelope = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(envelope.body.step.as_ref().and_then(StepIndex::get), Some(1));
        assert_eq!(serde_json::to_value(&envelope).unwrap(), value);
    }

    #[test]
    fn test_typed_envelope_checks_kind() {
        let value = json!({
            "version": "1.0",
            "id": "run-1",
            "timestamp": "2025-01-01T00:00:00Z",
            "kind": "action",
            "body": {"name": "search", "input": {}}
        });

        assert!(serde_json::from_value::<ActionEnvelope>(value.clone()).is_ok());
        assert!(serde_json::from_value::<ProgressEnvelope>(value).is_err());
    }

    #[test]
    fn test_narrowing_conversions() {
        let envelope: AgentEnvelope =
            ProgressEnvelope::new(run_id(), ProgressBody::new(ProgressStatus::Running, "Working"))
                .into();

        assert_eq!(envelope.kind(), EnvelopeKind::Progress);
        assert!(!envelope.is_terminal());

        let err = FinalEnvelope::try_from(envelope.clone()).unwrap_err();
        assert!(matches!(
            err,
            ContractError::KindMismatch {
                expected: EnvelopeKind::Final,
                found: EnvelopeKind::Progress
            }
        ));
        assert!(ProgressEnvelope::try_from(envelope).is_ok());
    }

    #[test]
    fn test_action_invocation_response() {
        let value = json!({
            "id": "call-1",
            "envelope": {
                "version": "1.0",
                "id": "run-1",
                "timestamp": "2025-01-01T00:00:00Z",
                "kind": "final",
                "body": {"outcome": "success", "message": "Completed", "citations": ["doc-1"]}
            }
        });

        let response: ActionInvocationResponse = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(response.id, "call-1");
        assert!(response.envelope.is_terminal());
        assert_eq!(serde_json::to_value(&response).unwrap(), value);
    }
}
