//! Envelope admission logic

use contract::{AgentEnvelope, ContractError, EnvelopeSchema, Violation};
use serde::Serialize;
use serde_json::Value;

use crate::run_tracker::SequenceError;

/// Why a unit was not admitted
#[derive(Debug)]
pub enum Rejection {
    /// Not JSON at all
    Malformed(String),
    /// JSON that breaks the envelope schema
    Schema(Vec<Violation>),
    /// Schema-valid JSON the typed surface still refused
    Typed(String),
    Sequence(SequenceError),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Malformed(_) => write!(f, "malformed_json"),
            Rejection::Schema(_) => write!(f, "schema_violation"),
            Rejection::Typed(_) => write!(f, "type_violation"),
            Rejection::Sequence(e) => write!(f, "{}", e),
        }
    }
}

/// Rejection report written for each refused unit
#[derive(Debug, Serialize)]
pub struct RejectionRecord {
    /// 1-based position of the unit in the input
    pub unit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

/// Validate one raw unit and build its typed envelope
pub fn validate_unit(schema: &EnvelopeSchema, raw: &str) -> Result<AgentEnvelope, Rejection> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| Rejection::Malformed(e.to_string()))?;

    match schema.parse(&value) {
        Ok(envelope) => Ok(envelope),
        Err(ContractError::Invalid(report)) => Err(Rejection::Schema(report.into_violations())),
        Err(e) => Err(Rejection::Typed(e.to_string())),
    }
}

/// Build the report for a rejected unit
pub fn create_rejection(
    unit: usize,
    raw: &str,
    rejection: Rejection,
    verbose: bool,
) -> RejectionRecord {
    // best effort: the id is only reported when the unit carried one
    let id = serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|value| value.get("id").and_then(Value::as_str).map(str::to_owned));
    let reason = rejection.to_string();

    let (detail, violations) = match rejection {
        Rejection::Malformed(detail) | Rejection::Typed(detail) => (Some(detail), Vec::new()),
        Rejection::Schema(violations) => (None, violations),
        Rejection::Sequence(_) => (None, Vec::new()),
    };

    if verbose {
        RejectionRecord {
            unit,
            id,
            reason,
            detail,
            violations,
        }
    } else {
        RejectionRecord {
            unit,
            id,
            reason,
            detail: None,
            violations: Vec::new(),
        }
    }
}
