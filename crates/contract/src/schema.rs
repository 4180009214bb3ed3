//! Envelope JSON Schema and the validator built on it
//!
//! The schema is data, not code: `schema/agent-io.schema.json` is embedded
//! verbatim and exposed as [`SCHEMA_SOURCE`] so tooling in other languages
//! validates against exactly the same document.
//!
//! # Validation report
//!
//! [`EnvelopeSchema::validate`] never fails. It returns a
//! [`ValidationReport`] holding every violation found, each with a JSON
//! Pointer to the offending location and the [`Rule`] that was broken.
//!
//! Two rules come from resolving the body union rather than from a single
//! schema keyword:
//!
//! - [`Rule::FailureWithoutError`]: `kind` is `final`, `outcome` is
//!   `failure`, and `error` is missing or empty.
//! - [`Rule::DiscriminantMismatch`]: the body does not fit the shape its
//!   discriminant (`kind` or `outcome`) selects, but fits another one.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, Validator};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

use crate::envelope::{AgentEnvelope, Envelope, EnvelopeBody, EnvelopeKind};
use crate::error::ContractError;

/// The envelope schema document, byte for byte
pub const SCHEMA_SOURCE: &str = include_str!("../schema/agent-io.schema.json");

/// File name other documents use to reference the schema
pub const SCHEMA_FILE_NAME: &str = "agent-io.schema.json";

const DRAFT_URI: &str = "https://json-schema.org/draft/2020-12/schema";

static SHARED: OnceCell<EnvelopeSchema> = OnceCell::new();

/// What a violation broke
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    MissingField {
        field: String,
    },
    UnknownField {
        field: String,
    },
    TypeMismatch,
    OutOfRange,
    /// Value not among the allowed literals
    InvalidValue,
    InvalidFormat,
    EmptyValue,
    UnsupportedVersion,
    DiscriminantMismatch {
        discriminant: String,
        declared: String,
        matches: String,
    },
    FailureWithoutError,
    Other,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::MissingField { .. } => write!(f, "missing_field"),
            Rule::UnknownField { .. } => write!(f, "unknown_field"),
            Rule::TypeMismatch => write!(f, "type_mismatch"),
            Rule::OutOfRange => write!(f, "out_of_range"),
            Rule::InvalidValue => write!(f, "invalid_value"),
            Rule::InvalidFormat => write!(f, "invalid_format"),
            Rule::EmptyValue => write!(f, "empty_value"),
            Rule::UnsupportedVersion => write!(f, "unsupported_version"),
            Rule::DiscriminantMismatch { .. } => write!(f, "discriminant_mismatch"),
            Rule::FailureWithoutError => write!(f, "failure_without_error"),
            Rule::Other => write!(f, "other"),
        }
    }
}

/// One schema violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON Pointer into the validated document; empty for the root
    pub path: String,
    #[serde(flatten)]
    pub rule: Rule,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{} [{}]: {}", path, self.rule, self.message)
    }
}

/// Outcome of validating one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Violations reported at exactly `path`
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.path == path)
    }

    pub fn has(&self, predicate: impl Fn(&Rule) -> bool) -> bool {
        self.violations.iter().any(|v| predicate(&v.rule))
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "valid");
        }
        write!(f, "{} violation(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "; {}", violation)?;
        }
        Ok(())
    }
}

/// Concrete body shapes the union can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyShape {
    Progress,
    Action,
    FinalSuccess,
    FinalFailure,
}

impl BodyShape {
    const ALL: [BodyShape; 4] = [
        BodyShape::Progress,
        BodyShape::Action,
        BodyShape::FinalSuccess,
        BodyShape::FinalFailure,
    ];

    fn def_name(self) -> &'static str {
        match self {
            BodyShape::Progress => "ProgressBody",
            BodyShape::Action => "ActionBody",
            BodyShape::FinalSuccess => "FinalSuccessBody",
            BodyShape::FinalFailure => "FinalFailureBody",
        }
    }

    fn kind(self) -> EnvelopeKind {
        match self {
            BodyShape::Progress => EnvelopeKind::Progress,
            BodyShape::Action => EnvelopeKind::Action,
            BodyShape::FinalSuccess | BodyShape::FinalFailure => EnvelopeKind::Final,
        }
    }

    fn outcome(self) -> Option<&'static str> {
        match self {
            BodyShape::FinalSuccess => Some("success"),
            BodyShape::FinalFailure => Some("failure"),
            BodyShape::Progress | BodyShape::Action => None,
        }
    }
}

/// Compiled envelope schema
pub struct EnvelopeSchema {
    document: Value,
    validator: Validator,
    shapes: Vec<(BodyShape, Validator)>,
}

impl fmt::Debug for EnvelopeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeSchema")
            .field("title", &self.document.get("title"))
            .finish_non_exhaustive()
    }
}

impl EnvelopeSchema {
    /// Compile the embedded schema
    pub fn new() -> Result<Self, ContractError> {
        Self::from_source(SCHEMA_SOURCE)
    }

    /// Process-wide compiled schema, built on first use
    pub fn shared() -> Result<&'static EnvelopeSchema, ContractError> {
        SHARED.get_or_try_init(Self::new)
    }

    pub fn from_source(source: &str) -> Result<Self, ContractError> {
        let document: Value = serde_json::from_str(source)?;
        Self::from_document(document)
    }

    pub fn from_document(document: Value) -> Result<Self, ContractError> {
        let validator = compile(&document)?;
        let defs = document
            .get("$defs")
            .cloned()
            .ok_or_else(|| ContractError::Schema("schema has no $defs".to_string()))?;

        let mut shapes = Vec::with_capacity(BodyShape::ALL.len());
        for shape in BodyShape::ALL {
            if defs.get(shape.def_name()).is_none() {
                return Err(ContractError::Schema(format!(
                    "schema is missing $defs/{}",
                    shape.def_name()
                )));
            }
            let schema = json!({
                "$schema": DRAFT_URI,
                "$defs": defs.clone(),
                "$ref": format!("#/$defs/{}", shape.def_name()),
            });
            shapes.push((shape, compile(&schema)?));
        }

        Ok(Self {
            document,
            validator,
            shapes,
        })
    }

    /// The schema document this validator was compiled from
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Validate any JSON value and collect every violation
    pub fn validate(&self, instance: &Value) -> ValidationReport {
        let mut violations: Vec<Violation> = Vec::new();
        for error in self.validator.iter_errors(instance) {
            for violation in classify(&error) {
                if !violations.contains(&violation) {
                    violations.push(violation);
                }
            }
        }

        if !violations.is_empty() {
            self.resolve_union(instance, &mut violations);
            debug!(
                violations = violations.len(),
                "envelope failed schema validation"
            );
        }

        ValidationReport { violations }
    }

    /// Validate, then deserialize into the typed surface
    pub fn parse(&self, instance: &Value) -> Result<AgentEnvelope, ContractError> {
        self.parse_as(instance)
    }

    /// Like [`parse`](Self::parse) but for one specific envelope kind
    pub fn parse_as<B: EnvelopeBody>(&self, instance: &Value) -> Result<Envelope<B>, ContractError> {
        let report = self.validate(instance);
        if !report.is_valid() {
            return Err(ContractError::Invalid(report));
        }
        Ok(serde_json::from_value(instance.clone())?)
    }

    pub fn parse_str(&self, raw: &str) -> Result<AgentEnvelope, ContractError> {
        let instance: Value = serde_json::from_str(raw)?;
        self.parse(&instance)
    }

    fn shape_matches(&self, shape: BodyShape, body: &Value) -> bool {
        self.shapes
            .iter()
            .find(|(candidate, _)| *candidate == shape)
            .map(|(_, validator)| validator.is_valid(body))
            .unwrap_or(false)
    }

    /// Attach union-resolution records once the structural pass has failed
    fn resolve_union(&self, instance: &Value, violations: &mut Vec<Violation>) {
        let Some(kind) = instance
            .get("kind")
            .and_then(Value::as_str)
            .and_then(EnvelopeKind::from_wire)
        else {
            return;
        };
        let Some(body) = instance.get("body").filter(|body| body.is_object()) else {
            return;
        };
        if !violations.iter().any(|v| v.path.starts_with("/body")) {
            return;
        }

        let outcome = body.get("outcome").and_then(Value::as_str);
        if kind == EnvelopeKind::Final && outcome == Some("failure") {
            for violation in violations.iter_mut() {
                if violation.path != "/body/error" {
                    continue;
                }
                let missing = match &violation.rule {
                    Rule::MissingField { field } => field == "error",
                    Rule::TypeMismatch => body.get("error").is_some_and(Value::is_null),
                    Rule::EmptyValue => true,
                    _ => false,
                };
                if missing {
                    violation.rule = Rule::FailureWithoutError;
                    violation.message =
                        "a failure outcome must carry a non-empty error".to_string();
                }
            }
            let mut seen = Vec::with_capacity(violations.len());
            violations.retain(|violation| {
                if seen.contains(violation) {
                    return false;
                }
                seen.push(violation.clone());
                true
            });
        }

        if let Some(shape) = BodyShape::ALL
            .into_iter()
            .filter(|shape| shape.kind() != kind)
            .find(|shape| self.shape_matches(*shape, body))
        {
            violations.push(Violation {
                path: "/kind".to_string(),
                rule: Rule::DiscriminantMismatch {
                    discriminant: "kind".to_string(),
                    declared: kind.as_str().to_string(),
                    matches: shape.def_name().to_string(),
                },
                message: format!(
                    "kind is '{}' but the body is a {}",
                    kind,
                    shape.def_name()
                ),
            });
            return;
        }

        if kind != EnvelopeKind::Final || violations.iter().any(|v| v.rule == Rule::FailureWithoutError) {
            return;
        }
        let Some(declared) = outcome else {
            return;
        };
        for shape in [BodyShape::FinalSuccess, BodyShape::FinalFailure] {
            let Some(candidate) = shape.outcome() else {
                continue;
            };
            if candidate == declared {
                continue;
            }
            let mut relabeled = body.clone();
            relabeled["outcome"] = Value::String(candidate.to_string());
            if self.shape_matches(shape, &relabeled) {
                violations.push(Violation {
                    path: "/body/outcome".to_string(),
                    rule: Rule::DiscriminantMismatch {
                        discriminant: "outcome".to_string(),
                        declared: declared.to_string(),
                        matches: shape.def_name().to_string(),
                    },
                    message: format!(
                        "outcome is '{}' but the body is a {}",
                        declared,
                        shape.def_name()
                    ),
                });
            }
        }
    }
}

fn compile(schema: &Value) -> Result<Validator, ContractError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .should_validate_formats(true)
        .build(schema)
        .map_err(|e| ContractError::Schema(e.to_string()))
}

/// Map one schema error onto the violation taxonomy
fn classify(error: &jsonschema::ValidationError<'_>) -> Vec<Violation> {
    let path = error.instance_path.to_string();
    let message = error.to_string();

    let rule = match &error.kind {
        ValidationErrorKind::Required { property } => {
            let field = property
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| property.to_string());
            return vec![Violation {
                path: child_pointer(&path, &field),
                rule: Rule::MissingField { field },
                message,
            }];
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            return unexpected
                .iter()
                .map(|field| Violation {
                    path: child_pointer(&path, field),
                    rule: Rule::UnknownField {
                        field: field.clone(),
                    },
                    message: format!("unknown field '{}'", field),
                })
                .collect();
        }
        ValidationErrorKind::Type { .. } => Rule::TypeMismatch,
        ValidationErrorKind::Minimum { .. }
        | ValidationErrorKind::Maximum { .. }
        | ValidationErrorKind::ExclusiveMinimum { .. }
        | ValidationErrorKind::ExclusiveMaximum { .. } => Rule::OutOfRange,
        ValidationErrorKind::Constant { .. } if path == "/version" => Rule::UnsupportedVersion,
        ValidationErrorKind::Constant { .. } | ValidationErrorKind::Enum { .. } => {
            Rule::InvalidValue
        }
        ValidationErrorKind::Format { .. } => Rule::InvalidFormat,
        ValidationErrorKind::MinLength { .. } => Rule::EmptyValue,
        _ => Rule::Other,
    };

    vec![Violation {
        path,
        rule,
        message,
    }]
}

/// Append one reference token to a JSON Pointer (RFC 6901 escaping)
fn child_pointer(parent: &str, key: &str) -> String {
    format!("{}/{}", parent, key.replace('~', "~0").replace('/', "~1"))
}
