//! OpenAPI description of the endpoints that exchange envelopes
//!
//! The document never restates the envelope shape. Its
//! `components.schemas.AgentEnvelope` is a `$ref` to the schema file, and
//! every response that carries an envelope points at that component.

use serde_json::Value;
use std::collections::HashSet;

use crate::error::ContractError;
use crate::schema::SCHEMA_FILE_NAME;

/// The OpenAPI document, byte for byte
pub const OPENAPI_SOURCE: &str = include_str!("../schema/acp.openapi.json");

/// Local reference to the envelope component
pub const ENVELOPE_COMPONENT: &str = "#/components/schemas/AgentEnvelope";

/// Operations every conforming description must declare
pub const REQUIRED_OPERATIONS: [(&str, &str); 3] = [
    ("get", "/stream"),
    ("post", "/invoke"),
    ("post", "/action"),
];

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// One HTTP operation declared by the description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub method: String,
    pub path: String,
    pub operation_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiDescription {
    document: Value,
}

impl ApiDescription {
    /// Load the embedded description
    pub fn load() -> Result<Self, ContractError> {
        Self::from_source(OPENAPI_SOURCE)
    }

    pub fn from_source(source: &str) -> Result<Self, ContractError> {
        let document: Value = serde_json::from_str(source)?;
        Self::from_document(document)
    }

    pub fn from_document(document: Value) -> Result<Self, ContractError> {
        match document.get("openapi").and_then(Value::as_str) {
            Some(version) if version.starts_with("3.1") => Ok(Self { document }),
            Some(version) => Err(ContractError::Api(format!(
                "unsupported OpenAPI version {}",
                version
            ))),
            None => Err(ContractError::Api("missing openapi version".to_string())),
        }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn openapi_version(&self) -> &str {
        self.document
            .get("openapi")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Declared paths
    pub fn paths(&self) -> Vec<&str> {
        self.document
            .get("paths")
            .and_then(Value::as_object)
            .map(|paths| paths.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn operations(&self) -> Vec<Operation> {
        let Some(paths) = self.document.get("paths").and_then(Value::as_object) else {
            return Vec::new();
        };

        let mut operations = Vec::new();
        for (path, item) in paths {
            for method in HTTP_METHODS {
                if let Some(operation) = item.get(method) {
                    operations.push(Operation {
                        method: method.to_string(),
                        path: path.clone(),
                        operation_id: operation
                            .get("operationId")
                            .and_then(Value::as_str)
                            .map(str::to_owned),
                    });
                }
            }
        }
        operations
    }

    pub fn operation(&self, method: &str, path: &str) -> Option<&Value> {
        self.document
            .get("paths")?
            .get(path)?
            .get(method.to_ascii_lowercase())
    }

    /// The `$ref` the envelope component resolves to
    pub fn envelope_schema_ref(&self) -> Option<&str> {
        self.component("AgentEnvelope")?
            .get("$ref")
            .and_then(Value::as_str)
    }

    pub fn component(&self, name: &str) -> Option<&Value> {
        self.document.get("components")?.get("schemas")?.get(name)
    }

    /// Schema of a response body for one media type
    pub fn response_schema(
        &self,
        method: &str,
        path: &str,
        status: &str,
        media_type: &str,
    ) -> Option<&Value> {
        self.operation(method, path)?
            .get("responses")?
            .get(status)?
            .get("content")?
            .get(media_type)?
            .get("schema")
    }

    /// Whether `schema` reaches the envelope component through `$ref`s
    pub fn references_envelope(&self, schema: &Value) -> bool {
        let mut visited = HashSet::new();
        self.reaches_envelope(schema, &mut visited)
    }

    fn reaches_envelope<'a>(&'a self, schema: &'a Value, visited: &mut HashSet<&'a str>) -> bool {
        match schema {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    if reference == ENVELOPE_COMPONENT {
                        return true;
                    }
                    if let Some(name) = reference.strip_prefix(COMPONENT_PREFIX) {
                        if visited.insert(reference) {
                            if let Some(target) = self.component(name) {
                                if self.reaches_envelope(target, visited) {
                                    return true;
                                }
                            }
                        }
                    }
                }
                map.values()
                    .any(|value| self.reaches_envelope(value, visited))
            }
            Value::Array(items) => items
                .iter()
                .any(|value| self.reaches_envelope(value, visited)),
            _ => false,
        }
    }

    /// Every problem found against the contract rules, empty when conforming
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let expected_ref = format!("./{}", SCHEMA_FILE_NAME);
        match self.envelope_schema_ref() {
            Some(reference) if reference == expected_ref => {}
            Some(reference) => problems.push(format!(
                "AgentEnvelope references {} instead of {}",
                reference, expected_ref
            )),
            None => problems.push("AgentEnvelope component is not a $ref".to_string()),
        }

        for (method, path) in REQUIRED_OPERATIONS {
            let Some(operation) = self.operation(method, path) else {
                problems.push(format!("missing operation {} {}", method.to_uppercase(), path));
                continue;
            };

            let contents: Vec<&Value> = operation
                .get("responses")
                .and_then(Value::as_object)
                .into_iter()
                .flat_map(|responses| responses.values())
                .filter_map(|response| response.get("content").and_then(Value::as_object))
                .flat_map(|content| content.values())
                .filter_map(|media| media.get("schema"))
                .collect();

            if contents.is_empty() {
                problems.push(format!(
                    "{} {} declares no response schema",
                    method.to_uppercase(),
                    path
                ));
            }
            for schema in contents {
                if !self.references_envelope(schema) {
                    problems.push(format!(
                        "{} {} response does not reference {}",
                        method.to_uppercase(),
                        path,
                        ENVELOPE_COMPONENT
                    ));
                }
            }
        }

        let mut inlined = Vec::new();
        find_inline_envelopes(&self.document, String::new(), &mut inlined);
        for pointer in inlined {
            problems.push(format!("inline envelope schema at {}", pointer));
        }

        problems
    }

    /// Check the description against the contract rules
    pub fn verify(&self) -> Result<(), ContractError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ContractError::Api(problems.join("; ")))
        }
    }
}

/// An object schema declaring `kind` and `body` restates the envelope
fn find_inline_envelopes(value: &Value, pointer: String, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(properties) = map.get("properties").and_then(Value::as_object) {
                if properties.contains_key("kind") && properties.contains_key("body") {
                    found.push(if pointer.is_empty() { "/".to_string() } else { pointer.clone() });
                }
            }
            for (key, child) in map {
                let escaped = key.replace('~', "~0").replace('/', "~1");
                find_inline_envelopes(child, format!("{}/{}", pointer, escaped), found);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                find_inline_envelopes(child, format!("{}/{}", pointer, index), found);
            }
        }
        _ => {}
    }
}
