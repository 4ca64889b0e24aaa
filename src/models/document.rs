// file: src/models/document.rs
// description: schemaless document model forwarded to Elasticsearch
// reference: internal data structures

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document is an arbitrary JSON object. No schema is imposed; the only
/// invariant is that the configured text field must be present (and a string)
/// when embedding is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Converts a JSON value into a document, rejecting non-objects.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(IngestError::Validation(format!(
                "document must be a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Parses a JSON array into documents, rejecting non-array input.
    pub fn array_from_value(value: Value) -> Result<Vec<Self>> {
        match value {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            other => Err(IngestError::Validation(format!(
                "expected a JSON array of documents, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Returns the text of `field` if present and a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn set_embedding(&mut self, field: &str, embedding: Vec<f32>) {
        let values = embedding
            .into_iter()
            .map(|v| Value::from(f64::from(v)))
            .collect();
        self.fields.insert(field.to_string(), Value::Array(values));
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
