//! Record model
//!
//! A record is a JSON object fetched from the index with one mandatory
//! field, `objectID`. Nothing else about its shape is known statically, so
//! every access is a probe that pattern-matches on [`serde_json::Value`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the mandatory identifier field
pub const OBJECT_ID: &str = "objectID";

/// A single index record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a raw value, if the value is a JSON object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Convert back to a raw JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// The record's `objectID`, when present as a string
    pub fn object_id(&self) -> Option<&str> {
        self.str_field(OBJECT_ID)
    }

    /// Replace the record's `objectID`
    pub fn set_object_id(&mut self, id: impl Into<String>) {
        self.fields
            .insert(OBJECT_ID.to_string(), Value::String(id.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String value of a field, `None` for absent or non-string values
    pub fn str_field(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// String value of a field that is present and not blank
    pub fn non_blank_str(&self, name: &str) -> Option<&str> {
        self.str_field(name).filter(|s| !s.trim().is_empty())
    }

    /// True when the field is absent, `null`, or the empty string
    pub fn is_empty_field(&self, name: &str) -> bool {
        match self.fields.get(name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
