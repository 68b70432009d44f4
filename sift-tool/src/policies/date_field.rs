//! normalize-date-field: rewrite one named field as Unix seconds

use super::{Change, Decision, Policy, PolicyInfo};
use serde_json::Value;
use sift_common::timestamp::{is_already_normalized, normalize};
use sift_common::Record;

pub struct NormalizeDateField {
    field: String,
}

impl NormalizeDateField {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl Policy for NormalizeDateField {
    fn describe(&self) -> PolicyInfo {
        PolicyInfo {
            name: "normalize-date-field",
            description: format!("normalize '{}' to Unix seconds", self.field),
            read_only: false,
            filter: None,
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        let original = match record.get(&self.field) {
            Some(value) if !record.is_empty_field(&self.field) => value,
            _ => return Decision::Missing(self.field.clone()),
        };

        let Some(seconds) = normalize(original) else {
            return Decision::Invalid(format!(
                "{} value {} is not a recognizable date",
                self.field, original
            ));
        };
        if is_already_normalized(original, seconds) {
            return Decision::NoChange;
        }

        let mut updated = record.clone();
        updated.set(self.field.clone(), Value::from(seconds));
        Decision::Change(Change::Update {
            record: updated,
            detail: format!("{} {} -> {}", self.field, original, seconds),
        })
    }
}
