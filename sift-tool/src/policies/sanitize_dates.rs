//! sanitize-date-values
//!
//! Sweeps every top-level scalar field and normalizes whatever converts,
//! using the extended format list. Values that do not convert are not dates
//! and are left untouched. `objectID` and `_`-prefixed search metadata are
//! never considered, nor are fractional numbers below the year 2000 such
//! as ratings.

use super::{Change, Decision, Policy, PolicyInfo};
use serde_json::Value;
use sift_common::record::OBJECT_ID;
use sift_common::timestamp::{
    is_already_normalized, normalize_with, FormatSet, SANITY_FLOOR_SECONDS,
};
use sift_common::Record;

#[derive(Default)]
pub struct SanitizeDateValues;

impl SanitizeDateValues {
    pub fn new() -> Self {
        Self
    }
}

fn is_candidate(name: &str, value: &Value) -> bool {
    if name == OBJECT_ID || name.starts_with('_') {
        return false;
    }
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(n) => {
            n.is_i64()
                || n.is_u64()
                || n.as_f64().is_some_and(|f| f >= SANITY_FLOOR_SECONDS as f64)
        }
        _ => false,
    }
}

impl Policy for SanitizeDateValues {
    fn describe(&self) -> PolicyInfo {
        PolicyInfo {
            name: "sanitize-date-values",
            description: "normalize every date-like field to Unix seconds".to_string(),
            read_only: false,
            filter: None,
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        let mut conversions = Vec::new();
        for (name, value) in record.fields() {
            if !is_candidate(name, value) {
                continue;
            }
            if let Some(seconds) = normalize_with(value, FormatSet::Extended) {
                if !is_already_normalized(value, seconds) {
                    conversions.push((name.clone(), value.to_string(), seconds));
                }
            }
        }

        if conversions.is_empty() {
            return Decision::NoChange;
        }

        let mut updated = record.clone();
        let mut details = Vec::with_capacity(conversions.len());
        for (name, original, seconds) in conversions {
            details.push(format!("{} {} -> {}", name, original, seconds));
            updated.set(name, Value::from(seconds));
        }
        Decision::Change(Change::Update {
            record: updated,
            detail: details.join(", "),
        })
    }
}
