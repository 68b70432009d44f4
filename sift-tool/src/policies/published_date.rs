//! fix-published-date
//!
//! Rewrites string `publishedDate` values as epoch **milliseconds** for one
//! resource type. Every other date policy writes seconds; this one keeps
//! milliseconds for compatibility with existing consumers of the field.

use super::{resource_type_filter, Change, Decision, Policy, PolicyInfo};
use serde_json::Value;
use sift_common::timestamp::parse_date_millis;
use sift_common::Record;

pub const PUBLISHED_DATE: &str = "publishedDate";

pub struct FixPublishedDate {
    resource_type: String,
}

impl FixPublishedDate {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
        }
    }
}

impl Policy for FixPublishedDate {
    fn describe(&self) -> PolicyInfo {
        PolicyInfo {
            name: "fix-published-date",
            description: format!(
                "convert string publishedDate to epoch milliseconds for resourceType '{}'",
                self.resource_type
            ),
            read_only: false,
            filter: Some(resource_type_filter(&self.resource_type)),
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        if record.is_empty_field(PUBLISHED_DATE) {
            return Decision::Missing(PUBLISHED_DATE.to_string());
        }
        // Numbers were either written by an earlier run or are out of scope
        let Some(raw) = record.str_field(PUBLISHED_DATE) else {
            return Decision::NoChange;
        };
        match parse_date_millis(raw) {
            Some(millis) => {
                let mut updated = record.clone();
                updated.set(PUBLISHED_DATE, Value::from(millis));
                Decision::Change(Change::Update {
                    record: updated,
                    detail: format!("{} '{}' -> {}", PUBLISHED_DATE, raw, millis),
                })
            }
            None => Decision::Invalid(format!("{} '{}' is not a recognizable date", PUBLISHED_DATE, raw)),
        }
    }
}
