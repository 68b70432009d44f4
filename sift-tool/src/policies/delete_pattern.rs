//! delete-records-by-pattern: delete records whose string field matches a regex

use super::{Change, Decision, Policy, PolicyInfo};
use regex::Regex;
use serde_json::Value;
use sift_common::{Error, Record, Result};

pub struct DeleteRecordsByPattern {
    key: String,
    pattern: Regex,
}

impl DeleteRecordsByPattern {
    pub fn new(key: impl Into<String>, pattern: &str) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::Validation("--key must not be empty".to_string()));
        }
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::Validation(format!("Invalid pattern '{}': {}", pattern, e)))?;
        Ok(Self { key, pattern })
    }
}

impl Policy for DeleteRecordsByPattern {
    fn describe(&self) -> PolicyInfo {
        PolicyInfo {
            name: "delete-records-by-pattern",
            description: format!("delete records whose '{}' matches /{}/", self.key, self.pattern),
            read_only: false,
            filter: None,
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        match record.get(&self.key) {
            None | Some(Value::Null) => Decision::Missing(self.key.clone()),
            Some(Value::String(value)) if self.pattern.is_match(value) => {
                Decision::Change(Change::Delete {
                    object_id: record.object_id().unwrap_or_default().to_string(),
                    detail: format!("{} '{}'", self.key, value),
                })
            }
            Some(_) => Decision::NoChange,
        }
    }
}
