//! Record validation predicates
//!
//! Structural checks used by the scan loop and by every policy's
//! eligibility filter. All predicates are pure.

use crate::identifier::IdDeriver;
use crate::record::{Record, OBJECT_ID};
use serde_json::Value;

pub const TITLE: &str = "title";
pub const SLUG: &str = "slug";
pub const RESOURCE_TYPE: &str = "resourceType";
pub const EXT_URL: &str = "extUrl";

/// A raw item is a record when it is an object with a string `objectID`
pub fn is_record(item: &Value) -> bool {
    matches!(item.get(OBJECT_ID), Some(Value::String(_)))
}

/// Convert a raw scanned item into a [`Record`], describing why not on failure
pub fn validate_item(item: Value) -> Result<Record, String> {
    if !is_record(&item) {
        return Err(describe_invalid(&item));
    }
    Record::from_value(item).ok_or_else(|| "item is not an object".to_string())
}

fn describe_invalid(item: &Value) -> String {
    match item {
        Value::Object(map) => match map.get(OBJECT_ID) {
            None => "record has no objectID".to_string(),
            Some(other) => format!("record objectID is not a string: {}", other),
        },
        other => format!("item is not an object: {}", truncate(&other.to_string(), 80)),
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

pub fn has_title(record: &Record) -> bool {
    record.non_blank_str(TITLE).is_some()
}

pub fn has_resource_type(record: &Record) -> bool {
    record.non_blank_str(RESOURCE_TYPE).is_some()
}

pub fn has_slug(record: &Record) -> bool {
    record.non_blank_str(SLUG).is_some()
}

/// The record's `objectID` was derived from its title
pub fn object_id_matches_title(record: &Record, ids: &IdDeriver) -> bool {
    match (record.object_id(), record.non_blank_str(TITLE)) {
        (Some(id), Some(title)) => ids.matches(id, title),
        _ => false,
    }
}

/// The record's `objectID` was derived from its slug
pub fn object_id_matches_slug(record: &Record, ids: &IdDeriver) -> bool {
    match (record.object_id(), record.non_blank_str(SLUG)) {
        (Some(id), Some(slug)) => ids.matches(id, slug),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_is_record() {
        assert!(is_record(&json!({"objectID": "a"})));
        assert!(is_record(&json!({"objectID": ""})));
        assert!(!is_record(&json!({"objectID": 7})));
        assert!(!is_record(&json!({"title": "x"})));
        assert!(!is_record(&json!("objectID")));
        assert!(!is_record(&Value::Null));
    }

    #[test]
    fn test_validate_item_reasons() {
        assert!(validate_item(json!({"objectID": "a"})).is_ok());
        let err = validate_item(json!({"title": "x"})).unwrap_err();
        assert!(err.contains("no objectID"));
        let err = validate_item(json!({"objectID": 1})).unwrap_err();
        assert!(err.contains("not a string"));
        let err = validate_item(json!([1, 2])).unwrap_err();
        assert!(err.contains("not an object"));
    }

    #[test]
    fn test_optional_attribute_predicates() {
        let full = rec(json!({
            "objectID": "a",
            "title": "T",
            "slug": "s",
            "resourceType": "article"
        }));
        assert!(has_title(&full));
        assert!(has_slug(&full));
        assert!(has_resource_type(&full));

        let blank = rec(json!({"objectID": "a", "title": " ", "slug": 3}));
        assert!(!has_title(&blank));
        assert!(!has_slug(&blank));
        assert!(!has_resource_type(&blank));
    }

    #[test]
    fn test_identity_matching() {
        let ids = IdDeriver::default();
        let by_title = rec(json!({
            "objectID": ids.derive("Hello World"),
            "title": "Hello World",
            "slug": "hello-world"
        }));
        assert!(object_id_matches_title(&by_title, &ids));
        assert!(!object_id_matches_slug(&by_title, &ids));

        let by_slug = rec(json!({
            "objectID": ids.derive("hello-world"),
            "title": "Hello World",
            "slug": "hello-world"
        }));
        assert!(!object_id_matches_title(&by_slug, &ids));
        assert!(object_id_matches_slug(&by_slug, &ids));

        let untitled = rec(json!({"objectID": ids.derive("")}));
        assert!(!object_id_matches_title(&untitled, &ids));
    }
}
