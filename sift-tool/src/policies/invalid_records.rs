//! find-invalid-records
//!
//! Deletes title-derived records whose listed keys are all empty. Records
//! whose id was derived any other way are never touched.

use super::{Change, Decision, Policy, PolicyInfo};
use sift_common::validation::object_id_matches_title;
use sift_common::{Error, IdDeriver, Record, Result};

pub struct FindInvalidRecords {
    ids: IdDeriver,
    keys: Vec<String>,
}

impl FindInvalidRecords {
    pub fn new(ids: IdDeriver, keys: Vec<String>) -> Result<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(Error::Validation("--keys needs at least one field name".to_string()));
        }
        Ok(Self { ids, keys })
    }
}

impl Policy for FindInvalidRecords {
    fn describe(&self) -> PolicyInfo {
        PolicyInfo {
            name: "find-invalid-records",
            description: format!(
                "delete title-derived records with no value in any of [{}]",
                self.keys.join(", ")
            ),
            read_only: false,
            filter: None,
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        let all_empty = self.keys.iter().all(|key| record.is_empty_field(key));
        if all_empty && object_id_matches_title(record, &self.ids) {
            Decision::Change(Change::Delete {
                object_id: record.object_id().unwrap_or_default().to_string(),
                detail: format!("empty [{}]", self.keys.join(", ")),
            })
        } else {
            Decision::NoChange
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> FindInvalidRecords {
        FindInvalidRecords::new(
            IdDeriver::default(),
            vec!["body".to_string(), "summary".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_title_derived_record_is_deleted() {
        let ids = IdDeriver::default();
        let record = Record::from_value(json!({
            "objectID": ids.derive("Stub"),
            "title": "Stub",
            "body": "",
            "summary": null
        }))
        .unwrap();
        assert!(matches!(
            policy().classify(&record),
            Decision::Change(Change::Delete { .. })
        ));
    }

    #[test]
    fn test_slug_derived_record_is_kept() {
        let ids = IdDeriver::default();
        let record = Record::from_value(json!({
            "objectID": ids.derive("stub"),
            "title": "Stub",
            "slug": "stub"
        }))
        .unwrap();
        assert_eq!(policy().classify(&record), Decision::NoChange);
    }

    #[test]
    fn test_any_present_key_keeps_record() {
        let ids = IdDeriver::default();
        let record = Record::from_value(json!({
            "objectID": ids.derive("Stub"),
            "title": "Stub",
            "summary": "has text"
        }))
        .unwrap();
        assert_eq!(policy().classify(&record), Decision::NoChange);
    }

    #[test]
    fn test_keys_are_required() {
        assert!(FindInvalidRecords::new(IdDeriver::default(), vec![" ".to_string()]).is_err());
    }
}
