//! find-matching-objectid: report records whose id was derived from their title

use super::{Change, Decision, Policy, PolicyInfo};
use sift_common::validation::{object_id_matches_title, TITLE};
use sift_common::{IdDeriver, Record};

pub struct FindMatchingObjectId {
    ids: IdDeriver,
}

impl FindMatchingObjectId {
    pub fn new(ids: IdDeriver) -> Self {
        Self { ids }
    }
}

impl Policy for FindMatchingObjectId {
    fn describe(&self) -> PolicyInfo {
        PolicyInfo {
            name: "find-matching-objectid",
            description: "find records whose objectID is derived from their title".to_string(),
            read_only: true,
            filter: None,
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        let Some(title) = record.non_blank_str(TITLE) else {
            return Decision::Missing(TITLE.to_string());
        };
        if object_id_matches_title(record, &self.ids) {
            Decision::Change(Change::Report(format!(
                "{} matches title '{}'",
                record.object_id().unwrap_or_default(),
                title
            )))
        } else {
            Decision::NoChange
        }
    }
}
