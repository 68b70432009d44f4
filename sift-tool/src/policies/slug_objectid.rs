//! replace-objectid-with-slug
//!
//! Moves title-derived records onto a slug-derived `objectID`.

use super::{Change, Decision, Policy, PolicyInfo};
use sift_common::validation::{object_id_matches_title, SLUG, TITLE};
use sift_common::{IdDeriver, Record};

pub struct ReplaceObjectIdWithSlug {
    ids: IdDeriver,
}

impl ReplaceObjectIdWithSlug {
    pub fn new(ids: IdDeriver) -> Self {
        Self { ids }
    }
}

impl Policy for ReplaceObjectIdWithSlug {
    fn describe(&self) -> PolicyInfo {
        PolicyInfo {
            name: "replace-objectid-with-slug",
            description: "replace title-derived objectIDs with slug-derived ones".to_string(),
            read_only: false,
            filter: None,
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        if record.non_blank_str(TITLE).is_none() {
            return Decision::Missing(TITLE.to_string());
        }
        let Some(slug) = record.non_blank_str(SLUG) else {
            return Decision::Missing(SLUG.to_string());
        };
        if !object_id_matches_title(record, &self.ids) {
            return Decision::NoChange;
        }

        let new_id = self.ids.derive(slug);
        match record.object_id() {
            Some(current) if current != new_id => {
                let mut renamed = record.clone();
                renamed.set_object_id(new_id);
                Decision::Change(Change::Rename {
                    from: current.to_string(),
                    record: renamed,
                })
            }
            _ => Decision::NoChange,
        }
    }
}
