//! find-duplicate-slug
//!
//! Groups records by slug during the scan. After the scan, each group of two
//! or more records that holds exactly one title-derived record and a
//! slug-derived record is collapsed: the title-derived record's content is
//! written under the slug-derived id and the title-derived id is deleted.
//!
//! Only the title-derived record of a group is held in memory, and only
//! while it is the sole one: a second title-derived record makes the group
//! ambiguous and the held copy is released.

use super::{Change, Decision, Policy, PolicyInfo};
use sift_common::validation::{SLUG, TITLE};
use sift_common::{IdDeriver, Record};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Default)]
struct SlugGroup {
    members: usize,
    title_derived: usize,
    /// The title-derived record while it is the only one
    candidate: Option<Record>,
    slug_derived: Option<String>,
}

pub struct FindDuplicateSlug {
    ids: IdDeriver,
    groups: BTreeMap<String, SlugGroup>,
}

impl FindDuplicateSlug {
    pub fn new(ids: IdDeriver) -> Self {
        Self {
            ids,
            groups: BTreeMap::new(),
        }
    }

    /// Number of slugs shared by two or more records seen so far
    pub fn duplicate_groups(&self) -> usize {
        self.groups.values().filter(|g| g.members >= 2).count()
    }

    /// Records currently held for a possible merge
    pub fn held_records(&self) -> usize {
        self.groups.values().filter(|g| g.candidate.is_some()).count()
    }
}

impl Policy for FindDuplicateSlug {
    fn describe(&self) -> PolicyInfo {
        PolicyInfo {
            name: "find-duplicate-slug",
            description: "merge title-derived duplicates onto their slug-derived record".to_string(),
            read_only: false,
            filter: None,
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        let (Some(object_id), Some(slug)) = (record.object_id(), record.non_blank_str(SLUG)) else {
            return Decision::Missing(SLUG.to_string());
        };

        let slug_id = self.ids.derive(slug);
        let title_id = record.non_blank_str(TITLE).map(|t| self.ids.derive(t));
        let group = self.groups.entry(slug.to_string()).or_default();
        group.members += 1;

        if object_id == slug_id {
            group.slug_derived = Some(object_id.to_string());
        } else if title_id.as_deref() == Some(object_id) {
            group.title_derived += 1;
            group.candidate = (group.title_derived == 1).then(|| record.clone());
        }
        Decision::NoChange
    }

    fn finish(&mut self) -> Vec<Decision> {
        let mut decisions = Vec::new();
        for (slug, group) in std::mem::take(&mut self.groups) {
            if group.members < 2 {
                continue;
            }
            match (group.candidate, group.slug_derived) {
                (Some(source), Some(slug_id)) => {
                    let Some(from) = source.object_id().map(str::to_string) else {
                        continue;
                    };
                    let mut merged = source;
                    merged.set_object_id(slug_id);
                    decisions.push(Decision::Change(Change::Rename { from, record: merged }));
                }
                (_, slug_id) => {
                    warn!(
                        slug = %slug,
                        members = group.members,
                        title_derived = group.title_derived,
                        slug_derived = slug_id.is_some(),
                        "Duplicate slug has no single title/slug pair to merge"
                    );
                }
            }
        }
        decisions
    }
}
