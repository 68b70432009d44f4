//! replace-resource-objectid
//!
//! Regenerates `objectID` from `schemaPath;resourceType;title;extUrl`, where
//! `schemaPath` comes from the configured resource type mapping.

use super::{resource_type_filter, Change, Decision, Policy, PolicyInfo};
use sift_common::config::ResourceTypeConfig;
use sift_common::validation::{EXT_URL, RESOURCE_TYPE, TITLE};
use sift_common::{IdDeriver, Record};

pub struct ReplaceResourceObjectId {
    ids: IdDeriver,
    resource_types: ResourceTypeConfig,
    only: Option<String>,
}

impl ReplaceResourceObjectId {
    /// `only` restricts the scan to one resource type
    pub fn new(ids: IdDeriver, resource_types: ResourceTypeConfig, only: Option<String>) -> Self {
        Self {
            ids,
            resource_types,
            only,
        }
    }

    /// The identifier this record should carry, if it is eligible
    pub fn expected_id(&self, record: &Record) -> Option<String> {
        let title = record.non_blank_str(TITLE)?;
        let resource_type = record.non_blank_str(RESOURCE_TYPE)?;
        let schema_path = self.resource_types.schema_path(resource_type)?;
        let ext_url = record.str_field(EXT_URL).unwrap_or("");
        Some(
            self.ids
                .derive_parts(&[schema_path, resource_type, title, ext_url]),
        )
    }
}

impl Policy for ReplaceResourceObjectId {
    fn describe(&self) -> PolicyInfo {
        let scope = match &self.only {
            Some(rt) => format!("resourceType '{}'", rt),
            None => format!("{} configured resource types", self.resource_types.len()),
        };
        PolicyInfo {
            name: "replace-resource-objectid",
            description: format!("regenerate objectIDs from schemaPath/resourceType/title for {}", scope),
            read_only: false,
            filter: self.only.as_deref().map(resource_type_filter),
        }
    }

    fn classify(&mut self, record: &Record) -> Decision {
        let Some(current) = record.object_id() else {
            return Decision::Invalid("record has no objectID".to_string());
        };
        if record.non_blank_str(TITLE).is_none() {
            return Decision::Missing(TITLE.to_string());
        }
        let Some(resource_type) = record.non_blank_str(RESOURCE_TYPE) else {
            return Decision::Missing(RESOURCE_TYPE.to_string());
        };
        if self.resource_types.schema_path(resource_type).is_none() {
            return Decision::Missing(format!("schemaPath for resourceType '{}'", resource_type));
        }

        match self.expected_id(record) {
            Some(expected) if expected != current => {
                let mut renamed = record.clone();
                renamed.set_object_id(expected);
                Decision::Change(Change::Rename {
                    from: current.to_string(),
                    record: renamed,
                })
            }
            _ => Decision::NoChange,
        }
    }
}
