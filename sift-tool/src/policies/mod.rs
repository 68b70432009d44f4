//! Transform policies
//!
//! Each policy is a per-record decision function plugged into the generic
//! pipeline in [`crate::pipeline`]. Policies never touch the store; they
//! only say what should happen to a record.

pub mod delete_pattern;
pub mod date_field;
pub mod duplicate_slug;
pub mod invalid_records;
pub mod matching_objectid;
pub mod published_date;
pub mod resource_objectid;
pub mod sanitize_dates;
pub mod slug_objectid;

pub use date_field::NormalizeDateField;
pub use delete_pattern::DeleteRecordsByPattern;
pub use duplicate_slug::FindDuplicateSlug;
pub use invalid_records::FindInvalidRecords;
pub use matching_objectid::FindMatchingObjectId;
pub use published_date::FixPublishedDate;
pub use resource_objectid::ReplaceResourceObjectId;
pub use sanitize_dates::SanitizeDateValues;
pub use slug_objectid::ReplaceObjectIdWithSlug;

use sift_common::Record;

/// Static description of a policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyInfo {
    /// Command name, e.g. `normalize-date-field`
    pub name: &'static str,
    /// One-line human description
    pub description: String,
    /// Read-only policies only report; they never write
    pub read_only: bool,
    /// Server-side filter the policy needs, combined with any user filter
    pub filter: Option<String>,
}

/// What should happen to one record
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Record is fine as it is
    NoChange,
    /// Record lacks the field the policy works on
    Missing(String),
    /// Structural problem or unconvertible value; counted as an error
    Invalid(String),
    Change(Change),
}

/// A write (or, for read-only policies, a finding)
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Replace the record in place under its current id
    Update { record: Record, detail: String },
    /// Upsert `record` under its new id, then delete `from`
    Rename { from: String, record: Record },
    Delete { object_id: String, detail: String },
    /// Read-only finding, never written
    Report(String),
}

impl Change {
    /// Short line for the summary's examples
    pub fn describe(&self) -> String {
        match self {
            Change::Update { record, detail } => {
                format!("update {}: {}", record.object_id().unwrap_or("?"), detail)
            }
            Change::Rename { from, record } => {
                format!("rename {} -> {}", from, record.object_id().unwrap_or("?"))
            }
            Change::Delete { object_id, detail } => format!("delete {}: {}", object_id, detail),
            Change::Report(text) => text.clone(),
        }
    }
}

/// Per-record decision function driven by the pipeline
pub trait Policy {
    fn describe(&self) -> PolicyInfo;

    /// Decide for one valid record
    fn classify(&mut self, record: &Record) -> Decision;

    /// Decisions that need the whole scan, emitted after the last page
    fn finish(&mut self) -> Vec<Decision> {
        Vec::new()
    }
}

/// Server-side filter selecting one resource type
pub fn resource_type_filter(resource_type: &str) -> String {
    format!(
        "{}:\"{}\"",
        sift_common::validation::RESOURCE_TYPE,
        resource_type.replace('"', "\\\"")
    )
}
