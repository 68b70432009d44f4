//! Index store abstraction
//!
//! The tool needs only four kinds of operation from the hosted index:
//! cursor-paginated browse, bulk upsert, bulk delete, and read/write of
//! settings, rules and synonyms. [`IndexStore`] names exactly those so the
//! pipeline can run against the real service or an in-memory store.

pub mod algolia;
pub mod memory;

pub use algolia::AlgoliaStore;
pub use memory::{MemoryStore, StoreCall};

use serde_json::Value;
use sift_common::{Record, Result};

/// Parameters for a full-index browse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseParams {
    /// Server-side filter expression
    pub filter: Option<String>,
    /// Records per page
    pub page_size: usize,
}

/// One page returned by the store
#[derive(Debug, Clone, Default)]
pub struct BrowsePage {
    /// Raw items; not yet validated
    pub items: Vec<Value>,
    /// Opaque continuation token, `None` at end of index
    pub cursor: Option<String>,
}

/// Operations consumed from the backing index
#[async_trait::async_trait]
pub trait IndexStore: Send + Sync {
    /// Fetch the next page. `cursor` is `None` on the first call.
    async fn browse(&self, params: &BrowseParams, cursor: Option<&str>) -> Result<BrowsePage>;

    /// Create or replace records by `objectID`
    async fn save_objects(&self, records: &[Record]) -> Result<()>;

    /// Delete records by `objectID`
    async fn delete_objects(&self, object_ids: &[String]) -> Result<()>;

    async fn get_settings(&self) -> Result<Value>;

    async fn set_settings(&self, settings: &Value) -> Result<()>;

    async fn list_rules(&self) -> Result<Vec<Value>>;

    async fn save_rules(&self, rules: &[Value], clear_existing: bool) -> Result<()>;

    async fn list_synonyms(&self) -> Result<Vec<Value>>;

    async fn save_synonyms(&self, synonyms: &[Value], replace_existing: bool) -> Result<()>;
}
