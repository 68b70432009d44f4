//! In-memory index store
//!
//! Keeps records ordered by `objectID` and records every call made against
//! it, so tests can assert on write ordering and dry-run purity.

use super::{BrowsePage, BrowseParams, IndexStore};
use serde_json::Value;
use sift_common::record::OBJECT_ID;
use sift_common::{Error, Record, Result};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A call observed by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Browse { cursor: Option<String> },
    Save(Vec<String>),
    Delete(Vec<String>),
    GetSettings,
    SetSettings,
    ListRules,
    SaveRules { count: usize, clear_existing: bool },
    ListSynonyms,
    SaveSynonyms { count: usize, replace_existing: bool },
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, Value>,
    malformed: Vec<Value>,
    settings: Value,
    rules: Vec<Value>,
    synonyms: Vec<Value>,
    calls: Vec<StoreCall>,
    fail_browse_after: Option<usize>,
    browse_count: usize,
}

/// In-memory [`IndexStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from raw items. Items without a string `objectID` are
    /// kept aside and returned with the first browse page.
    pub fn with_items(items: impl IntoIterator<Item = Value>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for item in items {
                let id = item.get(OBJECT_ID).and_then(Value::as_str).map(str::to_string);
                match id {
                    Some(id) => {
                        inner.objects.insert(id, item);
                    }
                    None => inner.malformed.push(item),
                }
            }
        }
        store
    }

    /// Make every browse after the first `pages` successful ones fail
    pub fn fail_browse_after(self, pages: usize) -> Self {
        self.lock().fail_browse_after = Some(pages);
        self
    }

    pub fn set_initial_settings(&self, settings: Value) {
        self.lock().settings = settings;
    }

    pub fn set_initial_rules(&self, rules: Vec<Value>) {
        self.lock().rules = rules;
    }

    pub fn set_initial_synonyms(&self, synonyms: Vec<Value>) {
        self.lock().synonyms = synonyms;
    }

    /// Snapshot of a stored record
    pub fn get(&self, object_id: &str) -> Option<Value> {
        self.lock().objects.get(object_id).cloned()
    }

    pub fn object_ids(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Calls that modified records, settings, rules or synonyms
    pub fn write_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    StoreCall::Save(_)
                        | StoreCall::Delete(_)
                        | StoreCall::SetSettings
                        | StoreCall::SaveRules { .. }
                        | StoreCall::SaveSynonyms { .. }
                )
            })
            .collect()
    }

    pub fn rules(&self) -> Vec<Value> {
        self.lock().rules.clone()
    }

    pub fn synonyms(&self) -> Vec<Value> {
        self.lock().synonyms.clone()
    }

    pub fn settings(&self) -> Value {
        self.lock().settings.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl IndexStore for MemoryStore {
    async fn browse(&self, params: &BrowseParams, cursor: Option<&str>) -> Result<BrowsePage> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Browse {
            cursor: cursor.map(str::to_string),
        });

        if let Some(limit) = inner.fail_browse_after {
            if inner.browse_count >= limit {
                return Err(Error::Network("simulated browse failure".to_string()));
            }
        }
        inner.browse_count += 1;

        let clauses = parse_filter(params.filter.as_deref())?;
        let page_size = params.page_size.max(1);

        let mut items: Vec<Value> = Vec::new();
        if cursor.is_none() {
            items.extend(inner.malformed.iter().cloned());
        }

        let after = cursor.map(decode_cursor).transpose()?;
        let mut last_id = None;
        let mut has_more = false;
        let candidates = inner
            .objects
            .iter()
            .filter(|(id, _)| after.as_deref().map_or(true, |a| id.as_str() > a))
            .filter(|(_, item)| clauses.iter().all(|c| c.matches(item)));
        for (id, item) in candidates {
            if items.len() >= page_size {
                has_more = true;
                break;
            }
            items.push(item.clone());
            last_id = Some(id.clone());
        }

        let cursor = match (has_more, last_id) {
            (true, Some(id)) => Some(encode_cursor(&id)),
            _ => None,
        };
        Ok(BrowsePage { items, cursor })
    }

    async fn save_objects(&self, records: &[Record]) -> Result<()> {
        let mut inner = self.lock();
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = record
                .object_id()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| Error::Validation("record without objectID".to_string()))?
                .to_string();
            inner.objects.insert(id.clone(), record.clone().into_value());
            ids.push(id);
        }
        inner.calls.push(StoreCall::Save(ids));
        Ok(())
    }

    async fn delete_objects(&self, object_ids: &[String]) -> Result<()> {
        let mut inner = self.lock();
        for id in object_ids {
            inner.objects.remove(id);
        }
        inner.calls.push(StoreCall::Delete(object_ids.to_vec()));
        Ok(())
    }

    async fn get_settings(&self) -> Result<Value> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::GetSettings);
        Ok(inner.settings.clone())
    }

    async fn set_settings(&self, settings: &Value) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::SetSettings);
        inner.settings = settings.clone();
        Ok(())
    }

    async fn list_rules(&self) -> Result<Vec<Value>> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::ListRules);
        Ok(inner.rules.clone())
    }

    async fn save_rules(&self, rules: &[Value], clear_existing: bool) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::SaveRules {
            count: rules.len(),
            clear_existing,
        });
        if clear_existing {
            inner.rules.clear();
        }
        inner.rules.extend(rules.iter().cloned());
        Ok(())
    }

    async fn list_synonyms(&self) -> Result<Vec<Value>> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::ListSynonyms);
        Ok(inner.synonyms.clone())
    }

    async fn save_synonyms(&self, synonyms: &[Value], replace_existing: bool) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::SaveSynonyms {
            count: synonyms.len(),
            replace_existing,
        });
        if replace_existing {
            inner.synonyms.clear();
        }
        inner.synonyms.extend(synonyms.iter().cloned());
        Ok(())
    }
}

fn encode_cursor(id: &str) -> String {
    format!("after:{}", id)
}

fn decode_cursor(cursor: &str) -> Result<String> {
    cursor
        .strip_prefix("after:")
        .map(str::to_string)
        .ok_or_else(|| Error::Processing(format!("invalid cursor: {}", cursor)))
}

/// `field:value` equality clause
struct Clause {
    field: String,
    value: String,
}

impl Clause {
    fn matches(&self, item: &Value) -> bool {
        match item.get(&self.field) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Number(n)) => n.to_string() == self.value,
            Some(Value::Bool(b)) => b.to_string() == self.value,
            _ => false,
        }
    }
}

/// Supports `a:"x" AND b:y`, which covers the filters the policies build
fn parse_filter(filter: Option<&str>) -> Result<Vec<Clause>> {
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(Vec::new());
    };
    filter
        .split(" AND ")
        .map(|part| {
            let part = part.trim().trim_start_matches('(').trim_end_matches(')');
            let (field, value) = part
                .split_once(':')
                .ok_or_else(|| Error::Validation(format!("unsupported filter clause: {}", part)))?;
            Ok(Clause {
                field: field.trim().to_string(),
                value: value.trim().trim_matches('"').to_string(),
            })
        })
        .collect()
}
