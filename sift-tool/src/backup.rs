//! Backup and restore of a whole index
//!
//! A backup is four JSON files in one directory:
//!
//! ```text
//! {prefix}_records[_{YYYYMMDD_HHMMSS}].json    array of records
//! {prefix}_settings[_{YYYYMMDD_HHMMSS}].json   settings object
//! {prefix}_rules[_{YYYYMMDD_HHMMSS}].json      array of rules
//! {prefix}_synonyms[_{YYYYMMDD_HHMMSS}].json   array of synonyms
//! ```
//!
//! Restore picks, per component, the lexicographically greatest matching
//! file name and fully replaces that component. Components without a file
//! are left untouched.

use crate::metrics::ProcessingMetrics;
use crate::mutator::BatchMutator;
use crate::scan::ScanCursor;
use crate::store::{BrowseParams, IndexStore};
use serde_json::Value;
use sift_common::record::OBJECT_ID;
use sift_common::{Error, Record, Result};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// chrono format of the optional file name timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One part of an index backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Records,
    Settings,
    Rules,
    Synonyms,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Records,
        Component::Settings,
        Component::Rules,
        Component::Synonyms,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            Component::Records => "records",
            Component::Settings => "settings",
            Component::Rules => "rules",
            Component::Synonyms => "synonyms",
        }
    }
}

/// `{prefix}_{component}[_{timestamp}].json`
pub fn backup_file_name(prefix: &str, component: Component, timestamp: Option<&str>) -> String {
    match timestamp {
        Some(ts) => format!("{}_{}_{}.json", prefix, component.suffix(), ts),
        None => format!("{}_{}.json", prefix, component.suffix()),
    }
}

/// True when `name` is a backup file for `prefix` and `component`
pub fn matches_backup_file(name: &str, prefix: &str, component: Component) -> bool {
    let head = format!("{}_{}", prefix, component.suffix());
    let Some(rest) = name.strip_prefix(head.as_str()) else {
        return false;
    };
    if rest == ".json" {
        return true;
    }
    match rest.strip_prefix('_').and_then(|r| r.strip_suffix(".json")) {
        Some(stamp) => is_timestamp(stamp),
        None => false,
    }
}

fn is_timestamp(stamp: &str) -> bool {
    let bytes = stamp.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}

/// Newest file for a component in `dir`, by file name
pub fn find_backup_file(dir: &Path, prefix: &str, component: Component) -> Result<Option<PathBuf>> {
    let mut best: Option<String> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if matches_backup_file(&name, prefix, component)
            && best.as_deref().map_or(true, |b| name.as_str() > b)
        {
            best = Some(name);
        }
    }
    Ok(best.map(|name| dir.join(name)))
}

/// Write JSON to `path` via a sibling temp file and a rename
pub async fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Validation(format!("Invalid backup path: {}", path.display())))?;
    let temp_path = path.with_file_name(format!("{}.tmp", file_name));

    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&temp_path, &bytes).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn read_json(path: &Path) -> Result<Value> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        Error::Processing(format!("Backup file {} is not valid JSON: {}", path.display(), e))
    })
}

fn expect_array(path: &Path, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(Error::Processing(format!(
            "Backup file {} must contain a JSON array",
            path.display()
        ))),
    }
}

/// Where and how to write a backup
#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub dir: PathBuf,
    pub prefix: String,
    /// Formatted with [`TIMESTAMP_FORMAT`] when set
    pub timestamp: Option<String>,
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentFile {
    pub component: Component,
    pub path: PathBuf,
    /// Items in the file (1 for settings)
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BackupSummary {
    pub files: Vec<ComponentFile>,
    /// Scanned items skipped because they were not records
    pub skipped: Vec<String>,
}

impl BackupSummary {
    pub fn render(&self) -> String {
        let mut out = String::from("\n=== backup completed ===\n");
        for file in &self.files {
            let _ = writeln!(
                out,
                "  {:<10}{:>8}  {}",
                format!("{}:", file.component.suffix()),
                file.count,
                file.path.display()
            );
        }
        if !self.skipped.is_empty() {
            let _ = writeln!(out, "  Skipped {} invalid items", self.skipped.len());
        }
        out
    }
}

/// Dump records, settings, rules and synonyms to four files
pub async fn backup<S: IndexStore + ?Sized>(
    store: &S,
    options: &BackupOptions,
) -> Result<BackupSummary> {
    tokio::fs::create_dir_all(&options.dir).await?;
    let stamp = options.timestamp.as_deref();
    let path_for = |component| options.dir.join(backup_file_name(&options.prefix, component, stamp));
    let mut summary = BackupSummary::default();

    let mut metrics = ProcessingMetrics::new();
    let mut records = Vec::new();
    let mut cursor = ScanCursor::new(
        store,
        BrowseParams {
            filter: None,
            page_size: options.batch_size,
        },
    );
    while let Some(page) = cursor.next_page(&mut metrics).await? {
        debug!(page = page.number, count = page.records.len(), "Backed up page");
        records.extend(page.records.into_iter().map(Record::into_value));
    }
    summary.skipped = metrics.errors;

    let record_count = records.len();
    let path = path_for(Component::Records);
    write_json_atomic(&path, &Value::Array(records)).await?;
    summary.files.push(ComponentFile {
        component: Component::Records,
        path,
        count: record_count,
    });

    let settings = store.get_settings().await?;
    let path = path_for(Component::Settings);
    write_json_atomic(&path, &settings).await?;
    summary.files.push(ComponentFile {
        component: Component::Settings,
        path,
        count: 1,
    });

    let rules = store.list_rules().await?;
    let path = path_for(Component::Rules);
    write_json_atomic(&path, &Value::Array(rules.clone())).await?;
    summary.files.push(ComponentFile {
        component: Component::Rules,
        path,
        count: rules.len(),
    });

    let synonyms = store.list_synonyms().await?;
    let path = path_for(Component::Synonyms);
    write_json_atomic(&path, &Value::Array(synonyms.clone())).await?;
    summary.files.push(ComponentFile {
        component: Component::Synonyms,
        path,
        count: synonyms.len(),
    });

    info!(
        records = record_count,
        rules = rules.len(),
        synonyms = synonyms.len(),
        dir = %options.dir.display(),
        "Backup written"
    );
    Ok(summary)
}

/// Where to restore from and whether to write
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub dir: PathBuf,
    pub prefix: String,
    pub execute: bool,
    pub batch_size: usize,
}

/// What a restore did (or would do in a dry run)
#[derive(Debug, Clone, Default)]
pub struct RestoreSummary {
    pub execute: bool,
    pub found: Vec<ComponentFile>,
    pub missing: Vec<Component>,
    /// Records in the backup that are (or would be) upserted
    pub records_upserted: usize,
    /// Index records absent from the backup that are (or would be) deleted
    pub records_deleted: usize,
}

impl RestoreSummary {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let verb = if self.execute { "restored" } else { "would restore" };
        let _ = writeln!(out, "\n=== restore {} ===", if self.execute { "completed" } else { "preview" });
        for file in &self.found {
            let _ = writeln!(
                out,
                "  {:<10}{:>8} {}  {}",
                format!("{}:", file.component.suffix()),
                file.count,
                verb,
                file.path.display()
            );
        }
        for component in &self.missing {
            let _ = writeln!(out, "  {:<10}no backup file, left untouched", format!("{}:", component.suffix()));
        }
        if self.found.iter().any(|f| f.component == Component::Records) {
            let _ = writeln!(out, "  Records upserted:     {}", self.records_upserted);
            let _ = writeln!(out, "  Records deleted:      {}", self.records_deleted);
        }
        if !self.execute {
            let _ = writeln!(out, "\n  DRY RUN: no changes were applied.");
            let _ = writeln!(out, "  Re-run with --execute to apply these changes.");
        }
        out
    }
}

/// Replace index components from the newest matching backup files
pub async fn restore<S: IndexStore + ?Sized>(
    store: &S,
    options: &RestoreOptions,
) -> Result<RestoreSummary> {
    if !options.dir.is_dir() {
        return Err(Error::Validation(format!(
            "Backup directory does not exist: {}",
            options.dir.display()
        )));
    }

    let mut summary = RestoreSummary {
        execute: options.execute,
        ..Default::default()
    };
    let mut files = Vec::new();
    for component in Component::ALL {
        match find_backup_file(&options.dir, &options.prefix, component)? {
            Some(path) => files.push((component, path)),
            None => {
                warn!(component = component.suffix(), prefix = %options.prefix, "No backup file found");
                summary.missing.push(component);
            }
        }
    }
    if files.is_empty() {
        return Err(Error::Validation(format!(
            "No backup files with prefix '{}' in {}",
            options.prefix,
            options.dir.display()
        )));
    }

    // Read and shape-check every component before the first write
    let mut loaded = Vec::with_capacity(files.len());
    for (component, path) in files {
        let value = read_json(&path).await?;
        let contents = match component {
            Component::Records => Loaded::Records(parse_records(&path, value)?),
            Component::Settings => Loaded::Settings(value),
            Component::Rules => Loaded::Rules(expect_array(&path, value)?),
            Component::Synonyms => Loaded::Synonyms(expect_array(&path, value)?),
        };
        loaded.push((component, path, contents));
    }

    for (component, path, contents) in loaded {
        let count = contents.len();
        match contents {
            Loaded::Records(records) => {
                restore_records(store, options, records, &mut summary).await?;
            }
            Loaded::Settings(settings) if options.execute => store.set_settings(&settings).await?,
            Loaded::Rules(rules) if options.execute => store.save_rules(&rules, true).await?,
            Loaded::Synonyms(synonyms) if options.execute => {
                store.save_synonyms(&synonyms, true).await?
            }
            _ => {}
        }
        info!(
            component = component.suffix(),
            count,
            execute = options.execute,
            file = %path.display(),
            "Restored component"
        );
        summary.found.push(ComponentFile { component, path, count });
    }
    Ok(summary)
}

/// A backup file after its shape has been checked
enum Loaded {
    Records(Vec<Record>),
    Settings(Value),
    Rules(Vec<Value>),
    Synonyms(Vec<Value>),
}

impl Loaded {
    fn len(&self) -> usize {
        match self {
            Loaded::Records(records) => records.len(),
            Loaded::Settings(_) => 1,
            Loaded::Rules(items) | Loaded::Synonyms(items) => items.len(),
        }
    }
}

fn parse_records(path: &Path, value: Value) -> Result<Vec<Record>> {
    expect_array(path, value)?
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let valid = matches!(item.get(OBJECT_ID), Some(Value::String(id)) if !id.is_empty());
            if !valid {
                return Err(Error::Validation(format!(
                    "{}: item {} has no objectID",
                    path.display(),
                    i
                )));
            }
            Record::from_value(item).ok_or_else(|| {
                Error::Validation(format!("{}: item {} is not an object", path.display(), i))
            })
        })
        .collect()
}

/// Upsert every backed-up record, then delete index records not in the backup
async fn restore_records<S: IndexStore + ?Sized>(
    store: &S,
    options: &RestoreOptions,
    records: Vec<Record>,
    summary: &mut RestoreSummary,
) -> Result<()> {
    let mutator = BatchMutator::new(store, options.batch_size, options.execute);
    let keep: HashSet<String> = records
        .iter()
        .filter_map(|r| r.object_id().map(str::to_string))
        .collect();

    mutator.upsert(&records).await?;
    summary.records_upserted = records.len();

    let mut metrics = ProcessingMetrics::new();
    let mut stale = Vec::new();
    let mut cursor = ScanCursor::new(
        store,
        BrowseParams {
            filter: None,
            page_size: options.batch_size,
        },
    );
    while let Some(page) = cursor.next_page(&mut metrics).await? {
        stale.extend(
            page.records
                .iter()
                .filter_map(|r| r.object_id())
                .filter(|id| !keep.contains(*id))
                .map(str::to_string),
        );
    }

    mutator.delete(&stale).await?;
    summary.records_deleted = stale.len();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreCall};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_file_names() {
        assert_eq!(backup_file_name("content", Component::Rules, None), "content_rules.json");
        assert_eq!(
            backup_file_name("content", Component::Records, Some("20240115_103000")),
            "content_records_20240115_103000.json"
        );
    }

    #[test]
    fn test_file_matching() {
        assert!(matches_backup_file("content_records.json", "content", Component::Records));
        assert!(matches_backup_file(
            "content_records_20240115_103000.json",
            "content",
            Component::Records
        ));
        assert!(!matches_backup_file("content_records.json", "content", Component::Rules));
        assert!(!matches_backup_file(
            "content_staging_records.json",
            "content",
            Component::Records
        ));
        assert!(!matches_backup_file("content_records_latest.json", "content", Component::Records));
        assert!(!matches_backup_file("content_records.json.tmp", "content", Component::Records));
    }

    #[test]
    fn test_newest_file_wins() {
        let dir = TempDir::new().unwrap();
        for name in [
            "idx_rules_20240101_000000.json",
            "idx_rules_20240301_120000.json",
            "idx_rules_20240201_000000.json",
        ] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }
        let found = find_backup_file(dir.path(), "idx", Component::Rules).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "idx_rules_20240301_120000.json");
        assert!(find_backup_file(dir.path(), "idx", Component::Synonyms).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("x_settings.json");
        write_json_atomic(&target, &json!({"a": 1})).await.unwrap();
        assert!(target.exists());
        assert!(!dir.path().join("x_settings.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_backup_then_restore_replaces_components() {
        let dir = TempDir::new().unwrap();
        let source = MemoryStore::with_items(vec![
            json!({"objectID": "a", "title": "A"}),
            json!({"objectID": "b", "title": "B"}),
        ]);
        source.set_initial_settings(json!({"searchableAttributes": ["title"]}));
        source.set_initial_rules(vec![json!({"objectID": "rule-1"})]);
        source.set_initial_synonyms(vec![json!({"objectID": "syn-1", "type": "synonym"})]);

        let summary = backup(
            &source,
            &BackupOptions {
                dir: dir.path().join("nested"),
                prefix: "content".to_string(),
                timestamp: None,
                batch_size: 1,
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.files.len(), 4);
        assert_eq!(summary.files[0].count, 2);

        let target = MemoryStore::with_items(vec![
            json!({"objectID": "a", "title": "stale"}),
            json!({"objectID": "z", "title": "extra"}),
        ]);
        let restored = restore(
            &target,
            &RestoreOptions {
                dir: dir.path().join("nested"),
                prefix: "content".to_string(),
                execute: true,
                batch_size: 10,
            },
        )
        .await
        .unwrap();

        assert_eq!(target.object_ids(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(target.get("a").unwrap()["title"], "A");
        assert_eq!(target.settings(), json!({"searchableAttributes": ["title"]}));
        assert_eq!(target.rules(), vec![json!({"objectID": "rule-1"})]);
        assert_eq!(restored.records_upserted, 2);
        assert_eq!(restored.records_deleted, 1);
        assert!(restored.missing.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_restore_writes_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("idx_records.json"),
            r#"[{"objectID": "a"}]"#,
        )
        .unwrap();
        let store = MemoryStore::with_items(vec![json!({"objectID": "old"})]);

        let summary = restore(
            &store,
            &RestoreOptions {
                dir: dir.path().to_path_buf(),
                prefix: "idx".to_string(),
                execute: false,
                batch_size: 10,
            },
        )
        .await
        .unwrap();

        assert!(store.write_calls().is_empty());
        assert_eq!(summary.records_deleted, 1);
        assert_eq!(summary.missing.len(), 3);
        assert!(summary.render().contains("DRY RUN"));
    }

    #[tokio::test]
    async fn test_absent_components_are_untouched() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("idx_synonyms.json"), "[]").unwrap();
        let store = MemoryStore::with_items(vec![json!({"objectID": "keep"})]);

        restore(
            &store,
            &RestoreOptions {
                dir: dir.path().to_path_buf(),
                prefix: "idx".to_string(),
                execute: true,
                batch_size: 10,
            },
        )
        .await
        .unwrap();

        assert_eq!(store.object_ids(), vec!["keep".to_string()]);
        assert_eq!(
            store.write_calls(),
            vec![StoreCall::SaveSynonyms {
                count: 0,
                replace_existing: true
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_backup_records_abort_before_writing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("idx_records.json"), r#"[{"title": "no id"}]"#).unwrap();
        let store = MemoryStore::new();
        let err = restore(
            &store,
            &RestoreOptions {
                dir: dir.path().to_path_buf(),
                prefix: "idx".to_string(),
                execute: true,
                batch_size: 10,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rules_file_aborts_before_any_write() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("idx_records.json"), r#"[{"objectID": "new"}]"#).unwrap();
        std::fs::write(dir.path().join("idx_rules.json"), r#"{"not": "an array"}"#).unwrap();
        let store = MemoryStore::with_items(vec![json!({"objectID": "old"})]);
        let err = restore(
            &store,
            &RestoreOptions {
                dir: dir.path().to_path_buf(),
                prefix: "idx".to_string(),
                execute: true,
                batch_size: 10,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Processing(_)));
        assert!(store.write_calls().is_empty());
        assert_eq!(store.object_ids(), vec!["old".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let store = MemoryStore::new();
        let err = restore(
            &store,
            &RestoreOptions {
                dir: PathBuf::from("/nonexistent/sift-backups"),
                prefix: "idx".to_string(),
                execute: false,
                batch_size: 10,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
