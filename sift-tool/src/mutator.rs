//! Batched writes
//!
//! [`PendingWrites`] accumulates one page's decisions; [`BatchMutator`]
//! sends them as bulk calls. Within a flush every upsert is sent before any
//! delete, so an interruption between the two leaves both the old and the
//! new record in the index rather than neither.

use crate::metrics::ProcessingMetrics;
use crate::store::IndexStore;
use sift_common::{Record, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Bulk upsert/delete front-end over an [`IndexStore`]
///
/// In dry-run mode every call is a no-op; this is the single place where
/// dry-run purity is enforced.
pub struct BatchMutator<'a, S: IndexStore + ?Sized> {
    store: &'a S,
    batch_size: usize,
    execute: bool,
}

impl<'a, S: IndexStore + ?Sized> BatchMutator<'a, S> {
    pub fn new(store: &'a S, batch_size: usize, execute: bool) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            execute,
        }
    }

    pub fn is_executing(&self) -> bool {
        self.execute
    }

    /// Create or replace records; returns how many were sent
    pub async fn upsert(&self, records: &[Record]) -> Result<usize> {
        if records.is_empty() || !self.execute {
            return Ok(0);
        }
        for chunk in records.chunks(self.batch_size) {
            self.store.save_objects(chunk).await?;
            debug!(count = chunk.len(), "Upserted batch");
        }
        Ok(records.len())
    }

    /// Delete records by id; returns how many were sent
    pub async fn delete(&self, object_ids: &[String]) -> Result<usize> {
        if object_ids.is_empty() || !self.execute {
            return Ok(0);
        }
        for chunk in object_ids.chunks(self.batch_size) {
            self.store.delete_objects(chunk).await?;
            debug!(count = chunk.len(), "Deleted batch");
        }
        Ok(object_ids.len())
    }
}

/// Writes decided for the current page
#[derive(Debug, Default)]
pub struct PendingWrites {
    upserts: Vec<Record>,
    deletes: Vec<String>,
    renames: Vec<(String, Record)>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: Record) {
        self.upserts.push(record);
    }

    pub fn delete(&mut self, object_id: impl Into<String>) {
        self.deletes.push(object_id.into());
    }

    /// Upsert under the new id and retire the old one.
    ///
    /// The pair stays together: if the upsert is refused the old id is kept.
    pub fn rename(&mut self, from: impl Into<String>, record: Record) {
        self.renames.push((from.into(), record));
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty() && self.renames.is_empty()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.len() + self.renames.len()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.len() + self.renames.len()
    }

    /// Send everything: upserts first, then deletes.
    ///
    /// Records without an `objectID` are dropped and reported. A delete of
    /// an id that this same flush upserts is dropped, so a rename onto its
    /// own id can never erase the record.
    pub async fn flush<S: IndexStore + ?Sized>(
        self,
        mutator: &BatchMutator<'_, S>,
        metrics: &mut ProcessingMetrics,
    ) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let mut upserts = Vec::with_capacity(self.upserts.len() + self.renames.len());
        let mut retired = self.deletes;
        for record in self.upserts {
            if has_object_id(&record) {
                upserts.push(record);
            } else {
                warn!("Refusing to upsert a record without objectID");
                metrics.record_error("refused upsert of record without objectID");
            }
        }
        for (from, record) in self.renames {
            if has_object_id(&record) {
                upserts.push(record);
                retired.push(from);
            } else {
                warn!(from = %from, "Refusing rename to a record without objectID; keeping old id");
                metrics.record_error(format!("{}: refused rename to a record without objectID", from));
            }
        }

        let upserted_ids: HashSet<String> = upserts
            .iter()
            .filter_map(|r| r.object_id().map(str::to_string))
            .collect();
        let mut seen = HashSet::new();
        let deletes: Vec<String> = retired
            .into_iter()
            .filter(|id| !upserted_ids.contains(id))
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let upserted = mutator.upsert(&upserts).await?;
        let deleted = mutator.delete(&deletes).await?;
        metrics.upserted += upserted;
        metrics.deleted += deleted;

        if mutator.is_executing() {
            info!(upserted, deleted, "Applied page writes");
        }
        Ok(())
    }
}

fn has_object_id(record: &Record) -> bool {
    record.object_id().is_some_and(|id| !id.is_empty())
}
