//! Full-index scan
//!
//! [`ScanCursor`] drives a cursor-paginated browse one page at a time. Each
//! page is validated before it is handed out: items that are not records are
//! logged to the run's error list and dropped. The next page is requested
//! only when the caller asks for it, so pages never overlap.

use crate::metrics::ProcessingMetrics;
use crate::store::{BrowseParams, IndexStore};
use sift_common::validation::validate_item;
use sift_common::{Error, Record, Result};
use tracing::{debug, warn};

/// A validated page of records
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number within the run
    pub number: usize,
    pub records: Vec<Record>,
}

/// Pull-based iterator over pages of an index
pub struct ScanCursor<'a, S: IndexStore + ?Sized> {
    store: &'a S,
    params: BrowseParams,
    cursor: Option<String>,
    finished: bool,
    pages: usize,
}

impl<'a, S: IndexStore + ?Sized> ScanCursor<'a, S> {
    pub fn new(store: &'a S, params: BrowseParams) -> Self {
        Self {
            store,
            params,
            cursor: None,
            finished: false,
            pages: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetch and validate the next page, `Ok(None)` once the index is exhausted.
    ///
    /// A fetch failure ends the traversal and is returned to the caller; it
    /// is never retried here.
    pub async fn next_page(&mut self, metrics: &mut ProcessingMetrics) -> Result<Option<Page>> {
        if self.finished {
            return Ok(None);
        }

        let sent_cursor = self.cursor.take();
        let page = match self.store.browse(&self.params, sent_cursor.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        self.pages += 1;
        metrics.batches_processed += 1;
        metrics.total_records += page.items.len();

        let number = self.pages;
        let mut records = Vec::with_capacity(page.items.len());
        for item in page.items {
            match validate_item(item) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    warn!(page = number, "Skipping invalid item: {}", reason);
                    metrics.record_error(format!("page {}: {}", number, reason));
                }
            }
        }

        match page.cursor {
            Some(next) if sent_cursor.as_deref() == Some(next.as_str()) => {
                self.finished = true;
                return Err(Error::Processing(format!(
                    "store returned the same cursor twice after page {}",
                    number
                )));
            }
            Some(next) => self.cursor = Some(next),
            None => self.finished = true,
        }

        debug!(
            page = number,
            records = records.len(),
            finished = self.finished,
            "Fetched page"
        );
        Ok(Some(Page { number, records }))
    }
}
