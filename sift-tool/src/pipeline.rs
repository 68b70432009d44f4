//! Browse → classify → apply pipeline
//!
//! [`run_policy`] is the single driver for every policy:
//!
//! ```text
//! SCANNING → per record CLASSIFY → {NO_CHANGE, MISSING, INVALID, CHANGE}
//!   NO_CHANGE: counted, discarded
//!   MISSING:   counted as missing field, discarded
//!   INVALID:   recorded as error, discarded (never fatal)
//!   CHANGE:    added to the page's pending writes
//! after each page: flush pending writes (execute mode only)
//! after the last page: policy.finish() decisions, flushed the same way
//! ```
//!
//! A page fetch or write failure aborts the run. Writes already flushed for
//! earlier pages stay applied.

use crate::metrics::{ProcessingMetrics, RunReport, RunTimer};
use crate::mutator::{BatchMutator, PendingWrites};
use crate::policies::{Change, Decision, Policy};
use crate::scan::ScanCursor;
use crate::store::{BrowseParams, IndexStore};
use sift_common::Error;
use tracing::{debug, error, info};

/// Run-wide options
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub index: String,
    /// Apply writes; otherwise dry run
    pub execute: bool,
    /// Scan page size and write batch size
    pub batch_size: usize,
    /// Extra user-supplied filter
    pub filter: Option<String>,
}

/// A run that stopped on a fatal error
#[derive(Debug, thiserror::Error)]
#[error("{policy} aborted: {error}")]
pub struct RunAborted {
    pub policy: String,
    pub error: Error,
    /// Metrics for the pages that completed before the failure
    pub report: RunReport,
}

/// Combine two optional filter expressions with `AND`
pub fn combine_filters(a: Option<&str>, b: Option<&str>) -> Option<String> {
    let a = a.map(str::trim).filter(|s| !s.is_empty());
    let b = b.map(str::trim).filter(|s| !s.is_empty());
    match (a, b) {
        (Some(a), Some(b)) => Some(format!("({}) AND ({})", a, b)),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

/// Drive `policy` over the whole index
pub async fn run_policy<S, P>(
    store: &S,
    policy: &mut P,
    options: &RunOptions,
) -> Result<RunReport, RunAborted>
where
    S: IndexStore + ?Sized,
    P: Policy + ?Sized,
{
    let timer = RunTimer::start();
    let info = policy.describe();
    let dry_run = !options.execute;
    let mut metrics = ProcessingMetrics::new();

    let params = BrowseParams {
        filter: combine_filters(info.filter.as_deref(), options.filter.as_deref()),
        page_size: options.batch_size,
    };
    let mutator = BatchMutator::new(store, options.batch_size, options.execute && !info.read_only);

    info!(
        policy = info.name,
        index = %options.index,
        dry_run,
        batch_size = options.batch_size,
        filter = params.filter.as_deref().unwrap_or(""),
        "Starting {}",
        info.description
    );

    let report = |metrics: ProcessingMetrics, failure: Option<String>| RunReport {
        policy: info.name.to_string(),
        index: options.index.clone(),
        dry_run,
        read_only: info.read_only,
        metrics,
        elapsed: timer.elapsed(),
        failure,
    };
    let abort = |metrics: ProcessingMetrics, error: Error| {
        error!(policy = info.name, "Run aborted: {}", error);
        RunAborted {
            policy: info.name.to_string(),
            report: report(metrics, Some(error.to_string())),
            error,
        }
    };

    let mut cursor = ScanCursor::new(store, params);
    loop {
        let page = match cursor.next_page(&mut metrics).await {
            Ok(Some(page)) => page,
            Ok(None) => break,
            Err(e) => return Err(abort(metrics, e)),
        };

        let mut pending = PendingWrites::new();
        for record in &page.records {
            metrics.processed_records += 1;
            let decision = policy.classify(record);
            apply_decision(decision, record.object_id(), &mut pending, &mut metrics);
        }

        debug!(
            page = page.number,
            upserts = pending.upsert_count(),
            deletes = pending.delete_count(),
            "Classified page"
        );
        if let Err(e) = pending.flush(&mutator, &mut metrics).await {
            return Err(abort(metrics, e));
        }
    }

    let mut pending = PendingWrites::new();
    for decision in policy.finish() {
        apply_decision(decision, None, &mut pending, &mut metrics);
    }
    if let Err(e) = pending.flush(&mutator, &mut metrics).await {
        return Err(abort(metrics, e));
    }

    info!(policy = info.name, "{}", metrics.display_string());
    Ok(report(metrics, None))
}

fn apply_decision(
    decision: Decision,
    subject: Option<&str>,
    pending: &mut PendingWrites,
    metrics: &mut ProcessingMetrics,
) {
    match decision {
        Decision::NoChange => {}
        Decision::Missing(field) => {
            metrics.missing_field_records += 1;
            debug!(object_id = subject.unwrap_or(""), field = %field, "Missing field");
        }
        Decision::Invalid(reason) => match subject {
            Some(id) => metrics.record_error(format!("{}: {}", id, reason)),
            None => metrics.record_error(reason),
        },
        Decision::Change(change) => {
            if let Change::Rename { from, record } = &change {
                if record.object_id() == Some(from.as_str()) {
                    return;
                }
            }
            metrics.changed_records += 1;
            metrics.record_sample(change.describe());
            match change {
                Change::Update { record, .. } => pending.upsert(record),
                Change::Rename { from, record } => pending.rename(from, record),
                Change::Delete { object_id, .. } => pending.delete(object_id),
                Change::Report(_) => {}
            }
        }
    }
}
