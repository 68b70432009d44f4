//! sift - batch record transformations for a hosted search index
//!
//! A run streams every record of an index page by page, asks a policy what
//! should happen to each record, and applies the resulting upserts and
//! deletes in bulk. Runs are dry runs unless `--execute` is given.
//!
//! - [`store`]: the index store trait, the REST client and an in-memory store
//! - [`scan`]: cursor-driven page iteration with record validation
//! - [`mutator`]: batched upserts and deletes, dry-run aware
//! - [`pipeline`]: the generic policy runner
//! - [`policies`]: one module per transformation
//! - [`backup`]: backup and restore of records, settings, rules and synonyms

pub mod backup;
pub mod cli;
pub mod metrics;
pub mod mutator;
pub mod pipeline;
pub mod policies;
pub mod prompt;
pub mod scan;
pub mod store;

pub use metrics::{ProcessingMetrics, RunReport};
pub use pipeline::{run_policy, RunAborted, RunOptions};
pub use policies::{Change, Decision, Policy, PolicyInfo};
pub use store::{IndexStore, MemoryStore};
