//! # Sift Common Library
//!
//! Shared code for the sift record-transformation tool:
//! - Error taxonomy and result type
//! - Configuration loading (flags, environment, TOML)
//! - Record model over JSON values
//! - Deterministic identifier derivation
//! - Heuristic timestamp normalization
//! - Record validation predicates
//! - Human-readable elapsed time formatting

pub mod config;
pub mod error;
pub mod human_time;
pub mod identifier;
pub mod record;
pub mod timestamp;
pub mod validation;

pub use error::{Error, Result};
pub use identifier::IdDeriver;
pub use record::Record;
