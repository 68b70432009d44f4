//! Command-line surface
//!
//! One subcommand per policy plus `backup` and `restore`. Every command runs
//! as a dry run unless `--execute` is given.

use clap::{Args, Parser, Subcommand};
use sift_common::config::ConfigOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Batch record transformations for a hosted search index")]
#[command(version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Index to operate on (defaults to ALGOLIA_INDEX_NAME / config file)
    #[arg(long)]
    pub index: Option<String>,

    /// Apply changes; without this flag nothing is written
    #[arg(long)]
    pub execute: bool,

    /// Records per page and per write batch (max 10000)
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Skip the confirmation prompt in execute mode
    #[arg(short, long)]
    pub yes: bool,

    /// Extra server-side filter, ANDed with the command's own filter
    #[arg(long, value_name = "EXPR")]
    pub filter: Option<String>,

    /// TOML config file (defaults to SIFT_CONFIG, then the user config dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            index_name: self.index.clone(),
            batch_size: self.batch_size,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regenerate objectIDs from schemaPath;resourceType;title;extUrl
    ReplaceResourceObjectid {
        #[command(flatten)]
        common: CommonArgs,
        /// Only process this resource type
        #[arg(long)]
        resource_type: Option<String>,
    },

    /// Report records whose objectID was derived from their title
    FindMatchingObjectid {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Move title-derived records onto slug-derived objectIDs
    ReplaceObjectidWithSlug {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Convert string publishedDate values to epoch milliseconds
    FixPublishedDate {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        resource_type: String,
    },

    /// Normalize one date field to Unix seconds
    NormalizeDateField {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        field: String,
    },

    /// Normalize every date-like top-level field to Unix seconds
    SanitizeDateValues {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Merge title-derived duplicates onto the slug-derived record
    FindDuplicateSlug {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Delete records whose field matches a regular expression
    DeleteRecordsByPattern {
        #[command(flatten)]
        common: CommonArgs,
        /// Field to test
        #[arg(long)]
        key: String,
        /// Regular expression
        #[arg(long)]
        pattern: String,
    },

    /// Delete title-derived records whose listed fields are all empty
    FindInvalidRecords {
        #[command(flatten)]
        common: CommonArgs,
        /// Comma-separated field names
        #[arg(long, value_delimiter = ',', required = true)]
        keys: Vec<String>,
    },

    /// Write records, settings, rules and synonyms to JSON files
    Backup {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long, default_value = "backups")]
        dir: PathBuf,
        /// File name prefix (defaults to the index name)
        #[arg(long)]
        prefix: Option<String>,
        /// Add a YYYYMMDD_HHMMSS stamp to the file names
        #[arg(long)]
        timestamp: bool,
    },

    /// Replace index components from the newest matching backup files
    Restore {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long, default_value = "backups")]
        dir: PathBuf,
        /// File name prefix (defaults to the index name)
        #[arg(long)]
        prefix: Option<String>,
    },
}

impl Command {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Command::ReplaceResourceObjectid { common, .. }
            | Command::FindMatchingObjectid { common }
            | Command::ReplaceObjectidWithSlug { common }
            | Command::FixPublishedDate { common, .. }
            | Command::NormalizeDateField { common, .. }
            | Command::SanitizeDateValues { common }
            | Command::FindDuplicateSlug { common }
            | Command::DeleteRecordsByPattern { common, .. }
            | Command::FindInvalidRecords { common, .. }
            | Command::Backup { common, .. }
            | Command::Restore { common, .. } => common,
        }
    }
}
