//! sift - batch record transformations for a hosted search index
//!
//! **Usage:**
//! ```bash
//! sift <command> [--index <name>] [--execute] [--batch-size <n>] [--yes] [...]
//! ```
//!
//! Exit code 0 on success; 1 on any fatal error and on a declined
//! confirmation prompt.

use anyhow::Result;
use clap::Parser;
use sift_common::config::AppConfig;
use sift_common::Error;
use sift_tool::backup::{self, BackupOptions, RestoreOptions, TIMESTAMP_FORMAT};
use sift_tool::cli::{Cli, Command, CommonArgs};
use sift_tool::policies::{
    DeleteRecordsByPattern, FindDuplicateSlug, FindInvalidRecords, FindMatchingObjectId,
    FixPublishedDate, NormalizeDateField, Policy, ReplaceObjectIdWithSlug,
    ReplaceResourceObjectId, SanitizeDateValues,
};
use sift_tool::prompt;
use sift_tool::store::AlgoliaStore;
use sift_tool::{run_policy, RunOptions};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_directive = if cli.verbose {
        "sift_tool=debug,sift_common=debug"
    } else {
        "sift_tool=info,sift_common=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "sift v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<Error>() {
            Some(err) if err.is_cancelled() => {
                eprintln!("Cancelled. No changes were applied.");
                ExitCode::from(err.exit_code() as u8)
            }
            Some(err) => {
                error!(kind = err.kind(), "{}", err);
                ExitCode::from(err.exit_code() as u8)
            }
            None => {
                error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let common = cli.command.common().clone();

    // Configuration problems surface before any network call
    let config = AppConfig::load(&common.overrides())?;
    let index = config.index_name(common.index.as_deref())?;
    let store = AlgoliaStore::new(&config, &index)?;

    match cli.command {
        Command::ReplaceResourceObjectid { resource_type, .. } => {
            if config.resource_types.is_empty() {
                return Err(Error::Config(
                    "No resource types configured. Set SIFT_RESOURCE_TYPES or [resource_types] in the config file"
                        .to_string(),
                )
                .into());
            }
            if let Some(rt) = &resource_type {
                if config.resource_types.schema_path(rt).is_none() {
                    return Err(Error::Config(format!("No schemaPath configured for resourceType '{}'", rt)).into());
                }
            }
            let policy = ReplaceResourceObjectId::new(config.ids, config.resource_types.clone(), resource_type);
            run_command(&store, policy, &common, &config, &index).await
        }
        Command::FindMatchingObjectid { .. } => {
            run_command(&store, FindMatchingObjectId::new(config.ids), &common, &config, &index).await
        }
        Command::ReplaceObjectidWithSlug { .. } => {
            run_command(&store, ReplaceObjectIdWithSlug::new(config.ids), &common, &config, &index).await
        }
        Command::FixPublishedDate { resource_type, .. } => {
            warn!("fix-published-date writes epoch milliseconds; the other date commands write seconds");
            run_command(&store, FixPublishedDate::new(resource_type), &common, &config, &index).await
        }
        Command::NormalizeDateField { field, .. } => {
            run_command(&store, NormalizeDateField::new(field), &common, &config, &index).await
        }
        Command::SanitizeDateValues { .. } => {
            run_command(&store, SanitizeDateValues::new(), &common, &config, &index).await
        }
        Command::FindDuplicateSlug { .. } => {
            run_command(&store, FindDuplicateSlug::new(config.ids), &common, &config, &index).await
        }
        Command::DeleteRecordsByPattern { key, pattern, .. } => {
            let policy = DeleteRecordsByPattern::new(key, &pattern)?;
            run_command(&store, policy, &common, &config, &index).await
        }
        Command::FindInvalidRecords { keys, .. } => {
            let policy = FindInvalidRecords::new(config.ids, keys)?;
            run_command(&store, policy, &common, &config, &index).await
        }
        Command::Backup { dir, prefix, timestamp, .. } => {
            let options = BackupOptions {
                dir,
                prefix: prefix.unwrap_or_else(|| index.clone()),
                timestamp: timestamp.then(|| chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()),
                batch_size: config.batch_size,
            };
            let summary = backup::backup(&store, &options).await?;
            print!("{}", summary.render());
            Ok(())
        }
        Command::Restore { dir, prefix, .. } => {
            if common.execute {
                prompt::confirm(
                    &format!("Replace contents of index '{}' from backups in {}?", index, dir.display()),
                    common.yes,
                )
                .await?;
            }
            let options = RestoreOptions {
                dir,
                prefix: prefix.unwrap_or_else(|| index.clone()),
                execute: common.execute,
                batch_size: config.batch_size,
            };
            let summary = backup::restore(&store, &options).await?;
            print!("{}", summary.render());
            Ok(())
        }
    }
}

/// Confirm if needed, run the policy, print the summary
async fn run_command<P: Policy>(
    store: &AlgoliaStore,
    mut policy: P,
    common: &CommonArgs,
    config: &AppConfig,
    index: &str,
) -> Result<()> {
    let info = policy.describe();
    if common.execute && !info.read_only {
        prompt::confirm(
            &format!("Run {} on index '{}' and apply changes?", info.name, index),
            common.yes,
        )
        .await?;
    }

    let options = RunOptions {
        index: index.to_string(),
        execute: common.execute,
        batch_size: config.batch_size,
        filter: common.filter.clone(),
    };
    match run_policy(store, &mut policy, &options).await {
        Ok(report) => {
            print!("{}", report.render());
            Ok(())
        }
        Err(aborted) => {
            print!("{}", aborted.report.render());
            Err(aborted.error.into())
        }
    }
}
