use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gdrive_core::{ApiErrorClass, DriveClient, DriveError};
use gdrive_sync::config::SyncConfig;
use gdrive_sync::sync::engine::SyncEngine;
use gdrive_sync::sync::report::FailurePolicy;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Mirror a local directory tree onto Google Drive
#[derive(Parser, Debug)]
#[command(name = "gdrive-sync", version)]
struct Cli {
    /// Record per-file failures and keep going instead of stopping on the first remote fault
    #[arg(long, global = true)]
    continue_on_error: bool,

    /// Log listing pages, resolution steps and upload progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Upload every file under DIR, creating missing remote folders
    Upload {
        dir: PathBuf,
        /// Uploads in flight at once (defaults to GDRIVE_BATCH_SIZE)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },
    /// Delete every remote object whose name starts with PREFIX
    Delete {
        #[arg(value_parser = clap::builder::NonEmptyStringValueParser::new())]
        prefix: String,
        /// Deletes in flight at once (defaults to GDRIVE_BATCH_SIZE)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },
    /// List the whole remote store and print index totals
    Index,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = SyncConfig::from_env();
    if cli.continue_on_error {
        config.policy = FailurePolicy::Continue;
    }

    let client = DriveClient::with_base_url(&config.api_base, config.access_token()?)
        .context("invalid GDRIVE_API_BASE")?
        .with_page_size(config.page_size);
    let engine = SyncEngine::new(Arc::new(client), config.remote_root.clone(), config.policy);

    if let Err(err) = run(&engine, &cli.command, &config).await {
        error!("run failed: {err:#}");
        if rejected_token(&err) {
            error!("the access token was rejected; refresh GDRIVE_ACCESS_TOKEN");
        }
        return Err(err);
    }
    Ok(())
}

async fn run(engine: &SyncEngine, command: &Command, config: &SyncConfig) -> anyhow::Result<()> {
    match command {
        Command::Upload { dir, batch_size } => {
            let report = engine
                .upload_tree(dir, batch_size.unwrap_or(config.batch_size))
                .await
                .with_context(|| format!("upload of {} failed", dir.display()))?;
            info!(
                discovered = report.discovered,
                uploaded = report.uploaded.len(),
                failed = report.failed.len(),
                folders_created = report.folders_created,
                batches = report.batches,
                "upload complete"
            );
        }
        Command::Delete { prefix, batch_size } => {
            let report = engine
                .delete_by_prefix(prefix, batch_size.unwrap_or(config.batch_size))
                .await
                .with_context(|| format!("delete of {prefix:?} failed"))?;
            info!(
                scanned = report.scanned,
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                pages = report.pages,
                "delete complete"
            );
        }
        Command::Index => {
            let stats = engine
                .refresh_index()
                .await
                .context("remote listing failed")?;
            println!(
                "{} objects ({} folders) across {} pages",
                stats.objects, stats.folders, stats.pages
            );
        }
    }
    Ok(())
}

fn rejected_token(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<DriveError>())
        .any(|drive| drive.classification() == Some(ApiErrorClass::Auth))
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("gdrive_sync=debug,warn")
        } else {
            EnvFilter::new("gdrive_sync=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
