//! Bulk Uploadr - bounded-concurrency bulk uploader for S3
//!
//! Uploads a directory tree, or a list of files, to `s3://bucket/prefix`.

use anyhow::Context;
use bulk_uploadr::cli::{Args, WorkSource};
use bulk_uploadr::config::Config;
use bulk_uploadr::destination::Destination;
use bulk_uploadr::store::{S3ObjectStore, S3StoreConfig};
use bulk_uploadr::upload::Uploader;
use bulk_uploadr::worklist::WorkList;
use bulk_uploadr::{logging, metrics};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Report a configuration problem with usage text and exit 2
fn usage_error(message: impl std::fmt::Display) -> ! {
    Args::command().error(ErrorKind::InvalidValue, message).exit()
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let destination = match Destination::parse(&args.dest, S3ObjectStore::SCHEME) {
        Ok(destination) => destination,
        Err(e) => usage_error(e),
    };
    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => usage_error(e),
    };
    let Some(source) = args.work_source() else {
        usage_error("exactly one of --list or --dir is required");
    };

    if let Err(e) = logging::init(&args.log_level, args.log_format) {
        usage_error(e);
    }

    let result = run(&args, config, destination, source).await;

    if let Some(path) = &args.metrics_file {
        if let Err(e) = metrics::write_textfile(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write metrics file");
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bulk-uploadr: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    args: &Args,
    config: Config,
    destination: Destination,
    source: WorkSource,
) -> anyhow::Result<()> {
    info!("Starting Bulk Uploadr v{}", bulk_uploadr::VERSION);

    let mut work = match &source {
        WorkSource::Directory(dir) => WorkList::from_directory(dir)?,
        WorkSource::List(list) => WorkList::from_list_source(list)?,
    };
    if config.transfer.shuffle {
        work.shuffle();
    }
    info!(files = work.len(), destination = %destination, "Work list ready");

    if let Some(path) = &args.save_list {
        work.save(path)
            .with_context(|| format!("save work list to {}", path.display()))?;
    }

    let store_config = S3StoreConfig::from_config(&config.s3)?;
    let store = S3ObjectStore::new(store_config)
        .await
        .context("create S3 client")?;

    let uploader = Uploader::new(Arc::new(store), destination, config.transfer);
    let summary = uploader.run(&work).await?;

    info!(
        uploaded = summary.uploaded,
        bytes = summary.bytes,
        "Done: {} files, {:.1} MiB/s",
        summary.uploaded,
        summary.throughput() / (1024.0 * 1024.0)
    );
    Ok(())
}
