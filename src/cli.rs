//! Command-line interface

use crate::config::{ByteSize, Config, ConfigError};
use crate::logging::LogFormat;
use crate::worklist::ListSource;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Bulk Uploadr - upload a directory tree or file list to S3
#[derive(Parser, Debug)]
#[command(name = "bulk-uploadr")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["list", "dir"])))]
pub struct Args {
    /// Destination as s3://bucket/prefix
    #[arg(value_name = "DEST")]
    pub dest: String,

    /// Maximum concurrent uploads [default: 24]
    #[arg(short = 'n', long = "concurrency")]
    pub concurrency: Option<usize>,

    /// Log every uploaded file
    #[arg(short, long)]
    pub verbose: bool,

    /// Copy buffer size, e.g. 512k [default: 512k]
    #[arg(long = "buf", value_name = "SIZE")]
    pub buffer_size: Option<ByteSize>,

    /// Remote request chunk size, e.g. 16m [default: 16m]
    #[arg(long = "chunk", value_name = "SIZE")]
    pub chunk_size: Option<ByteSize>,

    /// Reclaim memory every N uploads, 0 disables [default: 0]
    #[arg(long = "gc", value_name = "N")]
    pub reclaim_interval: Option<u64>,

    /// Upload files in random order
    #[arg(long)]
    pub shuffle: bool,

    /// Newline-delimited file list, '-' for stdin
    #[arg(short, long, value_name = "FILE")]
    pub list: Option<String>,

    /// Directory to upload recursively
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the final work list to this file
    #[arg(long, value_name = "FILE")]
    pub save_list: Option<PathBuf>,

    /// Write Prometheus metrics to this file on exit
    #[arg(long, value_name = "FILE")]
    pub metrics_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Where the work list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkSource {
    Directory(PathBuf),
    List(ListSource),
}

impl Args {
    /// Load the config file if one was given, apply flag overrides and
    /// validate the result.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Flags take precedence over file values
    pub fn apply_overrides(&self, config: &mut Config) {
        let transfer = &mut config.transfer;
        if let Some(n) = self.concurrency {
            transfer.concurrency = n;
        }
        if let Some(size) = self.buffer_size {
            transfer.buffer_size = size;
        }
        if let Some(size) = self.chunk_size {
            transfer.chunk_size = size;
        }
        if let Some(interval) = self.reclaim_interval {
            transfer.reclaim_interval = interval;
        }
        transfer.verbose |= self.verbose;
        transfer.shuffle |= self.shuffle;
    }

    pub fn work_source(&self) -> Option<WorkSource> {
        match (&self.dir, &self.list) {
            (Some(dir), None) => Some(WorkSource::Directory(dir.clone())),
            (None, Some(list)) => Some(WorkSource::List(ListSource::from_arg(list))),
            _ => None,
        }
    }
}
