//! Bulk Uploadr Library
//!
//! Uploads a local directory tree, or an explicit list of files, to an S3
//! bucket with a bounded number of concurrent transfers.
//!
//! # Features
//!
//! - **Bounded Concurrency**: At most `n` uploads in flight, submission blocks beyond that
//! - **Fail Fast**: The first failed file cancels the batch
//! - **Bounded Memory**: One copy buffer per in-flight upload, optional periodic reclamation
//! - **S3 Compatible**: Works with AWS S3 and S3-compatible endpoints
//!
//! # Example
//!
//! ```no_run
//! use bulk_uploadr::{
//!     config::Config, destination::Destination, store::S3ObjectStore, store::S3StoreConfig,
//!     upload::Uploader, worklist::WorkList,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let destination = Destination::parse("s3://my-bucket/backups", "s3")?;
//!     let store = S3ObjectStore::new(S3StoreConfig::from_config(&config.s3)?).await?;
//!
//!     let work = WorkList::from_directory("./data")?;
//!     let summary = Uploader::new(Arc::new(store), destination, config.transfer)
//!         .run(&work)
//!         .await?;
//!     println!("{} files in {:?}", summary.uploaded, summary.elapsed);
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod cli;
pub mod config;
pub mod destination;
pub mod logging;
pub mod metrics;
pub mod progress;
pub mod store;
pub mod temp_file;
pub mod upload;
pub mod worklist;

// Re-export commonly used types
pub use config::Config;
pub use destination::Destination;
pub use upload::{TransferError, Uploader};
pub use worklist::WorkList;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
