//! S3 object store
//!
//! Streams each file into S3 in `chunk_size` pieces. Objects that fit in a
//! single chunk go up as one PutObject; larger objects switch to a
//! multipart upload as soon as the first chunk fills.
//!
//! # Example
//!
//! ```no_run
//! use bulk_uploadr::config::S3Config;
//! use bulk_uploadr::store::{ObjectStore, RetryPolicy, S3ObjectStore, S3StoreConfig, WriterOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = S3StoreConfig::from_config(&S3Config::default())?;
//! let store = S3ObjectStore::new(config).await?;
//!
//! let options = WriterOptions { chunk_size: 16 * 1024 * 1024, retry: RetryPolicy::default() };
//! let mut writer = store.open_writer("my-bucket", "hello.txt", &options).await?;
//! writer.write(b"Hello, World!").await?;
//! writer.finalize().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Tracing
//!
//! | Operation | Span Name | Attributes |
//! |-----------|-----------|------------|
//! | PutObject | `s3.put_object` | bucket, key, bytes |
//! | CreateMultipartUpload | `s3.create_multipart_upload` | bucket, key, upload_id |
//! | UploadPart | `s3.upload_part` | bucket, key, part_number, bytes |
//! | CompleteMultipartUpload | `s3.complete_multipart_upload` | bucket, key, parts_count |

use super::credentials::CredentialSource;
use super::{ObjectStore, ObjectWriter, RetryMode, RetryPolicy, StoreError, WriterOptions};
use crate::config::S3Config;
use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};

/// Minimum part size (5MB) - S3 requirement
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Maximum part size (5GB) - S3 requirement
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum parts allowed
pub const MAX_PARTS: usize = 10000;

/// S3 store configuration
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub credentials: CredentialSource,
}

impl S3StoreConfig {
    pub fn from_config(config: &S3Config) -> Result<Self, StoreError> {
        let credentials = CredentialSource::from_config(config)
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        Ok(Self {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            force_path_style: config.force_path_style,
            credentials,
        })
    }
}

/// Object store backed by the AWS SDK S3 client
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Destination scheme served by this store
    pub const SCHEME: &'static str = "s3";

    /// Build the S3 client.
    ///
    /// With static credentials nothing is read from the environment;
    /// otherwise the shared AWS configuration is loaded first.
    pub async fn new(config: S3StoreConfig) -> Result<Self, StoreError> {
        if config.region.trim().is_empty() {
            return Err(StoreError::Configuration("region cannot be empty".into()));
        }
        let region = Region::new(config.region.clone());

        let mut builder = match config.credentials {
            CredentialSource::Static(credentials) => aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(credentials),
            CredentialSource::DefaultChain => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(config.force_path_style);

        tracing::debug!(
            region = %config.region,
            endpoint = ?config.endpoint,
            path_style = config.force_path_style,
            "S3 client configured"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    async fn open_writer(
        &self,
        bucket: &str,
        key: &str,
        options: &WriterOptions,
    ) -> Result<Box<dyn ObjectWriter>, StoreError> {
        if bucket.is_empty() {
            return Err(StoreError::Configuration("bucket cannot be empty".into()));
        }
        let chunk_size = options.chunk_size.max(MIN_PART_SIZE);

        Ok(Box::new(S3Writer {
            client: self.client.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            chunk_size,
            retry: retry_config(&options.retry),
            chunk: BytesMut::new(),
            upload_id: None,
            parts: Vec::new(),
        }))
    }
}

/// SDK retry configuration for a policy
fn retry_config(policy: &RetryPolicy) -> RetryConfig {
    match policy.mode {
        RetryMode::Disabled => RetryConfig::disabled(),
        RetryMode::Standard => RetryConfig::standard()
            .with_max_attempts(policy.max_attempts)
            .with_initial_backoff(policy.initial_backoff()),
        RetryMode::Adaptive => RetryConfig::adaptive()
            .with_max_attempts(policy.max_attempts)
            .with_initial_backoff(policy.initial_backoff()),
    }
}

fn request_error<E: std::error::Error>(operation: &'static str, key: &str, err: E) -> StoreError {
    StoreError::Request {
        operation,
        key: key.to_string(),
        message: DisplayErrorContext(err).to_string(),
    }
}

/// Write stream into one S3 object
struct S3Writer {
    client: Client,
    bucket: String,
    key: String,
    chunk_size: usize,
    retry: RetryConfig,
    chunk: BytesMut,
    upload_id: Option<String>,
    parts: Vec<CompletedPart>,
}

impl S3Writer {
    fn overrides(&self) -> aws_sdk_s3::config::Builder {
        aws_sdk_s3::config::Builder::new().retry_config(self.retry.clone())
    }

    fn take_chunk(&mut self) -> Bytes {
        self.chunk.split().freeze()
    }

    #[tracing::instrument(
        name = "s3.put_object",
        skip(self, body),
        fields(s3.bucket = %self.bucket, s3.key = %self.key, upload.bytes = body.len()),
        err
    )]
    async fn put_single(&self, body: Bytes) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(ByteStream::from(body))
            .customize()
            .config_override(self.overrides())
            .send()
            .await
            .map_err(|e| request_error("PutObject", &self.key, e))?;
        Ok(())
    }

    #[tracing::instrument(
        name = "s3.create_multipart_upload",
        skip(self),
        fields(s3.bucket = %self.bucket, s3.key = %self.key, s3.upload_id = tracing::field::Empty),
        err
    )]
    async fn create_multipart(&self) -> Result<String, StoreError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .customize()
            .config_override(self.overrides())
            .send()
            .await
            .map_err(|e| request_error("CreateMultipartUpload", &self.key, e))?;

        let upload_id = output
            .upload_id()
            .map(String::from)
            .ok_or_else(|| StoreError::Request {
                operation: "CreateMultipartUpload",
                key: self.key.clone(),
                message: "response carried no upload id".into(),
            })?;

        tracing::Span::current().record("s3.upload_id", upload_id.as_str());
        Ok(upload_id)
    }

    /// Send the buffered chunk as the next part.
    #[tracing::instrument(
        name = "s3.upload_part",
        skip(self),
        fields(
            s3.bucket = %self.bucket,
            s3.key = %self.key,
            s3.part_number = self.parts.len() + 1,
            upload.bytes = self.chunk.len()
        ),
        err
    )]
    async fn upload_part(&mut self) -> Result<(), StoreError> {
        let part_number = self.parts.len() + 1;
        if part_number > MAX_PARTS {
            return Err(StoreError::PartLimit {
                key: self.key.clone(),
                max_parts: MAX_PARTS,
                chunk_size: self.chunk_size,
            });
        }

        let upload_id = match &self.upload_id {
            Some(id) => id.clone(),
            None => {
                let id = self.create_multipart().await?;
                self.upload_id = Some(id.clone());
                id
            }
        };

        let body = self.take_chunk();
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .part_number(part_number as i32)
            .body(ByteStream::from(body))
            .customize()
            .config_override(self.overrides())
            .send()
            .await
            .map_err(|e| request_error("UploadPart", &self.key, e))?;

        self.parts.push(
            CompletedPart::builder()
                .part_number(part_number as i32)
                .set_e_tag(output.e_tag().map(String::from))
                .build(),
        );
        Ok(())
    }

    #[tracing::instrument(
        name = "s3.complete_multipart_upload",
        skip(self),
        fields(s3.bucket = %self.bucket, s3.key = %self.key, parts_count = self.parts.len()),
        err
    )]
    async fn complete(&mut self, upload_id: &str) -> Result<(), StoreError> {
        let parts = std::mem::take(&mut self.parts);
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .customize()
            .config_override(self.overrides())
            .send()
            .await
            .map_err(|e| request_error("CompleteMultipartUpload", &self.key, e))?;
        Ok(())
    }

    async fn abort_multipart(&self) {
        let Some(upload_id) = &self.upload_id else {
            return;
        };
        let result = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!(
                s3.key = %self.key,
                upload_id = %upload_id,
                error = %DisplayErrorContext(&e),
                "Failed to abort multipart upload"
            );
        }
    }

    async fn finish(&mut self) -> Result<(), StoreError> {
        let Some(upload_id) = self.upload_id.clone() else {
            let body = self.take_chunk();
            return self.put_single(body).await;
        };

        if !self.chunk.is_empty() {
            self.upload_part().await?;
        }
        self.complete(&upload_id).await
    }
}

#[async_trait]
impl ObjectWriter for S3Writer {
    async fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        let mut remaining = data;
        while !remaining.is_empty() {
            if self.chunk.capacity() == 0 {
                self.chunk.reserve(self.chunk_size);
            }
            let room = self.chunk_size - self.chunk.len();
            let (head, tail) = remaining.split_at(room.min(remaining.len()));
            self.chunk.extend_from_slice(head);
            remaining = tail;

            if self.chunk.len() == self.chunk_size {
                self.upload_part().await?;
            }
        }
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        let result = this.finish().await;
        if result.is_err() {
            this.abort_multipart().await;
        }
        result
    }

    async fn abort(self: Box<Self>) {
        self.abort_multipart().await;
    }
}
