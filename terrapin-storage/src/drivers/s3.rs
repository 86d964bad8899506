//! S3 storage driver

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::StorageConfig;
use crate::driver::{StorageDriver, StorageError, StorageObjectVersion, StorageResult};

/// S3-backed storage driver
///
/// Works against AWS S3 and S3-compatible stores (via a custom endpoint
/// with path-style addressing). Credentials are bound at construction.
pub struct S3Driver {
    client: Client,
    bucket: String,
    prefix: String,
    encrypt: bool,
}

impl S3Driver {
    /// Create a new S3Driver from a validated configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let bucket = require(config.bucket.as_deref(), "storage.bucket")?;
        let prefix = require(config.bucket_path.as_deref(), "storage.bucket_path")?;
        let access_key_id = require(config.access_key_id.as_deref(), "storage.access_key_id")?;
        let secret_access_key =
            require(config.secret_access_key.as_deref(), "storage.secret_access_key")?;

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            config.session_token.clone(),
            None,
            "terrapin-storage",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region().to_string()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        // S3-compatible stores require path-style addressing
        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);
        if config.endpoint.is_some() {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        Ok(Self {
            client,
            bucket,
            prefix: prefix.trim_matches('/').to_string(),
            encrypt: config.encrypt_enabled(),
        })
    }

    /// Get the bucket name
    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl StorageDriver for S3Driver {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(object_key(&self.prefix, key))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                if is_not_found_error(&err) {
                    Ok(false)
                } else {
                    Err(StorageError::Aws(err.to_string()))
                }
            }
        }
    }

    async fn latest_version(&self) -> StorageResult<Option<StorageObjectVersion>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&self.prefix)
            .into_paginator()
            .send();

        let mut latest: Option<StorageObjectVersion> = None;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StorageError::Aws(e.to_string()))?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                let relative = relative_key(&self.prefix, key);
                if relative.is_empty() {
                    // the prefix itself, listed as a directory marker
                    continue;
                }
                let modified = object
                    .last_modified()
                    .map(to_chrono)
                    .unwrap_or(DateTime::UNIX_EPOCH);
                if latest.as_ref().is_none_or(|v| modified > v.last_modified) {
                    latest = Some(StorageObjectVersion {
                        key: relative.to_string(),
                        last_modified: modified,
                    });
                }
            }
        }
        Ok(latest)
    }

    async fn download(&self, key: &str, dest: &Path) -> StorageResult<StorageObjectVersion> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key(&self.prefix, key))
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                return if is_not_found_error(&err) {
                    Err(StorageError::not_found(key))
                } else {
                    Err(StorageError::Aws(err.to_string()))
                };
            }
        };

        let last_modified = output
            .last_modified()
            .map(to_chrono)
            .unwrap_or(DateTime::UNIX_EPOCH);

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tokio::fs::write(dest, body.into_bytes())
            .await
            .map_err(|e| {
                StorageError::Io(format!("Failed to write '{}': {}", dest.display(), e))
            })?;

        debug!(key, "downloaded object");
        Ok(StorageObjectVersion {
            key: key.to_string(),
            last_modified,
        })
    }

    async fn upload(&self, key: &str, src: &Path) -> StorageResult<StorageObjectVersion> {
        let body = ByteStream::from_path(src).await.map_err(|e| {
            StorageError::Io(format!("Failed to read '{}': {}", src.display(), e))
        })?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key(&self.prefix, key))
            .body(body);
        if self.encrypt {
            request = request.server_side_encryption(ServerSideEncryption::Aes256);
        }
        request
            .send()
            .await
            .map_err(|e| StorageError::Aws(e.to_string()))?;

        // PutObject does not report a modification time; ask for it
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(object_key(&self.prefix, key))
            .send()
            .await
            .map_err(|e| StorageError::Aws(e.to_string()))?;
        let last_modified = head
            .last_modified()
            .map(to_chrono)
            .unwrap_or(DateTime::UNIX_EPOCH);

        Ok(StorageObjectVersion {
            key: key.to_string(),
            last_modified,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(object_key(&self.prefix, key))
            .send()
            .await
            .map_err(|e| StorageError::Aws(e.to_string()))?;
        Ok(())
    }
}

fn require(field: Option<&str>, name: &str) -> StorageResult<String> {
    match field {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(StorageError::configuration(format!(
            "Missing fields: '{name}'"
        ))),
    }
}

/// Full object key under the configured prefix
fn object_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

/// Key relative to the configured prefix
fn relative_key<'a>(prefix: &str, key: &'a str) -> &'a str {
    key.strip_prefix(prefix)
        .map(|k| k.trim_start_matches('/'))
        .unwrap_or(key)
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Check if an S3 error is a "not found" error
fn is_not_found_error<E: std::fmt::Debug>(err: &aws_sdk_s3::error::SdkError<E>) -> bool {
    // Check the raw HTTP response status
    if let Some(raw) = err.raw_response() {
        return raw.status().as_u16() == 404;
    }
    false
}
