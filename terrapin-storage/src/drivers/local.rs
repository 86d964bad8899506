//! Local filesystem storage driver
//!
//! Stores state objects as plain files under a base directory, with the
//! file modification time as the object version. Intended for development
//! and tests.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::StorageConfig;
use crate::driver::{StorageDriver, StorageError, StorageObjectVersion, StorageResult};

/// Filesystem-backed storage driver
pub struct LocalDriver {
    base_path: PathBuf,
}

impl LocalDriver {
    /// Create a new LocalDriver over a base directory
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create a LocalDriver from a validated configuration
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let base_path = config
            .base_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| StorageError::configuration("Missing fields: 'storage.base_path'"))?;
        Ok(Self::new(base_path))
    }

    /// Get the base directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

#[async_trait]
impl StorageDriver for LocalDriver {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.object_path(key).is_file())
    }

    async fn latest_version(&self) -> StorageResult<Option<StorageObjectVersion>> {
        if !self.base_path.is_dir() {
            return Ok(None);
        }

        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            StorageError::Io(format!(
                "Failed to read '{}': {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut latest: Option<StorageObjectVersion> = None;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::Io(e.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(key) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let modified = modified_time(&path)?;
            if latest.as_ref().is_none_or(|v| modified > v.last_modified) {
                latest = Some(StorageObjectVersion {
                    key: key.to_string(),
                    last_modified: modified,
                });
            }
        }
        Ok(latest)
    }

    async fn download(&self, key: &str, dest: &Path) -> StorageResult<StorageObjectVersion> {
        let path = self.object_path(key);
        if !path.is_file() {
            return Err(StorageError::not_found(key));
        }
        fs::copy(&path, dest).map_err(|e| {
            StorageError::Io(format!("Failed to copy '{}': {}", path.display(), e))
        })?;
        Ok(StorageObjectVersion {
            key: key.to_string(),
            last_modified: modified_time(&path)?,
        })
    }

    async fn upload(&self, key: &str, src: &Path) -> StorageResult<StorageObjectVersion> {
        fs::create_dir_all(&self.base_path).map_err(|e| {
            StorageError::Io(format!(
                "Failed to create '{}': {}",
                self.base_path.display(),
                e
            ))
        })?;
        let path = self.object_path(key);
        fs::copy(src, &path).map_err(|e| {
            StorageError::Io(format!("Failed to copy to '{}': {}", path.display(), e))
        })?;
        Ok(StorageObjectVersion {
            key: key.to_string(),
            last_modified: modified_time(&path)?,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.object_path(key);
        if !path.is_file() {
            return Err(StorageError::not_found(key));
        }
        fs::remove_file(&path).map_err(|e| {
            StorageError::Io(format!("Failed to remove '{}': {}", path.display(), e))
        })?;
        Ok(())
    }
}

fn modified_time(path: &Path) -> StorageResult<DateTime<Utc>> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| StorageError::Io(format!("Failed to stat '{}': {}", path.display(), e)))?;
    Ok(DateTime::<Utc>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn set_modified(path: &Path, secs_after_epoch: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_download_round_trip() {
        let store = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = LocalDriver::new(store.path());

        let src = scratch.path().join("state.json");
        fs::write(&src, b"{\"serial\": 1}").unwrap();

        assert!(!driver.exists("prod.tfstate").await.unwrap());
        driver.upload("prod.tfstate", &src).await.unwrap();
        assert!(driver.exists("prod.tfstate").await.unwrap());

        let dest = scratch.path().join("downloaded.json");
        let version = driver.download("prod.tfstate", &dest).await.unwrap();
        assert_eq!(version.key, "prod.tfstate");
        assert_eq!(fs::read(&dest).unwrap(), b"{\"serial\": 1}");
    }

    #[tokio::test]
    async fn test_download_missing_object_is_not_found() {
        let store = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = LocalDriver::new(store.path());

        let err = driver
            .download("prod.tfstate", &scratch.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { key } if key == "prod.tfstate"));
    }

    #[tokio::test]
    async fn test_latest_version_empty_store() {
        let store = tempdir().unwrap();
        let driver = LocalDriver::new(store.path());
        assert!(driver.latest_version().await.unwrap().is_none());

        // a base directory that does not exist yet is also just empty
        let driver = LocalDriver::new(store.path().join("missing"));
        assert!(driver.latest_version().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_version_picks_newest() {
        let store = tempdir().unwrap();
        let driver = LocalDriver::new(store.path());

        fs::write(store.path().join("prod.tfstate"), b"{}").unwrap();
        fs::write(store.path().join("staging.tfstate"), b"{}").unwrap();
        set_modified(&store.path().join("prod.tfstate"), 2_000);
        set_modified(&store.path().join("staging.tfstate"), 1_000);

        let latest = driver.latest_version().await.unwrap().unwrap();
        assert_eq!(latest.key, "prod.tfstate");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = tempdir().unwrap();
        let driver = LocalDriver::new(store.path());

        fs::write(store.path().join("prod.tfstate"), b"{}").unwrap();
        driver.delete("prod.tfstate").await.unwrap();
        assert!(!driver.exists("prod.tfstate").await.unwrap());

        let err = driver.delete("prod.tfstate").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
