//! Storage driver implementations and factory

mod local;
mod s3;

pub use local::LocalDriver;
pub use s3::S3Driver;

use crate::config::{StorageConfig, StorageDriverType};
use crate::driver::{StorageDriver, StorageResult};

/// Build the storage driver selected by the configuration.
///
/// The configuration is validated first, so nothing is constructed (and no
/// network is touched) for an incomplete configuration. The discriminator
/// is a closed enum; unknown backends are rejected when the configuration
/// is parsed.
pub async fn build_driver(config: &StorageConfig) -> StorageResult<Box<dyn StorageDriver>> {
    config.validate()?;
    match config.driver {
        StorageDriverType::S3 => {
            let driver = S3Driver::from_config(config).await?;
            Ok(Box::new(driver))
        }
        StorageDriverType::Local => {
            let driver = LocalDriver::from_config(config)?;
            Ok(Box::new(driver))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::StorageError;

    #[tokio::test]
    async fn test_incomplete_config_fails_before_construction() {
        let config = StorageConfig {
            driver: StorageDriverType::S3,
            bucket: Some("state-bucket".to_string()),
            ..StorageConfig::default()
        };

        let err = build_driver(&config).await.err().unwrap();
        assert!(matches!(err, StorageError::Configuration(_)));
        assert!(err.to_string().contains("'storage.bucket_path'"));
    }

    #[tokio::test]
    async fn test_local_driver_builds() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            driver: StorageDriverType::Local,
            base_path: Some(dir.path().display().to_string()),
            ..StorageConfig::default()
        };

        let driver = build_driver(&config).await.unwrap();
        assert!(!driver.exists("prod.tfstate").await.unwrap());
    }
}
