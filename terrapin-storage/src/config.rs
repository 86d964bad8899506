//! Storage backend configuration and validation

use serde::{Deserialize, Serialize};

use crate::driver::{StorageError, StorageResult};

/// Backend discriminator for the storage configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriverType {
    #[default]
    S3,
    Local,
}

/// Storage backend configuration
///
/// Constructed once per request from the inbound payload and immutable
/// after validation. Fields a payload may omit are `Option`, so an absent
/// value is distinguishable from an intentionally empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub driver: StorageDriverType,
    /// S3 bucket name
    pub bucket: Option<String>,
    /// Prefix under which state objects live
    pub bucket_path: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region_name: Option<String>,
    /// Custom endpoint for S3-compatible stores
    pub endpoint: Option<String>,
    /// Server-side encryption on upload (default: true)
    pub encrypt: Option<bool>,
    /// Base directory for the local driver
    pub base_path: Option<String>,
}

impl StorageConfig {
    /// Default S3 region when none is configured
    pub const DEFAULT_REGION: &'static str = "us-east-1";

    /// Validate that every required field for the selected driver is present.
    ///
    /// Pure: performs no network access, so callers can surface
    /// configuration errors before any driver is constructed.
    pub fn validate(&self) -> StorageResult<()> {
        let mut missing = Vec::new();

        match self.driver {
            StorageDriverType::S3 => {
                if absent(&self.bucket) {
                    missing.push("storage.bucket");
                }
                if absent(&self.bucket_path) {
                    missing.push("storage.bucket_path");
                }
                if absent(&self.access_key_id) {
                    missing.push("storage.access_key_id");
                }
                if absent(&self.secret_access_key) {
                    missing.push("storage.secret_access_key");
                }
            }
            StorageDriverType::Local => {
                if absent(&self.base_path) {
                    missing.push("storage.base_path");
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            let quoted: Vec<String> = missing.iter().map(|field| format!("'{field}'")).collect();
            Err(StorageError::configuration(format!(
                "Missing fields: {}",
                quoted.join(", ")
            )))
        }
    }

    /// Return a new configuration with the given credentials bound in.
    ///
    /// Credential injection produces a fully-formed value rather than
    /// mutating in place, so validation always runs on the final
    /// configuration.
    pub fn with_credentials(
        &self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(secret_access_key.into()),
            session_token,
            ..self.clone()
        }
    }

    /// The configured region, or the default
    pub fn region(&self) -> &str {
        self.region_name.as_deref().unwrap_or(Self::DEFAULT_REGION)
    }

    /// Whether uploads request server-side encryption
    pub fn encrypt_enabled(&self) -> bool {
        self.encrypt.unwrap_or(true)
    }
}

fn absent(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(str::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_config() -> StorageConfig {
        StorageConfig {
            driver: StorageDriverType::S3,
            bucket: Some("state-bucket".to_string()),
            bucket_path: Some("terraform".to_string()),
            access_key_id: Some("AKIA123".to_string()),
            secret_access_key: Some("secret".to_string()),
            ..StorageConfig::default()
        }
    }

    #[test]
    fn test_s3_config_valid() {
        assert!(s3_config().validate().is_ok());
    }

    #[test]
    fn test_s3_config_missing_fields() {
        let config = StorageConfig {
            driver: StorageDriverType::S3,
            bucket: Some("state-bucket".to_string()),
            ..StorageConfig::default()
        };

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'storage.bucket_path'"));
        assert!(message.contains("'storage.access_key_id'"));
        assert!(message.contains("'storage.secret_access_key'"));
        assert!(!message.contains("'storage.bucket'"));
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let mut config = s3_config();
        config.bucket = Some(String::new());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'storage.bucket'"));
    }

    #[test]
    fn test_local_config_requires_base_path() {
        let config = StorageConfig {
            driver: StorageDriverType::Local,
            ..StorageConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'storage.base_path'"));

        let config = StorageConfig {
            driver: StorageDriverType::Local,
            base_path: Some("/tmp/state".to_string()),
            ..StorageConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_credentials_returns_new_config() {
        let config = StorageConfig {
            driver: StorageDriverType::S3,
            bucket: Some("state-bucket".to_string()),
            bucket_path: Some("terraform".to_string()),
            ..StorageConfig::default()
        };
        assert!(config.validate().is_err());

        let injected = config.with_credentials("AKIA123", "secret", Some("token".to_string()));
        assert!(injected.validate().is_ok());
        assert_eq!(injected.session_token.as_deref(), Some("token"));

        // the source configuration is untouched
        assert!(config.access_key_id.is_none());
    }

    #[test]
    fn test_driver_discriminator_parses() {
        let config: StorageConfig = serde_json::from_str(r#"{"driver": "local"}"#).unwrap();
        assert_eq!(config.driver, StorageDriverType::Local);

        // the discriminator defaults to S3 when omitted
        let config: StorageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.driver, StorageDriverType::S3);

        // unknown backends are rejected at parse time
        assert!(serde_json::from_str::<StorageConfig>(r#"{"driver": "azure"}"#).is_err());
    }

    #[test]
    fn test_region_default() {
        assert_eq!(s3_config().region(), StorageConfig::DEFAULT_REGION);

        let mut config = s3_config();
        config.region_name = Some("eu-west-1".to_string());
        assert_eq!(config.region(), "eu-west-1");
    }
}
