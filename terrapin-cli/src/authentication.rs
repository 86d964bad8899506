//! Dynamic-secrets credential retrieval
//!
//! Exchanges a Vault token for short-lived AWS credentials by writing the
//! requested lease TTL to a dynamic-secrets endpoint. Lease renewal is not
//! managed here; each request fetches fresh credentials.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use terrapin_storage::StorageConfig;

/// Errors from credential retrieval
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Vault configuration error: {0}")]
    Configuration(String),

    #[error("Vault request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed Vault response: {0}")]
    Malformed(String),
}

/// Vault dynamic-secrets configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfiguration {
    pub address: String,
    pub secret_path: String,
    pub token: String,
    /// Lease duration in seconds
    pub ttl: u64,
}

impl VaultConfiguration {
    /// Validate that every required field is present
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut missing = Vec::new();
        if self.address.is_empty() {
            missing.push("vault.address");
        }
        if self.secret_path.is_empty() {
            missing.push("vault.secret_path");
        }
        if self.token.is_empty() {
            missing.push("vault.token");
        }
        if self.ttl == 0 {
            missing.push("vault.ttl");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            let quoted: Vec<String> = missing.iter().map(|field| format!("'{field}'")).collect();
            Err(AuthError::Configuration(format!(
                "Missing fields: {}",
                quoted.join(", ")
            )))
        }
    }
}

/// Short-lived AWS credentials returned by the secrets engine
#[derive(Debug, Clone, Default)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// A new storage configuration with these credentials bound in
    pub fn apply_to(&self, config: &StorageConfig) -> StorageConfig {
        config.with_credentials(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            self.session_token.clone(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct SecretResponse {
    #[serde(default)]
    data: SecretData,
}

#[derive(Debug, Default, Deserialize)]
struct SecretData {
    access_key: Option<String>,
    secret_key: Option<String>,
    security_token: Option<String>,
}

/// Resolve credentials when a dynamic-secrets configuration is present.
///
/// `None` in, `None` out: a source without a vault section uses whatever
/// static credentials the storage configuration carries.
pub async fn resolve_credentials(
    vault: Option<&VaultConfiguration>,
) -> Result<Option<AwsCredentials>, AuthError> {
    match vault {
        Some(config) => {
            config.validate()?;
            Ok(Some(fetch_aws_credentials(config).await?))
        }
        None => Ok(None),
    }
}

/// Retrieve short-lived AWS credentials from the configured endpoint.
///
/// Issues a write of `{"ttl": <seconds>}` to `{address}/v1/{secret_path}`
/// with the token in the `X-Vault-Token` header. TLS verification is
/// disabled; Vault endpoints reached from resource containers commonly
/// present self-signed certificates.
pub async fn fetch_aws_credentials(
    config: &VaultConfiguration,
) -> Result<AwsCredentials, AuthError> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?;

    let url = format!(
        "{}/v1/{}",
        config.address.trim_end_matches('/'),
        config.secret_path.trim_start_matches('/')
    );
    debug!(%url, "requesting credentials");

    let response = client
        .put(&url)
        .header("X-Vault-Token", &config.token)
        .json(&serde_json::json!({ "ttl": config.ttl }))
        .send()
        .await?
        .error_for_status()?;

    let secret: SecretResponse = response.json().await?;
    let data = secret.data;

    let access_key_id = data
        .access_key
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AuthError::Malformed("response carries no 'access_key'".to_string()))?;
    let secret_access_key = data
        .secret_key
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AuthError::Malformed("response carries no 'secret_key'".to_string()))?;

    Ok(AwsCredentials {
        access_key_id,
        secret_access_key,
        session_token: data.security_token.filter(|value| !value.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault_config() -> VaultConfiguration {
        VaultConfiguration {
            address: "https://vault.example.com".to_string(),
            secret_path: "aws/creds/deploy".to_string(),
            token: "s.token".to_string(),
            ttl: 3600,
        }
    }

    #[test]
    fn test_vault_config_valid() {
        assert!(vault_config().validate().is_ok());
    }

    #[test]
    fn test_vault_config_missing_fields() {
        let config = VaultConfiguration {
            address: "https://vault.example.com".to_string(),
            ..VaultConfiguration::default()
        };

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'vault.secret_path'"));
        assert!(message.contains("'vault.token'"));
        assert!(message.contains("'vault.ttl'"));
        assert!(!message.contains("'vault.address'"));
    }

    #[tokio::test]
    async fn test_resolve_credentials_without_vault_section() {
        let credentials = resolve_credentials(None).await.unwrap();
        assert!(credentials.is_none());
    }

    #[tokio::test]
    async fn test_resolve_credentials_validates_before_any_request() {
        let err = resolve_credentials(Some(&VaultConfiguration::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn test_apply_to_produces_complete_config() {
        let credentials = AwsCredentials {
            access_key_id: "AKIA123".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: Some("token".to_string()),
        };

        let config = StorageConfig {
            bucket: Some("state-bucket".to_string()),
            bucket_path: Some("terraform".to_string()),
            ..StorageConfig::default()
        };
        assert!(config.validate().is_err());

        let injected = credentials.apply_to(&config);
        assert!(injected.validate().is_ok());
        assert_eq!(injected.access_key_id.as_deref(), Some("AKIA123"));
        assert_eq!(injected.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_secret_response_parses_partial_data() {
        let raw = r#"{"request_id": "x", "data": {"access_key": "AKIA123", "secret_key": "s"}}"#;
        let secret: SecretResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(secret.data.access_key.as_deref(), Some("AKIA123"));
        assert!(secret.data.security_token.is_none());
    }
}
