//! Request and response models for the resource protocol

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use terrapin_state::env_name_of;
use terrapin_storage::{StorageConfig, StorageObjectVersion};

use crate::authentication::VaultConfiguration;
use crate::error::ResourceError;

/// Wire format for version timestamps
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The externally visible version token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub last_modified: String,
    pub env_name: String,
    /// Marks an intermediate, not-yet-applied plan artifact
    #[serde(default, skip_serializing_if = "is_false")]
    pub plan_only: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Version {
    /// Derive a version from a storage object version
    pub fn from_storage(storage: &StorageObjectVersion) -> Self {
        Self {
            last_modified: storage.last_modified.format(TIME_FORMAT).to_string(),
            env_name: env_name_of(&storage.key).to_string(),
            plan_only: false,
        }
    }

    /// Structural validation: a well-formed timestamp and a non-empty
    /// environment name. Malformed input is a fatal request error, never
    /// treated as "no version".
    pub fn validate(&self) -> Result<(), ResourceError> {
        self.last_modified_time()?;
        if self.env_name.is_empty() {
            return Err(ResourceError::Version(
                "missing field 'env_name'".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse the wire timestamp
    pub fn last_modified_time(&self) -> Result<DateTime<Utc>, ResourceError> {
        NaiveDateTime::parse_from_str(&self.last_modified, TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| {
                ResourceError::Version(format!(
                    "malformed 'last_modified' value '{}': {}",
                    self.last_modified, e
                ))
            })
    }

    /// Whether this version is a plan artifact rather than applied state
    pub fn is_plan(&self) -> bool {
        self.plan_only
    }
}

/// Inbound source configuration shared by check and in
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    /// Dynamic-secrets configuration; absent means the storage
    /// configuration carries static credentials
    pub vault: Option<VaultConfiguration>,
    pub storage: StorageConfig,
    /// Extra environment passed through to the terraform collaborator
    pub env: Option<HashMap<String, String>>,
}

/// Request payload for the check entry point
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckRequest {
    pub source: Source,
    /// The caller's last known version, if any
    pub version: Option<Version>,
}

/// Request payload for the in (fetch) entry point
#[derive(Debug, Clone, Deserialize)]
pub struct InRequest {
    #[serde(default)]
    pub source: Source,
    pub version: Version,
    #[serde(default)]
    pub params: GetParams,
}

/// Params controlling the fetch flow
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetParams {
    pub action: Option<Action>,
    /// Restrict output extraction to a single module
    pub output_module: Option<String>,
    /// Also emit the full state file into the output directory
    pub output_statefile: bool,
}

/// Destructive intent marker on a fetch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Destroy,
}

/// Response for the in entry point
#[derive(Debug, Clone, Serialize)]
pub struct InResponse {
    pub version: Version,
    pub metadata: Vec<MetadataField>,
}

/// One name/value metadata pair in a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub name: String,
    pub value: String,
}
