//! Check entry point: report new state versions

use tracing::info;

use terrapin_storage::{build_driver, resolver};

use crate::authentication::resolve_credentials;
use crate::error::ResourceError;
use crate::models::{CheckRequest, Version};

/// Runner for the check flow
#[derive(Debug, Default)]
pub struct Runner;

impl Runner {
    /// Decide whether the storage backend holds a version newer than the
    /// caller's last known one.
    ///
    /// Read-only: never downloads content or writes to storage. Emits at
    /// most the single latest version.
    pub async fn run(&self, req: CheckRequest) -> Result<Vec<Version>, ResourceError> {
        let baseline = match &req.version {
            Some(version) => {
                version.validate()?;
                Some(version.last_modified_time()?)
            }
            None => None,
        };

        let credentials = resolve_credentials(req.source.vault.as_ref()).await?;
        let storage = match &credentials {
            Some(creds) => creds.apply_to(&req.source.storage),
            None => req.source.storage.clone(),
        };
        let driver = build_driver(&storage).await?;

        let latest = driver.latest_version().await?;
        let versions: Vec<Version> = resolver::new_versions(baseline, latest)
            .iter()
            .map(Version::from_storage)
            .collect();

        info!(count = versions.len(), "check complete");
        Ok(versions)
    }
}
