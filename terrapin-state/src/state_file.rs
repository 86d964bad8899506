//! Versioned state-file identity and taint transitions

use std::path::{Path, PathBuf};

use tracing::debug;

use terrapin_storage::{StorageDriver, StorageObjectVersion, StorageResult};

/// Suffix of a normal state object key
pub const STATE_SUFFIX: &str = ".tfstate";
/// Suffix appended to a state object key to quarantine it
pub const TAINT_SUFFIX: &str = ".tainted";

/// Physical key of a state object: the normal key or its tainted
/// counterpart.
///
/// The tainted form is the normal key with a fixed `.tainted` suffix
/// (`prod.tfstate` -> `prod.tfstate.tainted`), so the two can never
/// collide. The transition is one-way within a request; a fresh request
/// starts from `Normal` again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteKey {
    Normal(String),
    Tainted(String),
}

impl RemoteKey {
    /// The normal key for an environment name
    pub fn for_env(env_name: &str) -> Self {
        Self::Normal(format!("{env_name}{STATE_SUFFIX}"))
    }

    /// The tainted counterpart of this key
    pub fn with_taint(&self) -> Self {
        match self {
            Self::Normal(key) => Self::Tainted(format!("{key}{TAINT_SUFFIX}")),
            Self::Tainted(key) => Self::Tainted(key.clone()),
        }
    }

    /// The key as it appears in storage
    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal(key) | Self::Tainted(key) => key,
        }
    }

    pub fn is_tainted(&self) -> bool {
        matches!(self, Self::Tainted(_))
    }

    /// The environment name the key refers to
    pub fn env_name(&self) -> &str {
        env_name_of(self.as_str())
    }
}

/// Derive an environment name from an object key by stripping any leading
/// path and the taint and state suffixes.
pub fn env_name_of(key: &str) -> &str {
    let base = key.rsplit('/').next().unwrap_or(key);
    let base = base.strip_suffix(TAINT_SUFFIX).unwrap_or(base);
    base.strip_suffix(STATE_SUFFIX).unwrap_or(base)
}

/// A logical state file bound to a storage driver for one request.
///
/// Borrows the driver: the orchestrator owns it, the state file has
/// request-scoped shared access. Operations target the current working
/// key only; a state file converted to tainted never falls back to the
/// normal key.
#[derive(Clone)]
pub struct StateFile<'d> {
    driver: &'d dyn StorageDriver,
    local_path: PathBuf,
    remote_key: RemoteKey,
}

impl<'d> StateFile<'d> {
    /// Create a state file for an environment, in Normal mode
    pub fn new(
        driver: &'d dyn StorageDriver,
        env_name: &str,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            driver,
            local_path: local_path.into(),
            remote_key: RemoteKey::for_env(env_name),
        }
    }

    /// The current working key
    pub fn remote_key(&self) -> &RemoteKey {
        &self.remote_key
    }

    /// The local download destination
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Whether a tainted counterpart of this state file exists.
    ///
    /// Pure query; does not change which key this state file targets.
    pub async fn exists_as_tainted(&self) -> StorageResult<bool> {
        self.driver
            .exists(self.remote_key.with_taint().as_str())
            .await
    }

    /// A copy of this state file whose working key is the tainted form.
    ///
    /// All subsequent operations on the copy target only the tainted key.
    pub fn with_taint(&self) -> Self {
        Self {
            remote_key: self.remote_key.with_taint(),
            ..self.clone()
        }
    }

    /// Whether an object exists at the current working key
    pub async fn exists(&self) -> StorageResult<bool> {
        self.driver.exists(self.remote_key.as_str()).await
    }

    /// Download the object at the working key to the local path.
    ///
    /// An object that vanished between the existence check and this call
    /// surfaces as a `NotFound` error; there is no fallback to another key.
    pub async fn download(&self) -> StorageResult<StorageObjectVersion> {
        debug!(key = self.remote_key.as_str(), "downloading state file");
        self.driver
            .download(self.remote_key.as_str(), &self.local_path)
            .await
    }

    /// The most recent version under the driver's configured prefix, or
    /// `None` when no state has ever been written.
    pub async fn latest_version(&self) -> StorageResult<Option<StorageObjectVersion>> {
        self.driver.latest_version().await
    }
}
