//! In entry point: materialize a state version

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use terrapin_state::{StateFile, terraform};
use terrapin_storage::build_driver;

use crate::authentication::{AwsCredentials, resolve_credentials};
use crate::error::ResourceError;
use crate::models::{Action, InRequest, InResponse, MetadataField, Version};

/// File name of the environment-name sidecar
const NAME_FILE: &str = "name";
/// File name of the raw-outputs sidecar
const METADATA_FILE: &str = "metadata";
/// Local name of the downloaded state file and of the optional sidecar copy
const STATE_FILE_NAME: &str = "terraform.tfstate";

/// Runner for the in (fetch) flow
#[derive(Debug)]
pub struct Runner {
    /// Directory the sidecar files are written into
    pub output_dir: PathBuf,
    /// Parent for the request-scoped download directory
    pub work_root: PathBuf,
}

impl Runner {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            work_root: std::env::temp_dir(),
        }
    }

    /// Materialize the requested version: probe taint, download the state
    /// file, extract outputs, and assemble the response metadata.
    pub async fn run(&self, req: InRequest) -> Result<InResponse, ResourceError> {
        req.version.validate()?;
        let env_name = req.version.env_name.clone();

        let name_path = self.output_dir.join(NAME_FILE);
        fs::write(&name_path, &env_name).map_err(|e| {
            ResourceError::io("create name file at path", name_path.display().to_string(), e)
        })?;

        let credentials = resolve_credentials(req.source.vault.as_ref()).await?;
        let storage = match &credentials {
            Some(creds) => creds.apply_to(&req.source.storage),
            None => req.source.storage.clone(),
        };
        let driver = build_driver(&storage).await?;

        // Scoped download directory, removed on every exit path when the
        // guard drops
        let work_dir = tempfile::Builder::new()
            .prefix("terrapin-in")
            .tempdir_in(&self.work_root)
            .map_err(|e| {
                ResourceError::io("create tmp dir at", self.work_root.display().to_string(), e)
            })?;
        let local_path = work_dir.path().join(STATE_FILE_NAME);

        let mut state_file = StateFile::new(driver.as_ref(), &env_name, &local_path);
        if state_file.exists_as_tainted().await? {
            info!(env = %env_name, "state file is marked tainted");
            state_file = state_file.with_taint();
        }

        if !state_file.exists().await? {
            if req.version.is_plan() || req.params.action == Some(Action::Destroy) {
                // Nothing to materialize: planning against an environment
                // that was never applied, or nothing left to destroy
                return Ok(InResponse {
                    version: req.version,
                    metadata: Vec::new(),
                });
            }
            return Err(ResourceError::StateNotFound {
                key: state_file.remote_key().as_str().to_string(),
            });
        }

        let storage_version = state_file.download().await?;
        let version = Version::from_storage(&storage_version);

        let client = terraform::Client::new(&local_path)
            .with_output_module(req.params.output_module.clone())
            .with_env(terraform_env(req.source.env.as_ref(), credentials.as_ref()));

        let outputs = client.output().await?;

        let metadata_path = self.output_dir.join(METADATA_FILE);
        let metadata_file = fs::File::create(&metadata_path).map_err(|e| {
            ResourceError::io(
                "create output file at path",
                metadata_path.display().to_string(),
                e,
            )
        })?;
        serde_json::to_writer_pretty(metadata_file, &outputs.raw())
            .map_err(ResourceError::Encode)?;

        let mut metadata: Vec<MetadataField> = outputs
            .sanitized()
            .into_iter()
            .map(|(name, value)| MetadataField { name, value })
            .collect();

        let tool_version = client.version().await?;
        metadata.push(MetadataField {
            name: "terraform_version".to_string(),
            value: tool_version,
        });

        if req.params.output_statefile {
            let dest = self.output_dir.join(STATE_FILE_NAME);
            fs::copy(&local_path, &dest).map_err(|e| {
                ResourceError::io("copy state file to", dest.display().to_string(), e)
            })?;
        }

        info!(env = %env_name, key = state_file.remote_key().as_str(), "fetched state version");
        Ok(InResponse { version, metadata })
    }
}

/// Environment for the terraform collaborator: source-supplied variables
/// with resolved credentials merged over them.
fn terraform_env(
    source_env: Option<&HashMap<String, String>>,
    credentials: Option<&AwsCredentials>,
) -> HashMap<String, String> {
    let mut env = source_env.cloned().unwrap_or_default();
    if let Some(creds) = credentials {
        env.insert("AWS_ACCESS_KEY_ID".to_string(), creds.access_key_id.clone());
        env.insert("TF_VAR_access_key".to_string(), creds.access_key_id.clone());
        env.insert(
            "AWS_SECRET_ACCESS_KEY".to_string(),
            creds.secret_access_key.clone(),
        );
        env.insert(
            "TF_VAR_secret_key".to_string(),
            creds.secret_access_key.clone(),
        );
        if let Some(token) = &creds.session_token {
            env.insert("AWS_SESSION_TOKEN".to_string(), token.clone());
            env.insert("TF_VAR_session_token".to_string(), token.clone());
        }
    }
    env
}
