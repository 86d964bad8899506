//! Error taxonomy for the resource entry points

use thiserror::Error;

use terrapin_state::TerraformError;
use terrapin_storage::StorageError;

use crate::authentication::AuthError;

/// Fatal request errors surfaced to the caller.
///
/// Nothing is swallowed on the way up; the only contextual
/// reinterpretation is `StateNotFound`, which the fetch flow raises when
/// absence is not a legitimate "nothing to do" outcome.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Malformed inbound version
    #[error("Failed to validate provided version: {0}")]
    Version(String),

    /// Vault configuration or credential retrieval failure
    #[error("Failed to resolve credentials: {0}")]
    Authentication(#[from] AuthError),

    /// Storage configuration or backend failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// State file absent where the request required it
    #[error(
        "State file does not exist with key '{key}'.\n\
         If you intended to run the `destroy` action, set `params.action: destroy`."
    )]
    StateNotFound { key: String },

    /// The terraform collaborator failed
    #[error(transparent)]
    Terraform(#[from] TerraformError),

    /// Malformed request payload
    #[error("Failed to parse request: {0}")]
    Request(serde_json::Error),

    /// Response or sidecar serialization failure
    #[error("Failed to encode output: {0}")]
    Encode(serde_json::Error),

    /// Local file handling around the request
    #[error("Failed to {context} '{path}': {source}")]
    Io {
        context: &'static str,
        path: String,
        source: std::io::Error,
    },
}

impl ResourceError {
    /// Create an I/O error with the offending path
    pub fn io(context: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }
}
