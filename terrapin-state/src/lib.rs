//! Terrapin state management
//!
//! Binds a logical state-file identity (an environment name) to its
//! physical object keys — including the tainted quarantine counterpart —
//! and wraps the Terraform executable used to read materialized state.

pub mod state_file;
pub mod terraform;

// Re-export main types for convenience
pub use state_file::{RemoteKey, StateFile, env_name_of};
pub use terraform::{Client, TerraformError, TerraformOutputs, TerraformResult};
