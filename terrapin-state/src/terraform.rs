//! Terraform binary collaborator
//!
//! Wraps the `terraform` executable for the two read-only calls the fetch
//! flow needs: structured output extraction from a state file, and the
//! tool version string.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::process::Output;

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from invoking the terraform binary
#[derive(Debug, Error)]
pub enum TerraformError {
    #[error("Failed to run terraform: {0}")]
    Io(#[from] std::io::Error),

    #[error("terraform {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("Failed to parse terraform output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for terraform invocations
pub type TerraformResult<T> = Result<T, TerraformError>;

/// Placeholder emitted for values marked sensitive in the state
pub const SENSITIVE_MASK: &str = "<sensitive>";

/// A single output value as reported by `terraform output -json`
#[derive(Debug, Clone, Deserialize)]
pub struct OutputValue {
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// The full set of outputs extracted from a state file
#[derive(Debug, Clone, Default)]
pub struct TerraformOutputs(BTreeMap<String, OutputValue>);

impl TerraformOutputs {
    /// Parse the JSON document `terraform output -json` prints
    pub fn from_json(raw: &str) -> TerraformResult<Self> {
        let parsed: BTreeMap<String, OutputValue> = serde_json::from_str(raw)?;
        Ok(Self(parsed))
    }

    /// Output values as raw JSON, sensitive values included
    pub fn raw(&self) -> BTreeMap<String, serde_json::Value> {
        self.0
            .iter()
            .map(|(name, output)| (name.clone(), output.value.clone()))
            .collect()
    }

    /// Output values as display strings, sensitive values masked
    pub fn sanitized(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(name, output)| {
                let value = if output.sensitive {
                    SENSITIVE_MASK.to_string()
                } else {
                    display_value(&output.value)
                };
                (name.clone(), value)
            })
            .collect()
    }
}

/// Render an output value the way it reads in metadata: bare strings stay
/// bare, everything else is serialized JSON.
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Client for the terraform executable
pub struct Client {
    state_path: PathBuf,
    output_module: Option<String>,
    env: HashMap<String, String>,
}

impl Client {
    /// Name of the executable, looked up on PATH
    pub const BINARY: &'static str = "terraform";

    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            output_module: None,
            env: HashMap::new(),
        }
    }

    /// Restrict output extraction to a single module
    pub fn with_output_module(mut self, module: Option<String>) -> Self {
        self.output_module = module;
        self
    }

    /// Extra environment variables for every invocation
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Extract the structured outputs from the state file
    pub async fn output(&self) -> TerraformResult<TerraformOutputs> {
        let mut args = vec![
            "output".to_string(),
            "-json".to_string(),
            format!("-state={}", self.state_path.display()),
        ];
        if let Some(module) = &self.output_module {
            args.push(format!("-module={module}"));
        }
        let stdout = self.run(&args).await?;
        TerraformOutputs::from_json(&stdout)
    }

    /// The tool version string, e.g. `Terraform v1.5.7`
    pub async fn version(&self) -> TerraformResult<String> {
        let stdout = self.run(&["version".to_string()]).await?;
        Ok(parse_version_output(&stdout))
    }

    async fn run(&self, args: &[String]) -> TerraformResult<String> {
        debug!(?args, "running terraform");
        let output = Command::new(Self::BINARY)
            .args(args)
            .envs(&self.env)
            .output()
            .await?;
        command_stdout(&args[0], output)
    }
}

/// First line of `terraform version` output
fn parse_version_output(stdout: &str) -> String {
    stdout.lines().next().unwrap_or("").trim().to_string()
}

fn command_stdout(command: &str, output: Output) -> TerraformResult<String> {
    if !output.status.success() {
        return Err(TerraformError::Command {
            command: command.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT_JSON: &str = r#"{
        "vpc_id": {"sensitive": false, "type": "string", "value": "vpc-123"},
        "db_password": {"sensitive": true, "type": "string", "value": "hunter2"},
        "subnet_ids": {"sensitive": false, "type": "list", "value": ["subnet-1", "subnet-2"]}
    }"#;

    #[test]
    fn test_outputs_raw_keeps_sensitive_values() {
        let outputs = TerraformOutputs::from_json(OUTPUT_JSON).unwrap();
        let raw = outputs.raw();

        assert_eq!(raw["vpc_id"], serde_json::json!("vpc-123"));
        assert_eq!(raw["db_password"], serde_json::json!("hunter2"));
        assert_eq!(raw["subnet_ids"], serde_json::json!(["subnet-1", "subnet-2"]));
    }

    #[test]
    fn test_outputs_sanitized_masks_sensitive_values() {
        let outputs = TerraformOutputs::from_json(OUTPUT_JSON).unwrap();
        let sanitized = outputs.sanitized();

        assert_eq!(sanitized["vpc_id"], "vpc-123");
        assert_eq!(sanitized["db_password"], SENSITIVE_MASK);
        // non-string values render as JSON
        assert_eq!(sanitized["subnet_ids"], r#"["subnet-1","subnet-2"]"#);
    }

    #[test]
    fn test_outputs_order_is_deterministic() {
        let outputs = TerraformOutputs::from_json(OUTPUT_JSON).unwrap();
        let names: Vec<_> = outputs.sanitized().into_keys().collect();
        assert_eq!(names, vec!["db_password", "subnet_ids", "vpc_id"]);
    }

    #[test]
    fn test_malformed_output_is_an_error() {
        assert!(TerraformOutputs::from_json("not json").is_err());
    }

    #[test]
    fn test_parse_version_output() {
        let stdout = "Terraform v1.5.7\non linux_amd64\n";
        assert_eq!(parse_version_output(stdout), "Terraform v1.5.7");
        assert_eq!(parse_version_output(""), "");
    }
}
