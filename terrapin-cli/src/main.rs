//! Terraform remote-state resource entry points
//!
//! Each subcommand reads one JSON request from stdin and writes one JSON
//! response to stdout. Diagnostics go to stderr; stdout belongs to the
//! protocol.

mod authentication;
mod check;
mod error;
mod fetch;
mod models;

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::ResourceError;

#[derive(Parser)]
#[command(name = "terrapin")]
#[command(about = "Versioned Terraform remote-state resource", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report state versions newer than the last known one
    Check,
    /// Fetch a state version and extract its outputs
    In {
        /// Directory the resource writes its files into
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Check => run_check().await,
        Commands::In { output_dir } => run_in(output_dir).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_check() -> Result<(), ResourceError> {
    let req: models::CheckRequest = read_request()?;
    let versions = check::Runner.run(req).await?;
    write_response(&versions)
}

async fn run_in(output_dir: PathBuf) -> Result<(), ResourceError> {
    let req: models::InRequest = read_request()?;
    let response = fetch::Runner::new(output_dir).run(req).await?;
    write_response(&response)
}

fn read_request<T: serde::de::DeserializeOwned>() -> Result<T, ResourceError> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| ResourceError::io("read request from", "stdin", e))?;
    serde_json::from_str(&raw).map_err(ResourceError::Request)
}

fn write_response<T: serde::Serialize>(response: &T) -> Result<(), ResourceError> {
    let out = serde_json::to_string(response).map_err(ResourceError::Encode)?;
    println!("{out}");
    Ok(())
}
