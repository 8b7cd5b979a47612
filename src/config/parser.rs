//! Batch Parser
//!
//! Loads batch definitions from YAML files and validates them.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::errors::ConfigError;

use super::model::BatchConfig;
use super::validator::validate_batch;

/// Loads and validates a batch from a YAML file.
///
/// # Example
///
/// ```rust,no_run
/// use mathsim::config::load_batch;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let batch = load_batch("batch.yaml")?;
///     let outcomes = batch.orchestrator().run_all(batch.tasks())?;
///     println!("{} tasks finished", outcomes.len());
///     Ok(())
/// }
/// ```
pub fn load_batch(path: impl AsRef<Path>) -> Result<BatchConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading batch from: {}", path.display());

    let yaml_content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    parse_batch(&yaml_content)
}

/// Parses and validates a batch from YAML text.
pub fn parse_batch(yaml: &str) -> Result<BatchConfig, ConfigError> {
    let batch: BatchConfig = serde_yaml::from_str(yaml)?;

    info!(
        "Parsed {} tasks ({:?} pool, parallelism {})",
        batch.tasks.len(),
        batch.pool,
        batch.parallelism()
    );

    validate_batch(&batch)?;
    Ok(batch)
}
