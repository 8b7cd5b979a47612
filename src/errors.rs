//! Error Types
//!
//! Typed failures raised while running guarded computations. Task-level
//! errors are converted into [`FailureKind`](crate::execution::FailureKind)
//! at the runner boundary and never escape a batch.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which guarded resource tripped its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Memory,
    Cpu,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Cpu => write!(f, "CPU"),
        }
    }
}

/// Raised by a checkpoint whose sample is strictly above a configured limit.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{resource} usage {observed:.1}% exceeded limit of {limit:.1}%")]
pub struct ResourceLimitExceeded {
    pub resource: ResourceKind,
    pub observed: f64,
    pub limit: f64,
}

/// Errors a task body can return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error(transparent)]
    ResourceLimit(#[from] ResourceLimitExceeded),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Arithmetic overflow at step {step}")]
    Overflow { step: usize },

    #[error("Task cancelled")]
    Cancelled,
}

/// Infrastructure failures while launching or talking to a worker.
#[derive(Debug, Error)]
pub enum WorkerPoolError {
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Worker I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker protocol error: {0}")]
    Protocol(String),

    #[error("Worker crashed: {0}")]
    WorkerCrashed(String),
}

impl From<serde_json::Error> for WorkerPoolError {
    fn from(e: serde_json::Error) -> Self {
        WorkerPoolError::Protocol(e.to_string())
    }
}

/// Errors raised while loading a batch definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read batch file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse batch YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid resource limit {name} = {value}: must be between 0 and 100")]
    InvalidLimit { name: &'static str, value: f64 },

    #[error("Batch validation failed:\n{0}")]
    Validation(String),
}

/// Batch-level errors, raised before anything is scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("Duplicate task id: '{0}'")]
    DuplicateTaskId(String),
}
