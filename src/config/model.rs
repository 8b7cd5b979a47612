//! Batch Data Model
//!
//! # Example YAML Format
//!
//! ```yaml
//! pool: processes
//! parallelism: 4
//! timeout_secs: 30
//! limits:
//!   max_memory_percent: 90
//!   max_cpu_percent: 95
//! tasks:
//!   - id: amicable
//!     kind: aliquot
//!     input: 220
//!     step_budget: 10
//!
//!   - kind: factorize
//!     input: 84
//!     limits:
//!       max_cpu_percent: 100
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithms::TaskKind;
use crate::execution::{default_pool_size, Orchestrator, ProcessPool, TaskSpec, ThreadPool};
use crate::monitoring::ResourceLimits;

/// Which worker pool runs the batch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PoolFlavor {
    #[default]
    Threads,
    Processes,
}

/// One task as written in a batch file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskEntry {
    /// Defaults to the input's decimal form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub kind: TaskKind,

    pub input: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_budget: Option<usize>,

    /// Replaces the batch limits for this task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceLimits>,
}

impl TaskEntry {
    pub fn resolved_id(&self) -> String {
        match &self.id {
            Some(id) => id.trim().to_string(),
            None => self.input.to_string(),
        }
    }

    /// Builds the task, falling back to `batch_limits`.
    pub fn to_task(&self, batch_limits: ResourceLimits) -> TaskSpec {
        let mut task = TaskSpec::new(self.resolved_id(), self.kind, self.input)
            .with_limits(self.limits.unwrap_or(batch_limits));
        task.step_budget = self.step_budget;
        task
    }
}

/// A batch definition loaded from YAML.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BatchConfig {
    #[serde(default)]
    pub pool: PoolFlavor,

    /// Worker count; one per CPU when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub limits: ResourceLimits,

    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

impl BatchConfig {
    pub fn parallelism(&self) -> usize {
        self.parallelism.unwrap_or_else(default_pool_size)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Resolves every entry into a runnable task, in file order.
    pub fn tasks(&self) -> Vec<TaskSpec> {
        self.tasks
            .iter()
            .map(|entry| entry.to_task(self.limits))
            .collect()
    }

    /// Builds an orchestrator over the configured pool.
    pub fn orchestrator(&self) -> Orchestrator {
        let orchestrator = match self.pool {
            PoolFlavor::Threads => Orchestrator::new(ThreadPool::new(self.parallelism())),
            PoolFlavor::Processes => Orchestrator::new(ProcessPool::new(self.parallelism())),
        };

        match self.timeout() {
            Some(timeout) => orchestrator.with_timeout(timeout),
            None => orchestrator,
        }
    }
}
