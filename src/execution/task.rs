//! Task Definition
//!
//! A [`TaskSpec`] fully describes one guarded computation: which body to
//! run, on what input, with which step budget and resource limits. Specs
//! are plain data so they can be shipped to isolated worker processes.

use serde::{Deserialize, Serialize};

use crate::algorithms::TaskKind;
use crate::monitoring::ResourceLimits;

/// Identifies a task within a batch; unique per batch.
pub type TaskId = String;

/// One independent unit of work.
///
/// # Example
///
/// ```
/// use mathsim::algorithms::TaskKind;
/// use mathsim::execution::TaskSpec;
/// use mathsim::monitoring::ResourceLimits;
///
/// let task = TaskSpec::keyed_by_input(TaskKind::Aliquot, 220)
///     .with_step_budget(10)
///     .with_limits(ResourceLimits::unlimited());
///
/// assert_eq!(task.id, "220");
/// assert_eq!(task.effective_step_budget(), 10);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub id: TaskId,
    pub kind: TaskKind,
    pub input: i64,

    /// Maximum checkpoints; the kind's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_budget: Option<usize>,

    #[serde(default)]
    pub limits: ResourceLimits,
}

impl TaskSpec {
    pub fn new(id: impl Into<TaskId>, kind: TaskKind, input: i64) -> Self {
        Self {
            id: id.into().trim().to_string(),
            kind,
            input,
            step_budget: None,
            limits: ResourceLimits::default(),
        }
    }

    /// Creates a task whose id is its input, for homogeneous batches.
    pub fn keyed_by_input(kind: TaskKind, input: i64) -> Self {
        Self::new(input.to_string(), kind, input)
    }

    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = Some(step_budget);
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn effective_step_budget(&self) -> usize {
        self.step_budget
            .unwrap_or_else(|| self.kind.default_step_budget())
    }
}
