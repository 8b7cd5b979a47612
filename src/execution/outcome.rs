//! Task Outcomes
//!
//! Every submitted task ends in exactly one [`TaskOutcome`]. A batch's
//! outcomes are collected into an [`OutcomeSet`] keyed by task id; the set
//! has no meaningful order because tasks finish out of submission order.

use std::collections::hash_map;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ResourceKind, TaskError};
use crate::monitoring::ResourceLog;

use super::task::TaskId;

/// Why a task failed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureKind {
    /// A checkpoint sample was above a configured limit
    ResourceLimitExceeded {
        resource: ResourceKind,
        observed: f64,
        limit: f64,
    },
    /// The task body rejected its input
    InvalidInput,
    /// An intermediate value left the `u64` range
    Overflow,
    /// The task could not be launched or its worker died
    WorkerPool,
    /// The batch deadline passed before the task finished
    TimedOut,
    /// The task observed a cancellation request at a checkpoint
    Cancelled,
}

/// Terminal result of one task execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success {
        result: Vec<u64>,
        steps: usize,
        truncated: bool,
        log: ResourceLog,
    },
    Failure {
        kind: FailureKind,
        message: String,
        log: ResourceLog,
    },
}

impl TaskOutcome {
    /// A failure that happened outside the task body, with an empty log.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
            log: ResourceLog::new(),
        }
    }

    /// Converts a task body error into a failure outcome.
    ///
    /// Resource-limit failures keep the partial log up to and including
    /// the triggering sample. Rejected inputs carry an empty log.
    pub fn from_error(error: TaskError, log: ResourceLog) -> Self {
        let message = error.to_string();
        match error {
            TaskError::ResourceLimit(exceeded) => Self::Failure {
                kind: FailureKind::ResourceLimitExceeded {
                    resource: exceeded.resource,
                    observed: exceeded.observed,
                    limit: exceeded.limit,
                },
                message,
                log,
            },
            TaskError::InvalidInput(_) => Self::failure(FailureKind::InvalidInput, message),
            TaskError::Overflow { .. } => Self::Failure {
                kind: FailureKind::Overflow,
                message,
                log,
            },
            TaskError::Cancelled => Self::Failure {
                kind: FailureKind::Cancelled,
                message,
                log,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The computed values, if the task succeeded.
    pub fn result(&self) -> Option<&[u64]> {
        match self {
            Self::Success { result, .. } => Some(result),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<&FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(kind),
        }
    }

    pub fn log(&self) -> &ResourceLog {
        match self {
            Self::Success { log, .. } | Self::Failure { log, .. } => log,
        }
    }
}

/// A finished task, as reported by a worker.
#[derive(Debug, Clone)]
pub struct Completion {
    pub id: TaskId,
    pub outcome: TaskOutcome,
}

/// Outcomes of one batch, one entry per submitted task id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeSet {
    outcomes: HashMap<TaskId, TaskOutcome>,
}

impl OutcomeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome. Returns false if the id already had one, in
    /// which case the first outcome is kept.
    pub(crate) fn insert(&mut self, id: TaskId, outcome: TaskOutcome) -> bool {
        match self.outcomes.entry(id) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(outcome);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&TaskOutcome> {
        self.outcomes.get(id)
    }

    /// Shorthand for the successful result of `id`.
    pub fn result(&self, id: &str) -> Option<&[u64]> {
        self.get(id).and_then(TaskOutcome::result)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.outcomes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskOutcome)> {
        self.outcomes.iter().map(|(id, outcome)| (id.as_str(), outcome))
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &TaskOutcome)> {
        self.iter().filter(|(_, outcome)| outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &TaskOutcome)> {
        self.iter().filter(|(_, outcome)| !outcome.is_success())
    }

    pub fn into_inner(self) -> HashMap<TaskId, TaskOutcome> {
        self.outcomes
    }
}

impl IntoIterator for OutcomeSet {
    type Item = (TaskId, TaskOutcome);
    type IntoIter = hash_map::IntoIter<TaskId, TaskOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
