//! Batch Validation
//!
//! Checks a parsed batch before anything runs:
//! - Task ids are non-empty and unique
//! - Parallelism and timeout are non-zero when given
//! - Resource limits lie within 0..=100, at batch and task level

use std::collections::HashSet;

use log::{info, warn};

use crate::errors::ConfigError;

use super::model::BatchConfig;

/// Validation error types for user-friendly error messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyTaskId,
    DuplicateTaskId(String),
    ZeroParallelism,
    ZeroTimeout,
    InvalidLimits { scope: String, reason: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTaskId => write!(f, "Task has empty or whitespace-only ID"),
            Self::DuplicateTaskId(id) => write!(f, "Duplicate task ID: '{}'", id),
            Self::ZeroParallelism => write!(f, "Parallelism must be at least 1"),
            Self::ZeroTimeout => write!(f, "Timeout must be at least 1 second"),
            Self::InvalidLimits { scope, reason } => write!(f, "{}: {}", scope, reason),
        }
    }
}

/// Collects every problem in `batch`.
pub fn check_batch(batch: &BatchConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if batch.parallelism == Some(0) {
        errors.push(ValidationError::ZeroParallelism);
    }

    if batch.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    if let Err(e) = batch.limits.validate() {
        errors.push(ValidationError::InvalidLimits {
            scope: "Batch limits".to_string(),
            reason: e.to_string(),
        });
    }

    let mut seen_ids: HashSet<String> = HashSet::new();
    for entry in &batch.tasks {
        let id = entry.resolved_id();
        if id.is_empty() {
            errors.push(ValidationError::EmptyTaskId);
            continue;
        }

        if let Some(Err(e)) = entry.limits.as_ref().map(|limits| limits.validate()) {
            errors.push(ValidationError::InvalidLimits {
                scope: format!("Task '{}' limits", id),
                reason: e.to_string(),
            });
        }

        if !seen_ids.insert(id.clone()) {
            errors.push(ValidationError::DuplicateTaskId(id));
        }
    }

    errors
}

/// Validates `batch`, reporting all problems at once.
pub fn validate_batch(batch: &BatchConfig) -> Result<(), ConfigError> {
    info!("Validating batch with {} tasks", batch.tasks.len());

    if batch.tasks.is_empty() {
        warn!("Batch has no tasks");
    }

    let errors = check_batch(batch);
    if errors.is_empty() {
        return Ok(());
    }

    let message = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::Validation(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::TaskKind;
    use crate::config::model::TaskEntry;

    fn entry(id: Option<&str>, input: i64) -> TaskEntry {
        TaskEntry {
            id: id.map(str::to_string),
            kind: TaskKind::Collatz,
            input,
            step_budget: None,
            limits: None,
        }
    }

    fn batch(tasks: Vec<TaskEntry>) -> BatchConfig {
        BatchConfig {
            tasks,
            ..BatchConfig::default()
        }
    }

    #[test]
    fn test_valid_batch() {
        let batch = batch(vec![entry(None, 27), entry(Some("other"), 27)]);
        assert!(check_batch(&batch).is_empty());
        assert!(validate_batch(&batch).is_ok());
    }

    #[test]
    fn test_empty_batch_is_valid() {
        assert!(validate_batch(&BatchConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_resolved_ids() {
        // Second entry collides with the first one's default id
        let batch = batch(vec![entry(None, 27), entry(Some("27"), 9)]);
        assert_eq!(
            check_batch(&batch),
            vec![ValidationError::DuplicateTaskId("27".to_string())]
        );
    }

    #[test]
    fn test_blank_id() {
        let batch = batch(vec![entry(Some("   "), 27)]);
        assert_eq!(check_batch(&batch), vec![ValidationError::EmptyTaskId]);
    }

    #[test]
    fn test_zero_parallelism_and_timeout() {
        let batch = BatchConfig {
            parallelism: Some(0),
            timeout_secs: Some(0),
            ..BatchConfig::default()
        };
        let errors = check_batch(&batch);
        assert!(errors.contains(&ValidationError::ZeroParallelism));
        assert!(errors.contains(&ValidationError::ZeroTimeout));
    }

    #[test]
    fn test_errors_joined_in_message() {
        let batch = BatchConfig {
            parallelism: Some(0),
            tasks: vec![entry(None, 5), entry(None, 5)],
            ..BatchConfig::default()
        };

        let err = validate_batch(&batch).unwrap_err().to_string();
        assert!(err.contains("Parallelism must be at least 1"));
        assert!(err.contains("Duplicate task ID: '5'"));
    }
}
