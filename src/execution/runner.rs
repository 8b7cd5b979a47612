//! Single Task Execution
//!
//! Runs one task body under a fresh [`ResourceMonitor`], translating the
//! body's iterations into checkpoint calls. Whatever happens inside the
//! body, the runner hands back exactly one [`TaskOutcome`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::errors::TaskError;
use crate::monitoring::{system_sampler_factory, ResourceMonitor, SamplerFactory};

use super::outcome::TaskOutcome;
use super::task::TaskSpec;

/// Shared flag asking running tasks to stop at their next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Executes tasks one at a time, each under its own resource monitor.
///
/// # Example
///
/// ```rust,no_run
/// use mathsim::algorithms::TaskKind;
/// use mathsim::execution::{TaskRunner, TaskSpec};
///
/// let runner = TaskRunner::new();
/// let outcome = runner.run(&TaskSpec::keyed_by_input(TaskKind::Factorize, 84));
/// assert_eq!(outcome.result(), Some(&[2u64, 2, 3, 7][..]));
/// ```
#[derive(Clone)]
pub struct TaskRunner {
    sampler_factory: SamplerFactory,
    cancellation: Option<CancellationToken>,
}

impl TaskRunner {
    /// Creates a runner sampling the current host.
    pub fn new() -> Self {
        Self {
            sampler_factory: system_sampler_factory(),
            cancellation: None,
        }
    }

    /// Replaces the sampler every task's monitor is built with.
    pub fn with_sampler_factory(mut self, factory: SamplerFactory) -> Self {
        self.sampler_factory = factory;
        self
    }

    /// Makes checkpoints fail with `Cancelled` once `token` is set.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Runs `task` to completion, truncation, or failure.
    ///
    /// Each checkpoint happens before the iteration's work. A cancelled
    /// checkpoint is not sampled.
    pub fn run(&self, task: &TaskSpec) -> TaskOutcome {
        let budget = task.effective_step_budget();
        debug!(
            "Starting task '{}': {}({}) with step budget {}",
            task.id, task.kind, task.input, budget
        );

        let mut monitor = ResourceMonitor::with_sampler(task.limits, (self.sampler_factory)());
        let body = task.kind.body();

        let result = {
            let mut checkpoint = || -> Result<(), TaskError> {
                if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
                    return Err(TaskError::Cancelled);
                }
                monitor.checkpoint()?;
                Ok(())
            };
            body(task.input, budget, &mut checkpoint)
        };

        let log = monitor.into_log();

        match result {
            Ok(computation) => {
                info!(
                    "Task '{}' finished: {} values in {} steps{}",
                    task.id,
                    computation.values.len(),
                    computation.steps,
                    if computation.truncated { " (truncated)" } else { "" }
                );
                TaskOutcome::Success {
                    result: computation.values,
                    steps: computation.steps,
                    truncated: computation.truncated,
                    log,
                }
            }
            Err(error) => {
                match &error {
                    TaskError::ResourceLimit(exceeded) => {
                        warn!("Task '{}' aborted: {}", task.id, exceeded);
                    }
                    other => warn!("Task '{}' failed: {}", task.id, other),
                }
                TaskOutcome::from_error(error, log)
            }
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::TaskKind;
    use crate::errors::ResourceKind;
    use crate::execution::outcome::FailureKind;
    use crate::monitoring::resource::testing::SequenceSampler;
    use crate::monitoring::{FixedSampler, ResourceLimits};

    fn quiet_runner() -> TaskRunner {
        TaskRunner::new().with_sampler_factory(FixedSampler::new(20.0, 5.0).factory())
    }

    fn unlimited(kind: TaskKind, input: i64) -> TaskSpec {
        TaskSpec::keyed_by_input(kind, input).with_limits(ResourceLimits::unlimited())
    }

    #[test]
    fn test_factorize_success() {
        let outcome = quiet_runner().run(&unlimited(TaskKind::Factorize, 84));
        assert_eq!(outcome.result(), Some(&[2u64, 2, 3, 7][..]));

        let outcome = quiet_runner().run(&unlimited(TaskKind::Factorize, 17));
        assert_eq!(outcome.result(), Some(&[17u64][..]));
    }

    #[test]
    fn test_log_length_matches_steps() {
        let outcome = quiet_runner().run(&unlimited(TaskKind::Collatz, 27));
        match outcome {
            TaskOutcome::Success { steps, log, .. } => assert_eq!(log.len(), steps),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_aliquot_with_budget() {
        let task = unlimited(TaskKind::Aliquot, 220).with_step_budget(2);
        let outcome = quiet_runner().run(&task);
        assert_eq!(outcome.result(), Some(&[220u64, 284][..]));
    }

    #[test]
    fn test_budget_exhaustion_is_success() {
        let task = unlimited(TaskKind::Aliquot, 12).with_step_budget(3);
        match quiet_runner().run(&task) {
            TaskOutcome::Success {
                truncated, steps, ..
            } => {
                assert!(truncated);
                assert_eq!(steps, 3);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_memory_limit_zero_with_system_sampler() {
        let limits = ResourceLimits::new(0.0, 100.0).unwrap();
        let task = TaskSpec::keyed_by_input(TaskKind::Factorize, 84).with_limits(limits);
        let outcome = TaskRunner::new().run(&task);

        assert!(matches!(
            outcome.failure_kind(),
            Some(FailureKind::ResourceLimitExceeded {
                resource: ResourceKind::Memory,
                ..
            })
        ));
        assert_eq!(outcome.log().len(), 1);
    }

    #[test]
    fn test_cpu_limit_failure_discards_result() {
        let limits = ResourceLimits::new(100.0, 1.0).unwrap();
        let task = TaskSpec::keyed_by_input(TaskKind::Sieve, 1000).with_limits(limits);
        let outcome = quiet_runner().run(&task);

        assert!(outcome.result().is_none());
        assert!(matches!(
            outcome.failure_kind(),
            Some(FailureKind::ResourceLimitExceeded {
                resource: ResourceKind::Cpu,
                ..
            })
        ));
        assert_eq!(outcome.log().len(), 1);
    }

    #[test]
    fn test_limit_trips_mid_task() {
        let runner = TaskRunner::new()
            .with_sampler_factory(SequenceSampler::memory_spike_after(5, 95.0).factory());
        let task = TaskSpec::keyed_by_input(TaskKind::Collatz, 27);

        let outcome = runner.run(&task);

        assert!(outcome.result().is_none());
        assert!(matches!(
            outcome.failure_kind(),
            Some(FailureKind::ResourceLimitExceeded {
                resource: ResourceKind::Memory,
                ..
            })
        ));
        assert_eq!(outcome.log().len(), 6);
        assert_eq!(outcome.log().last().map(|s| s.memory_percent), Some(95.0));
    }

    #[test]
    fn test_invalid_input_reported() {
        let outcome = quiet_runner().run(&unlimited(TaskKind::Factorize, -1));
        assert_eq!(outcome.failure_kind(), Some(&FailureKind::InvalidInput));
        assert!(outcome.log().is_empty());
    }

    #[test]
    fn test_overflow_reported() {
        let outcome = quiet_runner().run(&unlimited(TaskKind::Fibonacci, 200));
        assert_eq!(outcome.failure_kind(), Some(&FailureKind::Overflow));
        assert_eq!(outcome.log().len(), 93);
    }

    #[test]
    fn test_deterministic_results() {
        for kind in TaskKind::ALL {
            let task = unlimited(kind, 60).with_step_budget(50);
            let first = TaskRunner::new().run(&task);
            let second = TaskRunner::new().run(&task);
            assert_eq!(first.result(), second.result(), "{} differs", kind);
        }
    }

    #[test]
    fn test_cancelled_before_first_checkpoint() {
        let token = CancellationToken::new();
        token.cancel();
        let runner = quiet_runner().with_cancellation(token);

        let outcome = runner.run(&unlimited(TaskKind::Collatz, 27));
        assert_eq!(outcome.failure_kind(), Some(&FailureKind::Cancelled));
        assert!(outcome.log().is_empty());
    }

    #[test]
    fn test_token_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
