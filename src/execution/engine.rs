//! Batch Orchestration Engine
//!
//! Drives a batch of independent tasks through a [`WorkerPool`]:
//! - Bounded dispatch in submission order
//! - Completion collection over a channel, in finishing order
//! - Optional batch deadline with cancellation of unfinished work
//! - Timeline of start, completion, and failure events

use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::errors::{OrchestratorError, WorkerPoolError};
use crate::monitoring::{EventType, ExecutionTimeline};

use super::outcome::{Completion, FailureKind, OutcomeSet, TaskOutcome};
use super::pool::{ThreadPool, WorkerPool};
use super::runner::TaskRunner;
use super::task::{TaskId, TaskSpec};

/// Everything a finished batch produced.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: OutcomeSet,
    pub timeline: ExecutionTimeline,
}

impl BatchReport {
    fn record<F>(&mut self, id: TaskId, outcome: TaskOutcome, on_complete: &mut F)
    where
        F: FnMut(&str, &TaskOutcome),
    {
        let event = if outcome.is_success() {
            EventType::Completed
        } else {
            EventType::Failed
        };
        self.timeline.add_event(id.as_str(), event);
        on_complete(&id, &outcome);
        self.outcomes.insert(id, outcome);
    }
}

/// Runs batches of tasks concurrently on a worker pool.
///
/// Batches submitted to one orchestrator from several threads run one at a
/// time, since a timeout cancels everything on the pool.
///
/// # Example
///
/// ```rust,no_run
/// use mathsim::algorithms::TaskKind;
/// use mathsim::execution::{Orchestrator, TaskSpec, ThreadPool};
///
/// let orchestrator = Orchestrator::new(ThreadPool::new(4));
/// let tasks = [84, 100, 123]
///     .into_iter()
///     .map(|n| TaskSpec::keyed_by_input(TaskKind::Factorize, n))
///     .collect();
///
/// let outcomes = orchestrator.run_all(tasks).unwrap();
/// assert_eq!(outcomes.result("123"), Some(&[3u64, 41][..]));
/// ```
pub struct Orchestrator {
    pool: Box<dyn WorkerPool>,
    timeout: Option<Duration>,
    batch_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(pool: impl WorkerPool + 'static) -> Self {
        Self {
            pool: Box::new(pool),
            timeout: None,
            batch_lock: Mutex::new(()),
        }
    }

    /// Orchestrator over a thread pool with one worker per CPU.
    pub fn threaded() -> Self {
        Self::new(ThreadPool::default())
    }

    /// Bounds the wall-clock time of each batch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs every task and returns one outcome per task id.
    pub fn run_all(&self, tasks: Vec<TaskSpec>) -> Result<OutcomeSet, OrchestratorError> {
        Ok(self.run_batch(tasks, |_, _| {})?.outcomes)
    }

    /// Runs every task, calling `on_complete` as each one finishes.
    ///
    /// Callbacks arrive in finishing order, on the calling thread. A task
    /// failure never stops the batch; only duplicate ids are rejected, and
    /// they are rejected before anything runs. A batch started while another
    /// is running on this orchestrator waits for it, and its timeout counts
    /// from when it actually starts.
    pub fn run_batch<F>(
        &self,
        tasks: Vec<TaskSpec>,
        mut on_complete: F,
    ) -> Result<BatchReport, OrchestratorError>
    where
        F: FnMut(&str, &TaskOutcome),
    {
        ensure_unique_ids(&tasks)?;

        let _batch = self
            .batch_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let start_time = Instant::now();
        let deadline = self.timeout.map(|timeout| start_time + timeout);
        let max_parallel = self.pool.size().max(1);
        let total = tasks.len();

        let mut pending: VecDeque<TaskSpec> = tasks.into();
        let mut in_flight: HashSet<TaskId> = HashSet::new();
        let mut report = BatchReport::default();

        let (tx, rx) = channel::<Completion>();

        info!(
            "Starting batch of {} tasks (max parallel: {})",
            total, max_parallel
        );

        loop {
            while in_flight.len() < max_parallel {
                let Some(task) = pending.pop_front() else {
                    break;
                };
                let id = task.id.clone();
                report.timeline.add_event(id.as_str(), EventType::Started);

                let dispatched = watch_completion(id.clone(), tx.clone())
                    .and_then(|done| self.pool.dispatch(task, done));

                match dispatched {
                    Ok(()) => {
                        in_flight.insert(id);
                    }
                    Err(e) => {
                        error!("Failed to dispatch task '{}': {}", id, e);
                        let outcome = TaskOutcome::failure(FailureKind::WorkerPool, e.to_string());
                        report.record(id, outcome, &mut on_complete);
                    }
                }
            }

            // Nothing running means nothing was left to dispatch either
            if in_flight.is_empty() {
                break;
            }

            let received = match deadline {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Completion { id, outcome }) => {
                    if in_flight.remove(&id) {
                        report.record(id, outcome, &mut on_complete);
                    } else {
                        warn!("Ignoring completion for unknown task '{}'", id);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let unfinished = in_flight.len() + pending.len();
                    warn!(
                        "Batch timed out after {:.2?} with {} tasks unfinished",
                        start_time.elapsed(),
                        unfinished
                    );
                    self.pool.cancel_all();

                    let message = format!(
                        "Batch exceeded its timeout of {:.2?}",
                        self.timeout.unwrap_or_default()
                    );
                    let mut unfinished: Vec<TaskId> = in_flight.drain().collect();
                    unfinished.extend(pending.drain(..).map(|task| task.id));
                    for id in unfinished {
                        let outcome = TaskOutcome::failure(FailureKind::TimedOut, message.as_str());
                        report.record(id, outcome, &mut on_complete);
                    }
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    error!("All workers hung up with {} tasks in flight", in_flight.len());
                    for id in in_flight.drain().collect::<Vec<_>>() {
                        let outcome = TaskOutcome::failure(
                            FailureKind::WorkerPool,
                            "Worker exited without reporting",
                        );
                        report.record(id, outcome, &mut on_complete);
                    }
                }
            }
        }

        let failed = report.outcomes.failures().count();
        info!(
            "Batch finished in {:.2?}: {} succeeded, {} failed",
            start_time.elapsed(),
            report.outcomes.len() - failed,
            failed
        );

        Ok(report)
    }
}

/// Runs tasks one after another on the calling thread.
pub fn run_sequential(
    runner: &TaskRunner,
    tasks: &[TaskSpec],
) -> Result<OutcomeSet, OrchestratorError> {
    ensure_unique_ids(tasks)?;

    let mut outcomes = OutcomeSet::new();
    for task in tasks {
        outcomes.insert(task.id.clone(), runner.run(task));
    }
    Ok(outcomes)
}

/// Gives the pool a sender of its own for one task. If the pool drops it
/// without reporting, the task is completed as a worker pool failure.
fn watch_completion(
    id: TaskId,
    done: Sender<Completion>,
) -> Result<Sender<Completion>, WorkerPoolError> {
    let (tx, rx) = channel::<Completion>();

    thread::Builder::new()
        .name(format!("mathsim-watch-{}", id))
        .spawn(move || {
            let completion = rx.recv().unwrap_or_else(|_| {
                error!("Worker for task '{}' exited without reporting", id);
                Completion {
                    id,
                    outcome: TaskOutcome::failure(
                        FailureKind::WorkerPool,
                        "Worker exited without reporting",
                    ),
                }
            });
            // The batch may already have returned after a timeout
            let _ = done.send(completion);
        })
        .map_err(WorkerPoolError::Spawn)?;

    Ok(tx)
}

fn ensure_unique_ids(tasks: &[TaskSpec]) -> Result<(), OrchestratorError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(OrchestratorError::DuplicateTaskId(task.id.clone()));
        }
    }
    Ok(())
}
