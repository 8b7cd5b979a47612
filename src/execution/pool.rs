//! Worker Pools
//!
//! A [`WorkerPool`] launches one task at a time on an execution context it
//! owns and reports the outcome over a channel. The orchestrator bounds
//! how many tasks are in flight by [`WorkerPool::size`] and never needs to
//! know which flavor it is driving.
//!
//! - [`ThreadPool`]: shared-memory workers, one OS thread per task
//! - [`ProcessPool`]: isolated workers, one child process per task

use std::any::Any;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::{debug, error, info};

use crate::errors::WorkerPoolError;
use crate::monitoring::SamplerFactory;

use super::outcome::{Completion, FailureKind, TaskOutcome};
use super::runner::{CancellationToken, TaskRunner};
use super::task::TaskSpec;
use super::worker::{WorkerRequest, WORKER_BINARY, WORKER_FLAG};

/// Capability to run tasks concurrently.
pub trait WorkerPool: Send + Sync {
    /// Maximum number of tasks this pool runs at once.
    fn size(&self) -> usize;

    /// Starts `task` and returns immediately. Exactly one [`Completion`]
    /// for the task is sent on `done` once it has finished, unless this
    /// returns an error, in which case nothing was started.
    fn dispatch(&self, task: TaskSpec, done: Sender<Completion>) -> Result<(), WorkerPoolError>;

    /// Asks every running task to stop as soon as possible.
    fn cancel_all(&self) {}
}

/// Default pool size: one worker per logical CPU.
pub fn default_pool_size() -> usize {
    num_cpus::get().max(1)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn send_completion(done: &Sender<Completion>, completion: Completion) {
    let id = completion.id.clone();
    if done.send(completion).is_err() {
        debug!("Dropping completion for task '{}': batch no longer listening", id);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs tasks on threads of the current process.
///
/// Cancellation is cooperative: running tasks stop at their next
/// checkpoint.
pub struct ThreadPool {
    size: usize,
    runner: TaskRunner,
    token: Mutex<CancellationToken>,
}

impl ThreadPool {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            runner: TaskRunner::new(),
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Replaces the sampler every task's monitor is built with.
    pub fn with_sampler_factory(mut self, factory: SamplerFactory) -> Self {
        self.runner = self.runner.with_sampler_factory(factory);
        self
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new(default_pool_size())
    }
}

impl WorkerPool for ThreadPool {
    fn size(&self) -> usize {
        self.size
    }

    fn dispatch(&self, task: TaskSpec, done: Sender<Completion>) -> Result<(), WorkerPoolError> {
        let token = lock(&self.token).clone();
        let runner = self.runner.clone().with_cancellation(token);

        thread::Builder::new()
            .name(format!("mathsim-{}", task.kind))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| runner.run(&task)))
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        error!("Task '{}' panicked: {}", task.id, message);
                        TaskOutcome::failure(
                            FailureKind::WorkerPool,
                            format!("Task panicked: {}", message),
                        )
                    });
                send_completion(&done, Completion { id: task.id, outcome });
            })
            .map_err(WorkerPoolError::Spawn)?;

        Ok(())
    }

    fn cancel_all(&self) {
        let mut token = lock(&self.token);
        token.cancel();
        *token = CancellationToken::new();
    }
}

/// Live children plus a counter bumped by every `cancel_all`.
///
/// A manager thread only registers its child if the generation it was
/// dispatched under is still current, so a cancel can never miss a child
/// that is spawned after it.
#[derive(Default)]
struct ChildTable {
    generation: u64,
    live: HashMap<u64, Child>,
}

type SharedChildren = Arc<Mutex<ChildTable>>;

/// Runs each task in a fresh child process of the worker binary.
///
/// The child receives one JSON [`WorkerRequest`] line on stdin and answers
/// with one JSON [`TaskOutcome`] line on stdout. Cancellation kills the
/// children outright.
pub struct ProcessPool {
    size: usize,
    worker_binary: PathBuf,
    children: SharedChildren,
    next_ticket: AtomicU64,
}

impl ProcessPool {
    /// Creates a pool spawning the default worker binary.
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            worker_binary: WORKER_BINARY.clone(),
            children: Arc::new(Mutex::new(ChildTable::default())),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Sets the binary started in worker mode for each task.
    pub fn with_worker_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.worker_binary = binary.into();
        self
    }

    pub fn worker_binary(&self) -> &Path {
        &self.worker_binary
    }

    /// Number of child processes currently alive.
    pub fn live_workers(&self) -> usize {
        lock(&self.children).live.len()
    }
}

impl Default for ProcessPool {
    fn default() -> Self {
        Self::new(default_pool_size())
    }
}

impl WorkerPool for ProcessPool {
    fn size(&self) -> usize {
        self.size
    }

    fn dispatch(&self, task: TaskSpec, done: Sender<Completion>) -> Result<(), WorkerPoolError> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let generation = lock(&self.children).generation;
        let binary = self.worker_binary.clone();
        let children = Arc::clone(&self.children);

        thread::Builder::new()
            .name(format!("mathsim-proc-{}", task.kind))
            .spawn(move || {
                let slot = Slot {
                    ticket,
                    generation,
                    children: &children,
                };
                let outcome = run_in_child(&binary, &task, slot).unwrap_or_else(|e| {
                    error!("Worker for task '{}' failed: {}", task.id, e);
                    TaskOutcome::failure(FailureKind::WorkerPool, e.to_string())
                });
                send_completion(&done, Completion { id: task.id, outcome });
            })
            .map_err(WorkerPoolError::Spawn)?;

        Ok(())
    }

    fn cancel_all(&self) {
        let mut table = lock(&self.children);
        table.generation += 1;
        if !table.live.is_empty() {
            info!("Killing {} worker processes", table.live.len());
        }
        for child in table.live.values_mut() {
            if let Err(e) = child.kill() {
                debug!("Failed to kill worker {}: {}", child.id(), e);
            }
        }
    }
}

/// Where a manager thread registers its child.
struct Slot<'a> {
    ticket: u64,
    generation: u64,
    children: &'a SharedChildren,
}

impl Slot<'_> {
    fn cancelled(&self, table: &ChildTable) -> bool {
        table.generation != self.generation
    }
}

fn cancelled_before_start() -> TaskOutcome {
    TaskOutcome::failure(FailureKind::Cancelled, "Worker cancelled before it started")
}

/// Runs one task in a child process and collects its reported outcome.
fn run_in_child(
    binary: &Path,
    task: &TaskSpec,
    slot: Slot<'_>,
) -> Result<TaskOutcome, WorkerPoolError> {
    if slot.cancelled(&lock(slot.children)) {
        debug!("Task '{}' cancelled before its worker was spawned", task.id);
        return Ok(cancelled_before_start());
    }

    let mut child = Command::new(binary)
        .arg(WORKER_FLAG)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(WorkerPoolError::Spawn)?;

    debug!("Spawned worker {} for task '{}'", child.id(), task.id);

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();

    {
        let mut table = lock(slot.children);
        if slot.cancelled(&table) {
            drop(table);
            debug!("Killing worker {} spawned after cancellation", child.id());
            let _ = child.kill();
            child.wait()?;
            return Ok(cancelled_before_start());
        }
        table.live.insert(slot.ticket, child);
    }

    let exchanged = match (stdin, stdout) {
        (Some(stdin), Some(stdout)) => exchange(stdin, stdout, task),
        _ => Err(WorkerPoolError::Protocol("worker pipes unavailable".to_string())),
    };

    // Only this thread removes its ticket, so the child is still in the table.
    let removed = lock(slot.children).live.remove(&slot.ticket);
    let status = match removed {
        Some(mut child) => {
            if exchanged.is_err() {
                let _ = child.kill();
            }
            Some(child.wait()?)
        }
        None => None,
    };

    match exchanged? {
        Some(outcome) => Ok(outcome),
        None => Err(WorkerPoolError::WorkerCrashed(match status {
            Some(status) => format!("worker exited ({}) without reporting", status),
            None => "worker exited without reporting".to_string(),
        })),
    }
}

/// Sends the request and reads the single response line.
///
/// Returns `Ok(None)` when the worker closed stdout without answering.
fn exchange(
    mut stdin: ChildStdin,
    stdout: ChildStdout,
    task: &TaskSpec,
) -> Result<Option<TaskOutcome>, WorkerPoolError> {
    let request = WorkerRequest { task: task.clone() };
    serde_json::to_writer(&mut stdin, &request)?;
    stdin.write_all(b"\n")?;
    stdin.flush()?;
    drop(stdin);

    let mut line = String::new();
    let read = BufReader::new(stdout).read_line(&mut line)?;
    if read == 0 || line.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_str(line.trim())?))
}
