//! Task Execution Module
//!
//! Runs guarded computations one at a time or as concurrent batches.
//!
//! # Architecture
//!
//! - [`task`]: Task definitions shipped to workers
//! - [`runner`]: Single task execution under a resource monitor
//! - [`outcome`]: Per-task results and batch outcome sets
//! - [`pool`]: Thread and process worker pools
//! - [`worker`]: Request/response protocol of worker processes
//! - [`engine`]: Batch orchestration over a worker pool
//! - [`batches`]: Ready-made batch shapes

pub mod batches;
pub mod engine;
pub mod outcome;
pub mod pool;
pub mod runner;
pub mod task;
pub mod worker;

pub use batches::{parallel_aliquot, parallel_factorization, run_concurrent_simulations};
pub use engine::{run_sequential, BatchReport, Orchestrator};
pub use outcome::{Completion, FailureKind, OutcomeSet, TaskOutcome};
pub use pool::{default_pool_size, ProcessPool, ThreadPool, WorkerPool};
pub use runner::{CancellationToken, TaskRunner};
pub use task::{TaskId, TaskSpec};
pub use worker::{serve, WorkerRequest, WORKER_FLAG};
