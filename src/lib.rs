//! MathSim - Resource-Guarded Concurrent Task Runner
//!
//! Runs deterministic numeric computations (aliquot and Collatz sequences,
//! Fibonacci numbers, prime sieves, factorizations) under per-task memory
//! and CPU limits, either one at a time or as concurrent batches on a pool
//! of threads or isolated worker processes.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`algorithms`]: Task bodies with a uniform checkpoint contract
//! - [`monitoring`]: Resource sampling, limit enforcement, and timelines
//! - [`execution`]: Task runner, worker pools, and batch orchestration
//! - [`config`]: YAML batch definitions
//! - [`errors`]: Error types shared across modules
//!
//! # Example
//!
//! ```rust,no_run
//! use mathsim::algorithms::TaskKind;
//! use mathsim::execution::{Orchestrator, TaskSpec, ThreadPool};
//! use mathsim::monitoring::ResourceLimits;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let limits = ResourceLimits::new(90.0, 95.0)?;
//!     let orchestrator = Orchestrator::new(ThreadPool::new(4));
//!
//!     let tasks = vec![
//!         TaskSpec::new("amicable", TaskKind::Aliquot, 220).with_limits(limits),
//!         TaskSpec::new("primes", TaskKind::Sieve, 100).with_limits(limits),
//!     ];
//!
//!     let outcomes = orchestrator.run_all(tasks)?;
//!     println!("{:?}", outcomes.result("amicable"));
//!     Ok(())
//! }
//! ```

pub mod algorithms;
pub mod config;
pub mod errors;
pub mod execution;
pub mod monitoring;

// Re-export commonly used types
pub use algorithms::TaskKind;
pub use config::{load_batch, BatchConfig};
pub use errors::{ConfigError, OrchestratorError, TaskError};
pub use execution::{Orchestrator, OutcomeSet, TaskOutcome, TaskRunner, TaskSpec};
pub use monitoring::{ResourceLimits, ResourceMonitor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "MathSim";
