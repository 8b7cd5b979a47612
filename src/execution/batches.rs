//! Canned Batches
//!
//! Ready-made batch shapes: a mixed run of three different computations,
//! and homogeneous fan-outs of factorization and aliquot tasks keyed by
//! their input number.

use std::collections::HashSet;

use crate::algorithms::TaskKind;
use crate::errors::OrchestratorError;
use crate::monitoring::ResourceLimits;

use super::engine::Orchestrator;
use super::outcome::OutcomeSet;
use super::pool::ThreadPool;
use super::task::TaskSpec;

/// Runs one aliquot, one sieve and one factorization task side by side.
///
/// Outcomes are keyed `"aliquot"`, `"sieve"` and `"factorize"`.
pub fn run_concurrent_simulations(
    aliquot_start: i64,
    sieve_limit: i64,
    factorize_number: i64,
    limits: ResourceLimits,
) -> Result<OutcomeSet, OrchestratorError> {
    let tasks = vec![
        TaskSpec::new("aliquot", TaskKind::Aliquot, aliquot_start).with_limits(limits),
        TaskSpec::new("sieve", TaskKind::Sieve, sieve_limit).with_limits(limits),
        TaskSpec::new("factorize", TaskKind::Factorize, factorize_number).with_limits(limits),
    ];

    Orchestrator::new(ThreadPool::new(tasks.len())).run_all(tasks)
}

/// Factorizes every distinct number, keyed by the number's decimal form.
pub fn parallel_factorization(
    orchestrator: &Orchestrator,
    numbers: &[i64],
    limits: ResourceLimits,
) -> Result<OutcomeSet, OrchestratorError> {
    let mut seen = HashSet::new();
    let tasks = numbers
        .iter()
        .filter(|n| seen.insert(**n))
        .map(|&n| TaskSpec::keyed_by_input(TaskKind::Factorize, n).with_limits(limits))
        .collect();

    orchestrator.run_all(tasks)
}

/// Computes aliquot sequences for `count` consecutive starting values.
pub fn parallel_aliquot(
    orchestrator: &Orchestrator,
    start: i64,
    count: usize,
    limits: ResourceLimits,
) -> Result<OutcomeSet, OrchestratorError> {
    let tasks = (0..count)
        .map_while(|offset| i64::try_from(offset).ok().and_then(|o| start.checked_add(o)))
        .map(|n| TaskSpec::keyed_by_input(TaskKind::Aliquot, n).with_limits(limits))
        .collect();

    orchestrator.run_all(tasks)
}
