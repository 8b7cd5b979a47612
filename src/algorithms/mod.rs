//! Task Bodies
//!
//! Deterministic, single-threaded numeric computations run under a
//! resource guard. Every body has the same shape: it takes an integer
//! input, a step budget and a checkpoint callback, calls the checkpoint
//! once before each unit of work, and returns a [`Computation`].
//!
//! - [`aliquot`]: aliquot sequence until a term repeats
//! - [`collatz`]: Collatz sequence until it reaches 1
//! - [`fibonacci`]: first `n` Fibonacci numbers
//! - [`sieve`]: primes up to a bound (sieve of Eratosthenes)
//! - [`factorize`]: prime factors with multiplicity

pub mod aliquot;
pub mod collatz;
pub mod factorize;
pub mod fibonacci;
pub mod sieve;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::TaskError;

pub use aliquot::aliquot;
pub use collatz::collatz;
pub use factorize::factorize;
pub use fibonacci::fibonacci;
pub use sieve::sieve;

/// Step budget of the sequence generators when none is configured.
pub const DEFAULT_SEQUENCE_STEPS: usize = 1000;

/// Signature shared by all task bodies.
pub type TaskBody = fn(
    i64,
    usize,
    &mut dyn FnMut() -> Result<(), TaskError>,
) -> Result<Computation, TaskError>;

/// What a task body produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computation {
    /// The computed sequence, primes, or factors
    pub values: Vec<u64>,
    /// Checkpoints taken
    pub steps: usize,
    /// True when the step budget ran out before natural termination
    pub truncated: bool,
}

impl Computation {
    pub(crate) fn complete(values: Vec<u64>, steps: usize) -> Self {
        Self {
            values,
            steps,
            truncated: false,
        }
    }

    pub(crate) fn truncated(values: Vec<u64>, steps: usize) -> Self {
        Self {
            values,
            steps,
            truncated: true,
        }
    }
}

/// Names the available task bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Aliquot,
    Collatz,
    Fibonacci,
    Sieve,
    Factorize,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Aliquot,
        TaskKind::Collatz,
        TaskKind::Fibonacci,
        TaskKind::Sieve,
        TaskKind::Factorize,
    ];

    /// Returns the body implementing this kind.
    pub fn body(self) -> TaskBody {
        match self {
            Self::Aliquot => aliquot,
            Self::Collatz => collatz,
            Self::Fibonacci => fibonacci,
            Self::Sieve => sieve,
            Self::Factorize => factorize,
        }
    }

    /// Step budget used when a task does not set one.
    pub fn default_step_budget(self) -> usize {
        match self {
            Self::Aliquot | Self::Collatz => DEFAULT_SEQUENCE_STEPS,
            Self::Fibonacci | Self::Sieve | Self::Factorize => usize::MAX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Aliquot => "aliquot",
            Self::Collatz => "collatz",
            Self::Fibonacci => "fibonacci",
            Self::Sieve => "sieve",
            Self::Factorize => "factorize",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Converts a task input into a positive integer.
pub(crate) fn positive_input(n: i64, what: &str) -> Result<u64, TaskError> {
    u64::try_from(n)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| TaskError::InvalidInput(format!("{what} must be a positive integer, got {n}")))
}

/// Converts a positive input into an index, rejecting values beyond the address space.
pub(crate) fn index_input(n: u64, what: &str) -> Result<usize, TaskError> {
    usize::try_from(n)
        .map_err(|_| TaskError::InvalidInput(format!("{what} {n} exceeds addressable range")))
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::errors::TaskError;

    /// A checkpoint that never fails.
    pub fn unguarded() -> impl FnMut() -> Result<(), TaskError> {
        || Ok(())
    }

    /// A checkpoint that fails with `error` on call number `fail_at` (1-based).
    pub fn failing_at(fail_at: usize, error: TaskError) -> impl FnMut() -> Result<(), TaskError> {
        let mut calls = 0;
        move || {
            calls += 1;
            if calls == fail_at {
                Err(error.clone())
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_names() {
        for kind in TaskKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn test_kind_dispatches_to_body() {
        let mut checkpoint = testing::unguarded();
        let result = (TaskKind::Factorize.body())(84, usize::MAX, &mut checkpoint).unwrap();
        assert_eq!(result.values, vec![2, 2, 3, 7]);
    }

    #[test]
    fn test_default_step_budgets() {
        assert_eq!(TaskKind::Aliquot.default_step_budget(), 1000);
        assert_eq!(TaskKind::Collatz.default_step_budget(), 1000);
        assert_eq!(TaskKind::Sieve.default_step_budget(), usize::MAX);
    }

    #[test]
    fn test_positive_input() {
        assert_eq!(positive_input(5, "n").unwrap(), 5);
        assert!(matches!(positive_input(0, "n"), Err(TaskError::InvalidInput(_))));
        assert!(matches!(positive_input(-7, "n"), Err(TaskError::InvalidInput(_))));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TaskKind::Fibonacci.to_string(), "fibonacci");
    }
}
