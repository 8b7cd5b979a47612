//! Fibonacci Sequence

use crate::errors::TaskError;

use super::{index_input, positive_input, Computation};

/// Generates the first `n` Fibonacci numbers, starting `0, 1`.
///
/// The two seed terms are free; each further term costs one checkpoint.
/// Terms beyond `u64` range fail with [`TaskError::Overflow`].
///
/// `n` counts terms exactly, so `n = 1` yields `[0]` alone rather than the
/// full `0, 1` seed pair.
pub fn fibonacci(
    n: i64,
    step_budget: usize,
    checkpoint: &mut dyn FnMut() -> Result<(), TaskError>,
) -> Result<Computation, TaskError> {
    let terms = index_input(positive_input(n, "Fibonacci term count")?, "Fibonacci term count")?;

    if terms == 1 {
        return Ok(Computation::complete(vec![0], 0));
    }

    let mut sequence: Vec<u64> = vec![0, 1];
    let mut steps = 0;

    while sequence.len() < terms {
        if steps == step_budget {
            return Ok(Computation::truncated(sequence, steps));
        }
        checkpoint()?;
        steps += 1;

        let len = sequence.len();
        let next = sequence[len - 1]
            .checked_add(sequence[len - 2])
            .ok_or(TaskError::Overflow { step: steps })?;
        sequence.push(next);
    }

    Ok(Computation::complete(sequence, steps))
}
