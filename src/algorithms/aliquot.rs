//! Aliquot Sequence
//!
//! Each term is the sum of the proper divisors of the previous one. The
//! sequence stops as soon as the next term has already appeared, which
//! covers perfect numbers, amicable pairs, longer cycles and the `1, 0`
//! tail of sequences that collapse.

use std::collections::HashSet;

use crate::errors::TaskError;

use super::{positive_input, Computation};

/// Generates the aliquot sequence starting at `n`.
///
/// One checkpoint is taken before each new term is computed.
pub fn aliquot(
    n: i64,
    step_budget: usize,
    checkpoint: &mut dyn FnMut() -> Result<(), TaskError>,
) -> Result<Computation, TaskError> {
    let start = positive_input(n, "aliquot sequence start")?;

    let mut sequence = vec![start];
    let mut seen = HashSet::from([start]);
    let mut current = start;

    for step in 1..=step_budget {
        checkpoint()?;

        let next = proper_divisor_sum(current).ok_or(TaskError::Overflow { step })?;
        if !seen.insert(next) {
            return Ok(Computation::complete(sequence, step));
        }
        sequence.push(next);
        current = next;
    }

    Ok(Computation::truncated(sequence, step_budget))
}

/// Sum of the divisors of `n` excluding `n` itself; 0 for 0 and 1.
///
/// Returns `None` if the sum does not fit in a `u64`.
pub fn proper_divisor_sum(n: u64) -> Option<u64> {
    if n <= 1 {
        return Some(0);
    }

    let mut sum: u128 = 1;
    let mut i: u64 = 2;
    while i <= n / i {
        if n % i == 0 {
            let pair = n / i;
            sum += u128::from(i);
            if pair != i {
                sum += u128::from(pair);
            }
        }
        i += 1;
    }

    u64::try_from(sum).ok()
}
