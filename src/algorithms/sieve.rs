//! Sieve of Eratosthenes

use crate::errors::TaskError;

use super::{index_input, positive_input, Computation};

/// Returns every prime `<= limit`.
///
/// One checkpoint is taken per candidate divisor `i` in `2..=isqrt(limit)`.
/// If the budget runs out early, only primes below `i * i` for the next
/// unprocessed `i` are certain, so the result stops there. The checkpoint
/// for `i = 2` runs before the `limit + 1` flag buffer is allocated.
pub fn sieve(
    limit: i64,
    step_budget: usize,
    checkpoint: &mut dyn FnMut() -> Result<(), TaskError>,
) -> Result<Computation, TaskError> {
    let limit = index_input(positive_input(limit, "sieve limit")?, "sieve limit")?;
    if limit < 2 {
        return Ok(Computation::complete(Vec::new(), 0));
    }

    let root = isqrt(limit);

    // The first checkpoint guards the allocation of the whole buffer.
    let mut prechecked = root >= 2 && step_budget > 0;
    if prechecked {
        checkpoint()?;
    }

    let mut is_prime: Vec<bool> = Vec::new();
    is_prime
        .try_reserve_exact(limit + 1)
        .map_err(|_| TaskError::InvalidInput(format!("sieve limit {limit} is too large")))?;
    is_prime.resize(limit + 1, true);
    is_prime[0] = false;
    is_prime[1] = false;

    let mut steps = 0;
    let mut certified = limit;
    let mut truncated = false;

    for i in 2..=root {
        if prechecked {
            prechecked = false;
        } else {
            if steps == step_budget {
                certified = limit.min(i * i - 1);
                truncated = true;
                break;
            }
            checkpoint()?;
        }
        steps += 1;

        if is_prime[i] {
            for multiple in (i * i..=limit).step_by(i) {
                is_prime[multiple] = false;
            }
        }
    }

    let primes = (2..=certified)
        .filter(|&k| is_prime[k])
        .map(|k| k as u64)
        .collect();

    Ok(Computation {
        values: primes,
        steps,
        truncated,
    })
}

/// Integer square root.
fn isqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root > 0 && root > n / root {
        root -= 1;
    }
    while (root + 1) <= n / (root + 1) {
        root += 1;
    }
    root
}
