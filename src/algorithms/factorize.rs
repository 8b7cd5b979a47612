//! Prime Factorization

use crate::errors::TaskError;

use super::{positive_input, Computation};

/// Factorizes `n` into primes (with multiplicity) by trial division.
///
/// Each trial divisor costs one checkpoint. When the budget runs out the
/// factors found so far are returned, without the remaining cofactor.
pub fn factorize(
    n: i64,
    step_budget: usize,
    checkpoint: &mut dyn FnMut() -> Result<(), TaskError>,
) -> Result<Computation, TaskError> {
    let mut remaining = positive_input(n, "number to factorize")?;
    let mut factors = Vec::new();
    let mut divisor: u64 = 2;
    let mut steps = 0;

    while remaining > 1 {
        if steps == step_budget {
            return Ok(Computation::truncated(factors, steps));
        }
        checkpoint()?;
        steps += 1;

        while remaining % divisor == 0 {
            factors.push(divisor);
            remaining /= divisor;
        }
        divisor += 1;

        // divisor^2 > remaining: whatever is left is prime
        if divisor > remaining / divisor {
            if remaining > 1 {
                factors.push(remaining);
            }
            break;
        }
    }

    Ok(Computation::complete(factors, steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::testing::unguarded;

    fn run(n: i64) -> Vec<u64> {
        factorize(n, usize::MAX, &mut unguarded()).unwrap().values
    }

    #[test]
    fn test_known_factorizations() {
        assert_eq!(run(84), vec![2, 2, 3, 7]);
        assert_eq!(run(17), vec![17]);
        assert_eq!(run(100), vec![2, 2, 5, 5]);
        assert_eq!(run(123), vec![3, 41]);
        assert_eq!(run(456), vec![2, 2, 2, 3, 19]);
    }

    #[test]
    fn test_large_number() {
        assert_eq!(run(123_456), vec![2, 2, 2, 2, 2, 2, 3, 643]);
    }

    #[test]
    fn test_one_has_no_factors() {
        let result = factorize(1, usize::MAX, &mut unguarded()).unwrap();
        assert!(result.values.is_empty());
        assert_eq!(result.steps, 0);
    }

    #[test]
    fn test_product_matches_input() {
        let n: i64 = 600_851_475_143;
        let product: u64 = run(n).iter().product();
        assert_eq!(product, n as u64);
    }

    #[test]
    fn test_budget_truncates() {
        // 2 * 3 * 1009: one trial division only strips the 2
        let result = factorize(6054, 1, &mut unguarded()).unwrap();
        assert_eq!(result.values, vec![2]);
        assert!(result.truncated);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(
            factorize(0, 10, &mut unguarded()),
            Err(TaskError::InvalidInput(_))
        ));
        assert!(matches!(
            factorize(-84, 10, &mut unguarded()),
            Err(TaskError::InvalidInput(_))
        ));
    }
}
