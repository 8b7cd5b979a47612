//! Collatz Sequence

use crate::errors::TaskError;

use super::{positive_input, Computation};

/// Generates the Collatz sequence from `n` until it reaches 1.
///
/// Odd terms map to `3n + 1`, even terms to `n / 2`. A checkpoint is taken
/// before every step, including the one that observes the final 1.
pub fn collatz(
    n: i64,
    step_budget: usize,
    checkpoint: &mut dyn FnMut() -> Result<(), TaskError>,
) -> Result<Computation, TaskError> {
    let mut current = positive_input(n, "Collatz start")?;
    let mut sequence = vec![current];

    for step in 1..=step_budget {
        checkpoint()?;

        if current == 1 {
            return Ok(Computation::complete(sequence, step));
        }

        current = if current % 2 == 1 {
            current
                .checked_mul(3)
                .and_then(|v| v.checked_add(1))
                .ok_or(TaskError::Overflow { step })?
        } else {
            current / 2
        };
        sequence.push(current);
    }

    Ok(Computation {
        truncated: current != 1,
        values: sequence,
        steps: step_budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::testing::unguarded;

    fn run(n: i64, budget: usize) -> Computation {
        collatz(n, budget, &mut unguarded()).unwrap()
    }

    #[test]
    fn test_short_sequence() {
        let result = run(6, 100);
        assert_eq!(result.values, vec![6, 3, 10, 5, 16, 8, 4, 2, 1]);
        assert!(!result.truncated);
        assert_eq!(result.steps, 9);
    }

    #[test]
    fn test_start_at_one() {
        let result = run(1, 100);
        assert_eq!(result.values, vec![1]);
        assert_eq!(result.steps, 1);
    }

    #[test]
    fn test_27_takes_111_steps() {
        let result = run(27, 1000);
        assert_eq!(result.values.len(), 112);
        assert_eq!(result.values.iter().max(), Some(&9232));
        assert_eq!(result.values.last(), Some(&1));
    }

    #[test]
    fn test_budget_truncates() {
        let result = run(27, 5);
        assert_eq!(result.values, vec![27, 82, 41, 124, 62, 31]);
        assert!(result.truncated);
    }

    #[test]
    fn test_budget_reaching_one_is_not_truncated() {
        // 4 -> 2 -> 1 lands on 1 exactly as the budget runs out.
        let result = run(4, 2);
        assert_eq!(result.values, vec![4, 2, 1]);
        assert!(!result.truncated);
    }

    #[test]
    fn test_overflow_is_reported() {
        let start = i64::MAX;
        let result = collatz(start, 10, &mut unguarded());
        assert_eq!(result, Err(TaskError::Overflow { step: 1 }));
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(
            collatz(-5, 10, &mut unguarded()),
            Err(TaskError::InvalidInput(_))
        ));
    }
}
