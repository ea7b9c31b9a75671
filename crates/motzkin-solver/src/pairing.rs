use crate::engine::EliminationError;
use crate::step::Partition;
use crate::system::{System, SystemError};

/// Combines the partitions of one elimination round into the next system.
#[derive(Debug, Clone, Copy)]
pub struct Pairing {
    column: usize,
    max_rows: Option<usize>,
}

impl Pairing {
    pub fn new(column: usize) -> Self {
        Self {
            column,
            max_rows: None,
        }
    }

    /// Fail instead of emitting more than `max` rows.
    pub fn with_max_rows(mut self, max: Option<usize>) -> Self {
        self.max_rows = max;
        self
    }

    /// Builds the system without `column`.
    ///
    /// Each positive row with a zero coefficient is carried over once with
    /// the column dropped. Every other positive row is paired with every
    /// negative row. Rows of `system` are only read; the result owns new rows.
    /// A column outside `system` is a `ColumnOutOfRange` error.
    pub fn apply(
        &self,
        system: &System,
        partition: &Partition,
    ) -> Result<System, EliminationError> {
        let n_vars = system.n_vars();
        if self.column >= n_vars {
            return Err(SystemError::ColumnOutOfRange {
                column: self.column,
                n_vars,
            }
            .into());
        }

        // carried-over rows appear once, not once per lower bound
        let mut passthrough = 0;
        for &p in &partition.positive {
            if system.equation(p)?.coefficient(self.column).is_zero() {
                passthrough += 1;
            }
        }
        let expected = (partition.positive.len() - passthrough)
            .saturating_mul(partition.negative.len())
            .saturating_add(passthrough);
        let capacity = self.max_rows.map_or(expected, |max| expected.min(max));
        let mut rows = Vec::with_capacity(capacity);

        for &p in &partition.positive {
            let upper = system.equation(p)?;
            if upper.coefficient(self.column).is_zero() {
                rows.push(upper.reduce(self.column));
                self.check_limit(rows.len())?;
                continue;
            }
            for &n in &partition.negative {
                let lower = system.equation(n)?;
                rows.push(upper.subtract(lower, self.column)?);
                self.check_limit(rows.len())?;
            }
        }

        Ok(System::new(n_vars - 1, rows)?)
    }

    fn check_limit(&self, rows: usize) -> Result<(), EliminationError> {
        match self.max_rows {
            Some(limit) if rows > limit => Err(EliminationError::RowLimitExceeded {
                column: self.column,
                rows,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::{Equation, Relation};
    use crate::rational::Rational;
    use crate::step::{EliminationStep, StepOutcome};

    fn row(coeffs: &[i32], constant: i32, relation: Relation) -> Equation {
        Equation::new(
            coeffs.iter().map(|&c| Rational::from(c)).collect(),
            Rational::from(constant),
            relation,
        )
    }

    fn step(system: &mut System, column: usize) -> Partition {
        match EliminationStep::new(column).apply(system).unwrap() {
            StepOutcome::Partitioned(p) => p,
            StepOutcome::Vacuous => panic!("Expected a partition"),
        }
    }

    #[test]
    fn test_pairs_every_upper_with_every_lower() {
        // x + y <= 10, x - y >= 2, y >= 0
        let mut system = System::new(
            2,
            vec![
                row(&[1, 1], -10, Relation::LessOrEqual),
                row(&[1, -1], -2, Relation::GreaterOrEqual),
                row(&[0, 1], 0, Relation::GreaterOrEqual),
            ],
        )
        .unwrap();
        let partition = step(&mut system, 1);
        assert_eq!(partition.positive, vec![0, 1]);
        assert_eq!(partition.negative, vec![2]);

        let next = Pairing::new(1).apply(&system, &partition).unwrap();
        assert_eq!(next.n_vars(), 1);
        assert_eq!(
            next.equations(),
            &[
                // x - 10 <= 0
                row(&[1], -10, Relation::LessOrEqual),
                // -x + 2 <= 0
                row(&[-1], 2, Relation::LessOrEqual),
            ]
        );
    }

    #[test]
    fn test_zero_rows_pass_through_once() {
        // the zero row must not be repeated for each of the two lower bounds
        let mut system = System::new(
            2,
            vec![
                row(&[3, 0], -1, Relation::LessOrEqual),
                row(&[1, -1], 0, Relation::LessOrEqual),
                row(&[2, -1], 0, Relation::LessOrEqual),
            ],
        )
        .unwrap();
        let partition = step(&mut system, 1);
        let next = Pairing::new(1).apply(&system, &partition).unwrap();
        assert_eq!(next.equations(), &[row(&[3], -1, Relation::LessOrEqual)]);
    }

    #[test]
    fn test_all_zero_column_keeps_row_count() {
        let mut system = System::new(
            3,
            vec![
                row(&[1, 2, 0], -1, Relation::LessOrEqual),
                row(&[0, 1, 0], 4, Relation::GreaterOrEqual),
                row(&[-1, 0, 0], 0, Relation::LessOrEqual),
            ],
        )
        .unwrap();
        let partition = step(&mut system, 2);
        let next = Pairing::new(2).apply(&system, &partition).unwrap();
        assert_eq!(next.len(), 3);
        assert_eq!(next.n_vars(), 2);
        assert_eq!(next.equations()[0], row(&[1, 2], -1, Relation::LessOrEqual));
        assert_eq!(next.equations()[1], row(&[0, 1], 4, Relation::GreaterOrEqual));
    }

    #[test]
    fn test_no_lower_bounds_drops_upper_bounds() {
        let mut system = System::new(
            2,
            vec![
                row(&[1, 1], -1, Relation::LessOrEqual),
                row(&[4, 2], 0, Relation::LessOrEqual),
            ],
        )
        .unwrap();
        let partition = step(&mut system, 1);
        let next = Pairing::new(1).apply(&system, &partition).unwrap();
        assert!(next.is_empty());
        assert_eq!(next.n_vars(), 1);
    }

    #[test]
    fn test_many_passthrough_rows_against_many_lower_bounds() {
        let n = 2000;
        let rows = (0..n)
            .map(|i| row(&[1, 0], i, Relation::LessOrEqual))
            .chain((0..n).map(|i| row(&[1, -1], i, Relation::LessOrEqual)))
            .collect();
        let mut system = System::new(2, rows).unwrap();
        let partition = step(&mut system, 1);
        assert_eq!(partition.positive.len(), n as usize);
        assert_eq!(partition.negative.len(), n as usize);

        let next = Pairing::new(1).apply(&system, &partition).unwrap();
        assert_eq!(next.len(), n as usize);
        assert_eq!(next.equations()[7], row(&[1], 7, Relation::LessOrEqual));
    }

    #[test]
    fn test_greater_or_equal_passthrough_keeps_relation() {
        // x - 3 >= 0 has no y, so it reaches the next round unchanged
        let mut system = System::new(
            2,
            vec![
                row(&[1, 0], -3, Relation::GreaterOrEqual),
                row(&[0, 1], 0, Relation::GreaterOrEqual),
            ],
        )
        .unwrap();
        let partition = step(&mut system, 1);
        let next = Pairing::new(1).apply(&system, &partition).unwrap();
        assert_eq!(next.equations(), &[row(&[1], -3, Relation::GreaterOrEqual)]);
    }

    #[test]
    fn test_column_out_of_range() {
        let system = System::empty(0);
        let err = Pairing::new(0).apply(&system, &Partition::default()).unwrap_err();
        assert_eq!(
            err,
            EliminationError::System(SystemError::ColumnOutOfRange { column: 0, n_vars: 0 })
        );

        let system = System::new(1, vec![row(&[1], 0, Relation::LessOrEqual)]).unwrap();
        let partition = Partition {
            negative: vec![],
            positive: vec![0],
        };
        assert!(Pairing::new(3).apply(&system, &partition).is_err());
    }

    #[test]
    fn test_row_limit() {
        let rows = (1..=3)
            .map(|i| row(&[i, 1], 0, Relation::LessOrEqual))
            .chain((1..=3).map(|i| row(&[i, -1], 0, Relation::LessOrEqual)))
            .collect();
        let mut system = System::new(2, rows).unwrap();
        let partition = step(&mut system, 1);
        let err = Pairing::new(1)
            .with_max_rows(Some(4))
            .apply(&system, &partition)
            .unwrap_err();
        assert_eq!(
            err,
            EliminationError::RowLimitExceeded {
                column: 1,
                rows: 5,
                limit: 4
            }
        );
    }
}
