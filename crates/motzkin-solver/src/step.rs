use log::trace;

use crate::engine::EliminationError;
use crate::equation::Relation;
use crate::system::{System, SystemError};

/// Row indices of a system split by the sign of one variable's coefficient.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Rows whose coefficient was negative; after normalization they read
    /// `x + N >= 0`, i.e. lower bounds on `x`
    pub negative: Vec<usize>,
    /// Rows whose coefficient was positive (upper bounds `x + P <= 0`),
    /// together with rows whose coefficient was zero
    pub positive: Vec<usize>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.negative.is_empty() && self.positive.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The rows were classified and normalized
    Partitioned(Partition),
    /// There were no rows to classify
    Vacuous,
}

/// Classifies and normalizes every row of a system on one column.
#[derive(Debug, Clone, Copy)]
pub struct EliminationStep {
    column: usize,
}

impl EliminationStep {
    pub fn new(column: usize) -> Self {
        Self { column }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// A row with a zero coefficient is left untouched and filed as positive.
    /// Any other row is first rewritten with `<=`, so the sign of the
    /// coefficient alone tells upper bounds from lower bounds, then divided
    /// by its coefficient, which becomes one.
    pub fn apply(&self, system: &mut System) -> Result<StepOutcome, EliminationError> {
        let n_vars = system.n_vars();
        if self.column >= n_vars {
            return Err(SystemError::ColumnOutOfRange {
                column: self.column,
                n_vars,
            }
            .into());
        }

        let mut partition = Partition::default();
        for (index, equation) in system.equations_mut().iter_mut().enumerate() {
            if equation.coefficient(self.column).is_zero() {
                partition.positive.push(index);
                continue;
            }

            if equation.relation() == Relation::GreaterOrEqual {
                *equation = equation.negated();
            }

            let divisor = equation.coefficient(self.column);

            equation.normalize_on(self.column)?;
            if divisor.is_negative() {
                partition.negative.push(index);
            } else {
                partition.positive.push(index);
            }
        }

        if partition.is_empty() {
            return Ok(StepOutcome::Vacuous);
        }

        trace!(
            "column {}: negative {:?}, positive {:?}",
            self.column, partition.negative, partition.positive
        );
        Ok(StepOutcome::Partitioned(partition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::Equation;
    use crate::rational::Rational;

    fn row(coeffs: &[i32], constant: i32, relation: Relation) -> Equation {
        Equation::new(
            coeffs.iter().map(|&c| Rational::from(c)).collect(),
            Rational::from(constant),
            relation,
        )
    }

    fn partitioned(outcome: StepOutcome) -> Partition {
        match outcome {
            StepOutcome::Partitioned(p) => p,
            StepOutcome::Vacuous => panic!("Expected a partition"),
        }
    }

    #[test]
    fn test_classifies_by_sign() {
        let mut system = System::new(
            2,
            vec![
                row(&[1, 2], -4, Relation::LessOrEqual),
                row(&[1, -3], 0, Relation::LessOrEqual),
                row(&[5, 0], -1, Relation::LessOrEqual),
            ],
        )
        .unwrap();

        let partition = partitioned(EliminationStep::new(1).apply(&mut system).unwrap());
        assert_eq!(partition.negative, vec![1]);
        assert_eq!(partition.positive, vec![0, 2]);

        let rows = system.equations();
        // x/2 + y - 2 <= 0
        assert_eq!(rows[0].coefficient(0), Rational::new(1, 2).unwrap());
        assert_eq!(rows[0].coefficient(1), Rational::ONE);
        assert_eq!(rows[0].constant(), Rational::from(-2));
        assert_eq!(rows[0].relation(), Relation::LessOrEqual);
        // -x/3 + y >= 0
        assert_eq!(rows[1].coefficient(0), Rational::new(-1, 3).unwrap());
        assert_eq!(rows[1].relation(), Relation::GreaterOrEqual);
        // zero coefficient: untouched
        assert_eq!(rows[2], row(&[5, 0], -1, Relation::LessOrEqual));
    }

    #[test]
    fn test_greater_or_equal_rows_are_oriented_first() {
        // y >= 3  ->  -y + 3 <= 0  ->  lower bound
        let mut system = System::new(1, vec![row(&[1], -3, Relation::GreaterOrEqual)]).unwrap();
        let partition = partitioned(EliminationStep::new(0).apply(&mut system).unwrap());
        assert_eq!(partition.negative, vec![0]);
        assert!(partition.positive.is_empty());
        assert_eq!(system.equations()[0], row(&[1], -3, Relation::GreaterOrEqual));
    }

    #[test]
    fn test_zero_coefficient_rows_are_untouched() {
        let mut system = System::new(
            2,
            vec![
                row(&[1, 0], -3, Relation::GreaterOrEqual),
                row(&[2, 0], 5, Relation::LessOrEqual),
            ],
        )
        .unwrap();
        let original = system.clone();
        let partition = partitioned(EliminationStep::new(1).apply(&mut system).unwrap());
        assert_eq!(partition.positive, vec![0, 1]);
        assert!(partition.negative.is_empty());
        assert_eq!(system, original);
    }

    #[test]
    fn test_vacuous_round() {
        let mut system = System::empty(3);
        assert_eq!(
            EliminationStep::new(2).apply(&mut system).unwrap(),
            StepOutcome::Vacuous
        );
    }

    #[test]
    fn test_column_out_of_range() {
        let mut system = System::new(1, vec![row(&[1], 0, Relation::LessOrEqual)]).unwrap();
        let err = EliminationStep::new(1).apply(&mut system).unwrap_err();
        assert_eq!(
            err,
            EliminationError::System(SystemError::ColumnOutOfRange { column: 1, n_vars: 1 })
        );
    }
}
