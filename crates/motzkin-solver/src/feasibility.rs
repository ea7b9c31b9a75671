use std::fmt;

use crate::engine::{Elimination, RoundStats, Termination};
use crate::rational::Rational;
use crate::step::Partition;
use crate::system::System;

/// The result of running elimination on a system
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    /// Feasibility verdict
    pub status: SolutionStatus,
    /// Admissible values of the variable in column 0 (feasible systems with
    /// at least one variable only)
    pub interval: Option<Interval>,
    /// Why elimination stopped
    pub termination: Termination,
    /// Per-round row counts
    pub rounds: Vec<RoundStats>,
    /// Rows that could not be satisfied (populated when infeasible)
    pub conflicts: Vec<Conflict>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Some assignment satisfies every row
    Feasible,
    /// No assignment satisfies every row
    Infeasible,
}

/// Closed interval `[lower, upper]`; a missing side is unbounded.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lower: Option<Rational>,
    pub upper: Option<Rational>,
}

/// Information about a row, or pair of rows, that cannot hold
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Indices into the final system
    pub rows: Vec<usize>,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    pub fn feasible(
        interval: Option<Interval>,
        termination: Termination,
        rounds: Vec<RoundStats>,
    ) -> Self {
        Self {
            status: SolutionStatus::Feasible,
            interval,
            termination,
            rounds,
            conflicts: Vec::new(),
        }
    }

    pub fn infeasible(
        conflicts: Vec<Conflict>,
        termination: Termination,
        rounds: Vec<RoundStats>,
    ) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            interval: None,
            termination,
            rounds,
            conflicts,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.status == SolutionStatus::Feasible
    }
}

impl Interval {
    pub fn new(lower: Option<Rational>, upper: Option<Rational>) -> Self {
        Self { lower, upper }
    }

    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.lower, self.upper), (Some(lower), Some(upper)) if lower > upper)
    }

    pub fn contains(&self, value: Rational) -> bool {
        self.lower.is_none_or(|lower| lower <= value)
            && self.upper.is_none_or(|upper| value <= upper)
    }

    /// Floating endpoints, with infinities for missing sides.
    pub fn to_f64(&self) -> (f64, f64) {
        (
            self.lower.map_or(f64::NEG_INFINITY, |lower| lower.evaluate()),
            self.upper.map_or(f64::INFINITY, |upper| upper.evaluate()),
        )
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Some(lower) => write!(f, "[{}", lower)?,
            None => write!(f, "(-inf")?,
        }
        match self.upper {
            Some(upper) => write!(f, ", {}]", upper),
            None => write!(f, ", inf)"),
        }
    }
}

impl Conflict {
    fn constant_row(row: usize, system: &System) -> Self {
        let description = match system.equation(row) {
            Ok(equation) => format!("Row {} reduces to {}, which never holds", row, equation),
            Err(_) => format!("Row {} never holds", row),
        };
        Self {
            rows: vec![row],
            description,
        }
    }
}

/// Reads the final state of an elimination and decides feasibility.
pub struct FeasibilityChecker;

impl FeasibilityChecker {
    pub fn check(elimination: &Elimination) -> Solution {
        let rounds = elimination.rounds.clone();
        let termination = elimination.termination;
        let system = &elimination.system;
        let first_variable = (system.n_vars() > 0).then(Interval::unbounded);

        match (termination, &elimination.partition) {
            (Termination::Completed, Some(partition)) => {
                let (conflicts, interval) = Self::check_partition(system, partition);
                if conflicts.is_empty() {
                    Solution::feasible(Some(interval), termination, rounds)
                } else {
                    Solution::infeasible(conflicts, termination, rounds)
                }
            }
            (Termination::EmptySystem, _) => {
                Solution::feasible(first_variable, termination, rounds)
            }
            // the remaining columns were never constrained
            (Termination::Vacuous { .. }, _) => {
                Solution::feasible(Some(Interval::unbounded()), termination, rounds)
            }
            _ => {
                let conflicts = Self::check_constant_rows(system);
                if conflicts.is_empty() {
                    Solution::feasible(first_variable, termination, rounds)
                } else {
                    Solution::infeasible(conflicts, termination, rounds)
                }
            }
        }
    }

    /// Every constant row whose constant violates its relation.
    pub fn check_constant_rows(system: &System) -> Vec<Conflict> {
        system
            .equations()
            .iter()
            .enumerate()
            .filter(|(_, equation)| equation.is_contradiction())
            .map(|(row, _)| Conflict::constant_row(row, system))
            .collect()
    }

    /// Reads a system normalized on column 0.
    ///
    /// A positive row `x + c <= 0` bounds `x` above by `-c` and a negative row
    /// `x + c >= 0` bounds it below by `-c`. Positive rows with a zero
    /// coefficient carry no bound and are checked as constants instead. The
    /// system is feasible when no constant row fails and the greatest lower
    /// bound does not exceed the least upper bound.
    pub fn check_partition(system: &System, partition: &Partition) -> (Vec<Conflict>, Interval) {
        let mut conflicts = Vec::new();
        let mut upper: Option<(Rational, usize)> = None;
        let mut lower: Option<(Rational, usize)> = None;

        let rows = system.equations();

        for &row in &partition.positive {
            let equation = &rows[row];
            if equation.coefficient(0).is_zero() {
                if equation.is_contradiction() {
                    conflicts.push(Conflict::constant_row(row, system));
                }
                continue;
            }
            let bound = equation.constant().negate();
            if upper.is_none_or(|(current, _)| bound < current) {
                upper = Some((bound, row));
            }
        }

        for &row in &partition.negative {
            let equation = &rows[row];
            let bound = equation.constant().negate();
            if lower.is_none_or(|(current, _)| bound > current) {
                lower = Some((bound, row));
            }
        }

        if let (Some((low, low_row)), Some((high, high_row))) = (lower, upper) {
            if low > high {
                conflicts.push(Conflict {
                    rows: vec![low_row, high_row],
                    description: format!(
                        "Lower bound {} from row {} exceeds upper bound {} from row {}",
                        low, low_row, high, high_row
                    ),
                });
            }
        }

        let interval = Interval::new(lower.map(|(bound, _)| bound), upper.map(|(bound, _)| bound));
        (conflicts, interval)
    }
}
