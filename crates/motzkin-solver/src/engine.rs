use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info, trace};
use thiserror::Error;

use crate::feasibility::{FeasibilityChecker, Solution};
use crate::pairing::Pairing;
use crate::rational::RationalError;
use crate::step::{EliminationStep, Partition, StepOutcome};
use crate::system::{System, SystemError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EliminationError {
    #[error(transparent)]
    Arithmetic(#[from] RationalError),
    #[error(transparent)]
    System(#[from] SystemError),
    #[error("Eliminating column {column} produced {rows} rows, above the limit of {limit}")]
    RowLimitExceeded {
        column: usize,
        rows: usize,
        limit: usize,
    },
    #[error("Elimination interrupted before column {column}")]
    Interrupted { column: usize },
}

/// Shared flag a caller can trip to stop an elimination between rounds.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why the elimination loop stopped.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every column was eliminated; the column-0 partition is available
    Completed,
    /// The input had no rows
    EmptySystem,
    /// The input had no variable columns
    NoVariables,
    /// A round at `column` had no rows left to classify
    Vacuous { column: usize },
    /// Pairing at `column` produced a constant row that cannot hold
    Contradiction { column: usize },
}

/// Counts for a single elimination round.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundStats {
    /// Column eliminated in this round
    pub column: usize,
    /// Rows that bounded the variable from below
    pub lower: usize,
    /// Rows that bounded the variable from above
    pub upper: usize,
    /// Rows with a zero coefficient, carried over unchanged
    pub passthrough: usize,
    /// Rows in the system handed to the next round
    pub rows_out: usize,
}

/// Final state of an elimination run.
#[derive(Debug, Clone)]
pub struct Elimination {
    /// The last system, normalized on column 0 when elimination completed
    pub system: System,
    /// Partition of the last round, present when `termination` is `Completed`
    pub partition: Option<Partition>,
    pub rounds: Vec<RoundStats>,
    pub termination: Termination,
}

/// Fourier-Motzkin elimination driver
pub struct Eliminator {
    /// Upper limit on rows produced by one pairing round
    max_rows: Option<usize>,
    /// Point in time after which no new round starts
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl Default for Eliminator {
    fn default() -> Self {
        Self {
            max_rows: None,
            deadline: None,
            cancel: None,
        }
    }
}

impl Eliminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_rows(mut self, max: usize) -> Self {
        self.max_rows = Some(max);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Eliminate the variables from the last column down to column 0 and
    /// decide feasibility. The interval bounds the variable in column 0.
    pub fn solve(&self, system: System) -> Result<Solution, EliminationError> {
        let elimination = self.eliminate(system)?;
        let solution = FeasibilityChecker::check(&elimination);
        info!(
            "{:?} after {} rounds ({:?})",
            solution.status,
            solution.rounds.len(),
            solution.termination
        );
        Ok(solution)
    }

    /// Bounds for the variable in column `var`, found by swapping it into
    /// column 0 before solving.
    pub fn bounds_for(&self, system: &System, var: usize) -> Result<Solution, EliminationError> {
        let mut swapped = system.clone();
        swapped.swap_columns(0, var)?;
        self.solve(swapped)
    }

    /// One solution per variable, in column order.
    pub fn all_bounds(&self, system: &System) -> Result<Vec<Solution>, EliminationError> {
        (0..system.n_vars())
            .map(|var| self.bounds_for(system, var))
            .collect()
    }

    /// Runs the elimination loop. Column `i` is classified, then paired into
    /// a system without it, for `i` from `n_vars - 1` down to 1. Column 0 is
    /// only classified; its partition is what the feasibility check reads.
    pub fn eliminate(&self, system: System) -> Result<Elimination, EliminationError> {
        if system.is_empty() {
            return Ok(Elimination {
                system,
                partition: None,
                rounds: Vec::new(),
                termination: Termination::EmptySystem,
            });
        }
        if system.n_vars() == 0 {
            return Ok(Elimination {
                system,
                partition: None,
                rounds: Vec::new(),
                termination: Termination::NoVariables,
            });
        }

        let mut current = system;
        let mut rounds = Vec::new();
        let mut column = current.n_vars() - 1;

        loop {
            self.check_interrupt(column)?;
            trace!("eliminating column {}:\n{}", column, current);

            let partition = match EliminationStep::new(column).apply(&mut current)? {
                StepOutcome::Partitioned(partition) => partition,
                StepOutcome::Vacuous => {
                    debug!("column {}: no rows left", column);
                    return Ok(Elimination {
                        system: current,
                        partition: None,
                        rounds,
                        termination: Termination::Vacuous { column },
                    });
                }
            };

            let passthrough = partition
                .positive
                .iter()
                .filter(|&&row| current.equations()[row].coefficient(column).is_zero())
                .count();
            let mut stats = RoundStats {
                column,
                lower: partition.negative.len(),
                upper: partition.positive.len() - passthrough,
                passthrough,
                rows_out: current.len(),
            };

            if column == 0 {
                debug!(
                    "column 0: {} lower, {} upper, {} constant rows",
                    stats.lower, stats.upper, stats.passthrough
                );
                rounds.push(stats);
                return Ok(Elimination {
                    system: current,
                    partition: Some(partition),
                    rounds,
                    termination: Termination::Completed,
                });
            }

            let next = Pairing::new(column)
                .with_max_rows(self.max_rows)
                .apply(&current, &partition)?;
            stats.rows_out = next.len();
            debug!(
                "column {}: {} lower x {} upper, {} passed through -> {} rows",
                column, stats.lower, stats.upper, stats.passthrough, stats.rows_out
            );
            rounds.push(stats);
            current = next;

            if let Some(row) = current.contradiction() {
                debug!("column {}: row {} is a contradiction", column, row);
                return Ok(Elimination {
                    system: current,
                    partition: None,
                    rounds,
                    termination: Termination::Contradiction { column },
                });
            }

            column -= 1;
        }
    }

    /// Eliminates columns `n_vars - 1` down to `keep`, returning the system
    /// over the first `keep` variables. The result is the projection of the
    /// feasible region onto those variables.
    pub fn project(&self, system: System, keep: usize) -> Result<System, EliminationError> {
        let mut current = system;
        while current.n_vars() > keep {
            let column = current.n_vars() - 1;
            self.check_interrupt(column)?;
            current = match EliminationStep::new(column).apply(&mut current)? {
                StepOutcome::Partitioned(partition) => Pairing::new(column)
                    .with_max_rows(self.max_rows)
                    .apply(&current, &partition)?,
                StepOutcome::Vacuous => return Ok(System::empty(keep)),
            };
            debug!("projected out column {}: {} rows", column, current.len());
        }
        Ok(current)
    }

    fn check_interrupt(&self, column: usize) -> Result<(), EliminationError> {
        let cancelled = self.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if cancelled || expired {
            return Err(EliminationError::Interrupted { column });
        }
        Ok(())
    }
}
