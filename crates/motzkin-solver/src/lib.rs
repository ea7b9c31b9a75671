mod engine;
mod equation;
mod feasibility;
mod pairing;
mod rational;
mod step;
mod system;

#[cfg(test)]
mod proptests;

pub use engine::{CancelToken, Elimination, EliminationError, Eliminator, RoundStats, Termination};
pub use equation::{Equation, Relation};
pub use feasibility::{Conflict, FeasibilityChecker, Interval, Solution, SolutionStatus};
pub use pairing::Pairing;
pub use rational::{Rational, RationalError};
pub use step::{EliminationStep, Partition, StepOutcome};
pub use system::{System, SystemError};
