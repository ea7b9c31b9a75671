use std::fmt;

use thiserror::Error;

use crate::equation::Equation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SystemError {
    #[error("Row {row} has {found} variable coefficients, expected {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("System has no equations to infer a variable count from")]
    EmptySystem,
    #[error("Column {column} is out of range for a system of {n_vars} variables")]
    ColumnOutOfRange { column: usize, n_vars: usize },
    #[error("Row {row} is out of range for a system of {len} rows")]
    RowOutOfRange { row: usize, len: usize },
}

/// An ordered set of rows that all share the same variable count.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    n_vars: usize,
    equations: Vec<Equation>,
}

impl System {
    /// Builds a system, rejecting any row whose width is not `n_vars`.
    pub fn new(n_vars: usize, equations: Vec<Equation>) -> Result<Self, SystemError> {
        for (row, equation) in equations.iter().enumerate() {
            if equation.n_vars() != n_vars {
                return Err(SystemError::DimensionMismatch {
                    row,
                    expected: n_vars,
                    found: equation.n_vars(),
                });
            }
        }
        Ok(Self { n_vars, equations })
    }

    pub fn empty(n_vars: usize) -> Self {
        Self {
            n_vars,
            equations: Vec::new(),
        }
    }

    /// Builds a system taking the variable count from the first row.
    pub fn from_equations(equations: Vec<Equation>) -> Result<Self, SystemError> {
        let n_vars = equations
            .first()
            .map(Equation::n_vars)
            .ok_or(SystemError::EmptySystem)?;
        Self::new(n_vars, equations)
    }

    pub fn push(&mut self, equation: Equation) -> Result<(), SystemError> {
        if equation.n_vars() != self.n_vars {
            return Err(SystemError::DimensionMismatch {
                row: self.equations.len(),
                expected: self.n_vars,
                found: equation.n_vars(),
            });
        }
        self.equations.push(equation);
        Ok(())
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn equation(&self, row: usize) -> Result<&Equation, SystemError> {
        self.equations.get(row).ok_or(SystemError::RowOutOfRange {
            row,
            len: self.equations.len(),
        })
    }

    pub fn into_equations(self) -> Vec<Equation> {
        self.equations
    }

    pub(crate) fn equations_mut(&mut self) -> &mut [Equation] {
        &mut self.equations
    }

    /// Exchanges two variable columns in every row.
    pub fn swap_columns(&mut self, a: usize, b: usize) -> Result<(), SystemError> {
        for column in [a, b] {
            if column >= self.n_vars {
                return Err(SystemError::ColumnOutOfRange {
                    column,
                    n_vars: self.n_vars,
                });
            }
        }
        if a != b {
            for equation in &mut self.equations {
                equation.swap_coefficients(a, b);
            }
        }
        Ok(())
    }

    /// Index of the first constant row that cannot hold.
    pub fn contradiction(&self) -> Option<usize> {
        self.equations.iter().position(Equation::is_contradiction)
    }

    pub fn display_with(&self, names: &[String]) -> String {
        let mut out = String::from("[\n");
        for equation in &self.equations {
            out.push_str("    ");
            out.push_str(&equation.display_with(names));
            out.push('\n');
        }
        out.push(']');
        out
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(&[]))
    }
}
