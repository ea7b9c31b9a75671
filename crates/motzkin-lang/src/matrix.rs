//! Whitespace matrix format used by the benchmark inputs.
//!
//! The `A` file holds `nEqn nVar` followed by `nEqn * nVar` coefficients in
//! row-major order. The `c` file holds a count followed by `nEqn` right-hand
//! sides. Row `i` reads `Σ A[i][j] x_j <= c[i]`.

use std::path::Path;

use log::debug;
use motzkin_solver::{Equation, Rational, Relation, System, SystemError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Missing header in {file} file (A starts with `nEqn nVar`, c with a count)")]
    MissingHeader { file: &'static str },
    #[error("Invalid value {text:?} in {file} file")]
    InvalidValue { file: &'static str, text: String },
    #[error("Expected {expected} values in {file} file, found {found}")]
    Truncated {
        file: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Unexpected trailing value {text:?} in {file} file")]
    TrailingValue { file: &'static str, text: String },
    #[error("The c file declares {declared} constants but the A file has {rows} rows")]
    CountMismatch { declared: usize, rows: usize },
    #[error("IO error: {0}")]
    IoError(String),
    #[error(transparent)]
    System(#[from] SystemError),
}

fn read_count(file: &'static str, text: Option<&str>) -> Result<usize, MatrixError> {
    let text = text.ok_or(MatrixError::MissingHeader { file })?;
    text.parse().map_err(|_| MatrixError::InvalidValue {
        file,
        text: text.to_string(),
    })
}

fn read_values<'a>(
    file: &'static str,
    tokens: &mut impl Iterator<Item = &'a str>,
    expected: usize,
) -> Result<Vec<Rational>, MatrixError> {
    // grows as values arrive; the header alone does not size the buffer
    let mut values = Vec::new();
    for found in 0..expected {
        let text = tokens.next().ok_or(MatrixError::Truncated {
            file,
            expected,
            found,
        })?;
        let value = text.parse().map_err(|_| MatrixError::InvalidValue {
            file,
            text: text.to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

fn ensure_consumed<'a>(
    file: &'static str,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<(), MatrixError> {
    match tokens.next() {
        Some(text) => Err(MatrixError::TrailingValue {
            file,
            text: text.to_string(),
        }),
        None => Ok(()),
    }
}

/// Builds the system `A x <= c` from the contents of the two files.
pub fn parse_matrix(a_source: &str, c_source: &str) -> Result<System, MatrixError> {
    let mut a_tokens = a_source.split_whitespace();
    let n_eqn = read_count("A", a_tokens.next())?;
    let n_var = read_count("A", a_tokens.next())?;
    let n_coefficients = n_eqn
        .checked_mul(n_var)
        .ok_or_else(|| MatrixError::InvalidValue {
            file: "A",
            text: format!("{} {}", n_eqn, n_var),
        })?;
    let coefficients = read_values("A", &mut a_tokens, n_coefficients)?;
    ensure_consumed("A", &mut a_tokens)?;

    let mut c_tokens = c_source.split_whitespace();
    let declared = read_count("c", c_tokens.next())?;
    if declared != n_eqn {
        return Err(MatrixError::CountMismatch {
            declared,
            rows: n_eqn,
        });
    }
    let constants = read_values("c", &mut c_tokens, n_eqn)?;
    ensure_consumed("c", &mut c_tokens)?;

    let equations = constants
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let row = coefficients[i * n_var..(i + 1) * n_var].to_vec();
            Equation::new(row, c.negate(), Relation::LessOrEqual)
        })
        .collect();

    debug!("read {}x{} matrix", n_eqn, n_var);
    Ok(System::new(n_var, equations)?)
}

pub fn load_matrix(
    a_path: impl AsRef<Path>,
    c_path: impl AsRef<Path>,
) -> Result<System, MatrixError> {
    let read = |path: &Path| {
        std::fs::read_to_string(path)
            .map_err(|e| MatrixError::IoError(format!("{}: {}", path.display(), e)))
    };
    let a_source = read(a_path.as_ref())?;
    let c_source = read(c_path.as_ref())?;
    parse_matrix(&a_source, &c_source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motzkin_solver::Eliminator;

    #[test]
    fn test_parse_matrix() {
        // x + y <= 10, -x + y <= -2, -y <= 0
        let a = "3 2\n1 1\n-1 1\n0 -1\n";
        let c = "3\n10\n-2\n0\n";
        let system = parse_matrix(a, c).unwrap();
        assert_eq!(system.n_vars(), 2);
        assert_eq!(system.len(), 3);
        assert_eq!(
            system.equations()[1],
            Equation::new(
                vec![Rational::from(-1), Rational::from(1)],
                Rational::from(2),
                Relation::LessOrEqual
            )
        );

        let solution = Eliminator::new().solve(system).unwrap();
        assert!(solution.is_feasible());
        let interval = solution.interval.unwrap();
        assert_eq!(interval.lower, Some(Rational::from(2)));
        assert_eq!(interval.upper, Some(Rational::from(10)));
    }

    #[test]
    fn test_truncated_a_file() {
        let err = parse_matrix("2 2\n1 1\n1", "2\n1\n1").unwrap_err();
        assert_eq!(
            err,
            MatrixError::Truncated {
                file: "A",
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_truncated_c_file() {
        let err = parse_matrix("2 1\n1\n-1", "2\n5").unwrap_err();
        assert!(matches!(err, MatrixError::Truncated { file: "c", .. }));
    }

    #[test]
    fn test_trailing_value() {
        let err = parse_matrix("1 1\n1 7", "1\n5").unwrap_err();
        assert_eq!(
            err,
            MatrixError::TrailingValue {
                file: "A",
                text: "7".to_string()
            }
        );
    }

    #[test]
    fn test_header_product_overflows() {
        let err = parse_matrix("4294967296 4294967296
1", "1
1").unwrap_err();
        assert_eq!(
            err,
            MatrixError::InvalidValue {
                file: "A",
                text: "4294967296 4294967296".to_string()
            }
        );
    }

    #[test]
    fn test_oversized_header_with_few_values() {
        let err = parse_matrix("100000000000 1000
1 2 3", "1
1").unwrap_err();
        assert_eq!(
            err,
            MatrixError::Truncated {
                file: "A",
                expected: 100_000_000_000_000,
                found: 3
            }
        );
    }

    #[test]
    fn test_count_mismatch() {
        let err = parse_matrix("1 1\n1", "2\n5\n6").unwrap_err();
        assert_eq!(err, MatrixError::CountMismatch { declared: 2, rows: 1 });
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            parse_matrix("", "0").unwrap_err(),
            MatrixError::MissingHeader { file: "A" }
        );
        assert_eq!(
            parse_matrix("0 3", "").unwrap_err(),
            MatrixError::MissingHeader { file: "c" }
        );
        assert!(matches!(
            parse_matrix("two 1\n1", "1\n1").unwrap_err(),
            MatrixError::InvalidValue { file: "A", .. }
        ));
    }
}
