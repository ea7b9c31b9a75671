use std::fmt;

use crate::rational::{Rational, RationalError};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Less than or equal (<=)
    LessOrEqual,
    /// Greater than or equal (>=)
    GreaterOrEqual,
}

impl Relation {
    /// The relation obtained after multiplying both sides by a negative value.
    pub fn flipped(self) -> Self {
        match self {
            Relation::LessOrEqual => Relation::GreaterOrEqual,
            Relation::GreaterOrEqual => Relation::LessOrEqual,
        }
    }

    pub fn holds(self, lhs: Rational, rhs: Rational) -> bool {
        match self {
            Relation::LessOrEqual => lhs <= rhs,
            Relation::GreaterOrEqual => lhs >= rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Relation::LessOrEqual => "<=",
            Relation::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single row `a0*x0 + ... + a(n-1)*x(n-1) + c ◁ 0`.
///
/// The coefficient vector always holds `n_vars + 1` entries, the last being
/// the constant term. Transformations return new rows; the only in-place
/// change is the normalization done while classifying a row for elimination.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    /// Variable coefficients followed by the constant term
    coeffs: Vec<Rational>,
    relation: Relation,
}

impl Equation {
    pub fn new(coefficients: Vec<Rational>, constant: Rational, relation: Relation) -> Self {
        let mut coeffs = coefficients;
        coeffs.push(constant);
        Self { coeffs, relation }
    }

    /// A row of `n_vars` zero coefficients and a zero constant.
    pub fn zeroed(n_vars: usize, relation: Relation) -> Self {
        Self {
            coeffs: vec![Rational::ZERO; n_vars + 1],
            relation,
        }
    }

    pub fn n_vars(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coefficients(&self) -> &[Rational] {
        &self.coeffs[..self.n_vars()]
    }

    /// # Panics
    ///
    /// Panics if `k` is not a variable column of this row.
    pub fn coefficient(&self, k: usize) -> Rational {
        self.coefficients()[k]
    }

    pub fn constant(&self) -> Rational {
        self.coeffs[self.n_vars()]
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// Drops the coefficient at `coeff_pos`, keeping every other entry and
    /// the relation unchanged.
    pub fn reduce(&self, coeff_pos: usize) -> Equation {
        let mut coeffs = self.coeffs.clone();
        coeffs.remove(coeff_pos);
        Equation {
            coeffs,
            relation: self.relation,
        }
    }

    /// Subtracts `other` from `self` entry by entry, skipping `coeff_pos`.
    ///
    /// With `self` an upper bound `x + P <= 0` and `other` a lower bound
    /// `x + N >= 0`, the result is `P - N <= 0`. The relation of `self` is kept.
    pub fn subtract(&self, other: &Equation, coeff_pos: usize) -> Result<Equation, RationalError> {
        let coeffs = self
            .coeffs
            .iter()
            .zip(&other.coeffs)
            .enumerate()
            .filter(|(i, _)| *i != coeff_pos)
            .map(|(_, (lhs, rhs))| lhs.checked_sub(*rhs))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Equation {
            coeffs,
            relation: self.relation,
        })
    }

    /// Multiplies the row by -1, reversing its relation.
    pub fn negated(&self) -> Equation {
        Equation {
            coeffs: self.coeffs.iter().map(|c| c.negate()).collect(),
            relation: self.relation.flipped(),
        }
    }

    /// The equivalent row using `<=`.
    pub fn to_upper_form(&self) -> Equation {
        match self.relation {
            Relation::LessOrEqual => self.clone(),
            Relation::GreaterOrEqual => self.negated(),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.coefficients().iter().all(Rational::is_zero)
    }

    /// A constant row `c ◁ 0` whose constant violates the relation.
    pub fn is_contradiction(&self) -> bool {
        self.is_constant() && !self.relation.holds(self.constant(), Rational::ZERO)
    }

    /// Left-hand side `Σ aᵢxᵢ + c` at `point`, which must have `n_vars` entries.
    pub fn evaluate_at(&self, point: &[Rational]) -> Result<Rational, RationalError> {
        let mut total = self.constant();
        for (coeff, value) in self.coefficients().iter().zip(point) {
            total = total.checked_add(coeff.checked_mul(*value)?)?;
        }
        Ok(total)
    }

    pub fn is_satisfied_by(&self, point: &[Rational]) -> Result<bool, RationalError> {
        let value = self.evaluate_at(point)?;
        Ok(self.relation.holds(value, Rational::ZERO))
    }

    /// Divides every other entry by the coefficient at `column`, sets that
    /// coefficient to one and flips the relation when the divisor is negative.
    pub(crate) fn normalize_on(&mut self, column: usize) -> Result<(), RationalError> {
        let divisor = self.coeffs[column];
        for (i, coeff) in self.coeffs.iter_mut().enumerate() {
            if i != column {
                *coeff = coeff.checked_div(divisor)?;
            }
        }
        self.coeffs[column] = Rational::ONE;
        if divisor.is_negative() {
            self.relation = self.relation.flipped();
        }
        Ok(())
    }

    pub(crate) fn swap_coefficients(&mut self, a: usize, b: usize) {
        self.coeffs.swap(a, b);
    }

    /// Renders the row as `3x - 1/2y <= 4`, naming column `i` with `names[i]`
    /// (or `x{i}` when no name is given).
    pub fn display_with(&self, names: &[String]) -> String {
        let mut out = String::new();
        for (i, coeff) in self.coefficients().iter().enumerate() {
            if coeff.is_zero() {
                continue;
            }
            let name = names.get(i).cloned().unwrap_or_else(|| format!("x{}", i));
            let magnitude = coeff.abs();
            let sign = if coeff.is_negative() { "-" } else { "+" };
            if out.is_empty() {
                if coeff.is_negative() {
                    out.push('-');
                }
            } else {
                out.push_str(&format!(" {} ", sign));
            }
            if magnitude != Rational::ONE {
                out.push_str(&magnitude.to_string());
            }
            out.push_str(&name);
        }
        if out.is_empty() {
            out.push('0');
        }
        format!("{} {} {}", out, self.relation, self.constant().negate())
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(coeffs: &[i32], constant: i32, relation: Relation) -> Equation {
        Equation::new(
            coeffs.iter().map(|&c| Rational::from(c)).collect(),
            Rational::from(constant),
            relation,
        )
    }

    #[test]
    fn test_layout() {
        let e = row(&[1, 2, 3], -4, Relation::LessOrEqual);
        assert_eq!(e.n_vars(), 3);
        assert_eq!(e.coefficient(1), Rational::from(2));
        assert_eq!(e.constant(), Rational::from(-4));

        let z = Equation::zeroed(2, Relation::GreaterOrEqual);
        assert_eq!(z.n_vars(), 2);
        assert!(z.is_constant());
    }

    #[test]
    fn test_reduce_drops_one_column() {
        let e = row(&[1, 0, 3], -4, Relation::GreaterOrEqual);
        let reduced = e.reduce(1);
        assert_eq!(reduced, row(&[1, 3], -4, Relation::GreaterOrEqual));
    }

    #[test]
    fn test_subtract_skips_eliminated_column() {
        let upper = row(&[2, 1], -10, Relation::LessOrEqual);
        let lower = row(&[-1, 1], 0, Relation::GreaterOrEqual);
        let combined = upper.subtract(&lower, 1).unwrap();
        assert_eq!(combined, row(&[3], -10, Relation::LessOrEqual));
    }

    #[test]
    fn test_upper_form() {
        let e = row(&[1, -1], -2, Relation::GreaterOrEqual);
        assert_eq!(e.to_upper_form(), row(&[-1, 1], 2, Relation::LessOrEqual));
        let le = row(&[1], -5, Relation::LessOrEqual);
        assert_eq!(le.to_upper_form(), le);
    }

    #[test]
    fn test_normalize_on_negative_flips() {
        let mut e = row(&[4, -2], 6, Relation::LessOrEqual);
        e.normalize_on(1).unwrap();
        assert_eq!(e, row(&[-2, 1], -3, Relation::GreaterOrEqual));
    }

    #[test]
    fn test_normalize_on_positive_keeps_relation() {
        let mut e = row(&[3, 2], -1, Relation::LessOrEqual);
        e.normalize_on(1).unwrap();
        assert_eq!(e.coefficient(0), Rational::new(3, 2).unwrap());
        assert_eq!(e.coefficient(1), Rational::ONE);
        assert_eq!(e.constant(), Rational::new(-1, 2).unwrap());
        assert_eq!(e.relation(), Relation::LessOrEqual);
    }

    #[test]
    fn test_contradiction() {
        // 0 + 3 <= 0 cannot hold
        assert!(row(&[0, 0], 3, Relation::LessOrEqual).is_contradiction());
        assert!(!row(&[0, 0], -3, Relation::LessOrEqual).is_contradiction());
        assert!(row(&[0], -1, Relation::GreaterOrEqual).is_contradiction());
        assert!(!row(&[0], 0, Relation::GreaterOrEqual).is_contradiction());
        // not constant, so never a direct contradiction
        assert!(!row(&[1], 3, Relation::LessOrEqual).is_contradiction());
    }

    #[test]
    fn test_satisfied_by() {
        // x + y - 10 <= 0
        let e = row(&[1, 1], -10, Relation::LessOrEqual);
        assert!(e.is_satisfied_by(&[Rational::from(4), Rational::from(6)]).unwrap());
        assert!(!e.is_satisfied_by(&[Rational::from(5), Rational::from(6)]).unwrap());
    }

    #[test]
    fn test_display() {
        let e = Equation::new(
            vec![Rational::from(1), Rational::new(-1, 2).unwrap(), Rational::ZERO],
            Rational::from(-4),
            Relation::LessOrEqual,
        );
        assert_eq!(e.to_string(), "x0 - 1/2x1 <= 4");
        let names = vec!["x".to_string(), "y".to_string()];
        assert_eq!(row(&[-3, 1], 0, Relation::GreaterOrEqual).display_with(&names), "-3x + y >= 0");
        assert_eq!(row(&[0], 2, Relation::LessOrEqual).to_string(), "0 <= -2");
    }
}
