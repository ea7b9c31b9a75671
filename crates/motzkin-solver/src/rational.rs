use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RationalError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Zero denominator in {numerator}/0")]
    ZeroDenominator { numerator: i64 },
    #[error("Rational overflow: result does not fit in 64 bits")]
    Overflow,
    #[error("Invalid rational: {0}")]
    Invalid(String),
}

/// Exact fraction with a strictly positive denominator.
///
/// Values are kept in lowest terms with the sign on the numerator. Equality
/// and ordering compare cross-products in 128-bit arithmetic, so they never
/// go through floating point. `i64::MIN` is never stored, which keeps
/// negation infallible.
#[derive(Debug, Clone, Copy)]
pub struct Rational {
    numerator: i64,
    denominator: i64,
}

impl Rational {
    pub const ZERO: Rational = Rational {
        numerator: 0,
        denominator: 1,
    };
    pub const ONE: Rational = Rational {
        numerator: 1,
        denominator: 1,
    };

    pub fn new(numerator: i64, denominator: i64) -> Result<Self, RationalError> {
        if denominator == 0 {
            return Err(RationalError::ZeroDenominator { numerator });
        }
        Self::from_wide(numerator as i128, denominator as i128)
    }

    pub fn from_integer(value: i64) -> Result<Self, RationalError> {
        Self::new(value, 1)
    }

    /// Sign-normalizes, reduces and narrows a fraction computed in `i128`.
    /// The caller guarantees `denominator != 0`.
    fn from_wide(numerator: i128, denominator: i128) -> Result<Self, RationalError> {
        let (mut num, mut den) = if denominator < 0 {
            (
                numerator.checked_neg().ok_or(RationalError::Overflow)?,
                denominator.checked_neg().ok_or(RationalError::Overflow)?,
            )
        } else {
            (numerator, denominator)
        };

        let divisor = gcd(num.unsigned_abs(), den.unsigned_abs());
        if divisor > 1 {
            // divisor divides both, and both fit in i128
            num /= divisor as i128;
            den /= divisor as i128;
        }

        Ok(Self {
            numerator: narrow(num)?,
            denominator: narrow(den)?,
        })
    }

    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn is_positive(&self) -> bool {
        self.numerator > 0
    }

    pub fn is_negative(&self) -> bool {
        self.numerator < 0
    }

    pub fn signum(&self) -> i64 {
        self.numerator.signum()
    }

    pub fn abs(self) -> Self {
        Self {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    pub fn negate(self) -> Self {
        Self {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, RationalError> {
        if self.denominator == rhs.denominator {
            return Self::from_wide(
                self.numerator as i128 + rhs.numerator as i128,
                self.denominator as i128,
            );
        }
        Self::from_wide(
            self.numerator as i128 * rhs.denominator as i128
                + rhs.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * rhs.denominator as i128,
        )
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, RationalError> {
        if self.denominator == rhs.denominator {
            return Self::from_wide(
                self.numerator as i128 - rhs.numerator as i128,
                self.denominator as i128,
            );
        }
        Self::from_wide(
            self.numerator as i128 * rhs.denominator as i128
                - rhs.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * rhs.denominator as i128,
        )
    }

    pub fn checked_mul(self, rhs: Self) -> Result<Self, RationalError> {
        Self::from_wide(
            self.numerator as i128 * rhs.numerator as i128,
            self.denominator as i128 * rhs.denominator as i128,
        )
    }

    /// Divides by the scalar `rhs`. Fails with `DivisionByZero` when
    /// `rhs` has a zero numerator.
    pub fn checked_div(self, rhs: Self) -> Result<Self, RationalError> {
        if rhs.numerator == 0 {
            return Err(RationalError::DivisionByZero);
        }
        Self::from_wide(
            self.numerator as i128 * rhs.denominator as i128,
            self.denominator as i128 * rhs.numerator as i128,
        )
    }

    /// Floating value, for display and interval output only.
    pub fn evaluate(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    fn parse_decimal(text: &str) -> Result<Self, RationalError> {
        let invalid = || RationalError::Invalid(text.to_string());
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = digits.split_once('.').ok_or_else(invalid)?;
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let mut numerator: i128 = 0;
        for c in whole.chars().chain(fraction.chars()) {
            let digit = c.to_digit(10).ok_or_else(invalid)?;
            numerator = numerator
                .checked_mul(10)
                .and_then(|n| n.checked_add(i128::from(digit)))
                .ok_or(RationalError::Overflow)?;
        }
        let scale = u32::try_from(fraction.len()).map_err(|_| RationalError::Overflow)?;
        let denominator = 10i128.checked_pow(scale).ok_or(RationalError::Overflow)?;

        if negative {
            numerator = -numerator;
        }
        Self::from_wide(numerator, denominator)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn narrow(value: i128) -> Result<i64, RationalError> {
    if value > i64::MAX as i128 || value < -(i64::MAX as i128) {
        return Err(RationalError::Overflow);
    }
    Ok(value as i64)
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i32> for Rational {
    fn from(value: i32) -> Self {
        Self {
            numerator: value as i64,
            denominator: 1,
        }
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.numerator as i128 * other.denominator as i128;
        let rhs = other.numerator as i128 * self.denominator as i128;
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rational {}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Rational {
    type Err = RationalError;

    /// Accepts `7`, `-3/4` and `2.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if let Some((num, den)) = text.split_once('/') {
            let numerator: i64 = num
                .trim()
                .parse()
                .map_err(|_| RationalError::Invalid(text.to_string()))?;
            let denominator: i64 = den
                .trim()
                .parse()
                .map_err(|_| RationalError::Invalid(text.to_string()))?;
            return Self::new(numerator, denominator);
        }
        if text.contains('.') {
            return Self::parse_decimal(text);
        }
        let value: i64 = text
            .parse()
            .map_err(|_| RationalError::Invalid(text.to_string()))?;
        Self::from_integer(value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Rational {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Rational {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
