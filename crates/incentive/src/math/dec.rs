//! Non-negative fixed-point decimal with 18 fractional digits.

use primitive_types::{U256, U512};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by [`Dec`].
pub const PRECISION: usize = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid decimal {0:?}")]
    Parse(String),
}

/// Decimal stored as an integer scaled by 10^18.
///
/// Every operation that loses precision rounds half to even, so repeated
/// accrual does not drift in one direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(U256);

fn scale() -> U256 {
    U256::exp10(PRECISION)
}

fn div_half_even(numerator: U512, denominator: U512) -> U512 {
    let (quotient, remainder) = numerator.div_mod(denominator);
    // remainder < denominator <= 2^256, so doubling cannot overflow U512
    let twice = remainder << 1;
    match twice.cmp(&denominator) {
        Ordering::Greater => quotient + U512::one(),
        Ordering::Equal if quotient.bit(0) => quotient + U512::one(),
        _ => quotient,
    }
}

fn narrow(value: U512) -> Result<U256, MathError> {
    U256::try_from(value).map_err(|_| MathError::Overflow)
}

impl Dec {
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn one() -> Self {
        Self(scale())
    }

    pub fn from_int(n: u128) -> Self {
        // u128 * 10^18 stays well under 2^256
        Self(U256::from(n) * scale())
    }

    /// Builds a decimal from its raw scaled representation (`raw / 10^18`).
    pub fn from_scaled(raw: u128) -> Self {
        Self(U256::from(raw))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: &Dec) -> Result<Dec, MathError> {
        self.0
            .checked_add(other.0)
            .map(Dec)
            .ok_or(MathError::Overflow)
    }

    /// Returns `None` when the result would be negative.
    pub fn checked_sub(&self, other: &Dec) -> Option<Dec> {
        self.0.checked_sub(other.0).map(Dec)
    }

    pub fn mul(&self, other: &Dec) -> Result<Dec, MathError> {
        let product = self.0.full_mul(other.0);
        narrow(div_half_even(product, U512::from(scale()))).map(Dec)
    }

    pub fn quo(&self, other: &Dec) -> Result<Dec, MathError> {
        if other.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let numerator = self.0.full_mul(scale());
        narrow(div_half_even(numerator, U512::from(other.0))).map(Dec)
    }

    pub fn mul_int(&self, n: u128) -> Result<Dec, MathError> {
        self.0
            .checked_mul(U256::from(n))
            .map(Dec)
            .ok_or(MathError::Overflow)
    }

    /// Rounds to the nearest integer, ties to even.
    pub fn round_int(&self) -> Result<u128, MathError> {
        let rounded = narrow(div_half_even(U512::from(self.0), U512::from(scale())))?;
        if rounded > U256::from(u128::MAX) {
            return Err(MathError::Overflow);
        }
        Ok(rounded.low_u128())
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (integer, fraction) = self.0.div_mod(scale());
        write!(f, "{}.{:0>width$}", integer, fraction.to_string(), width = PRECISION)
    }
}

impl FromStr for Dec {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || MathError::Parse(s.to_string());
        let trimmed = s.trim();
        let (integer, fraction) = match trimmed.split_once('.') {
            Some((i, f)) => (i, f),
            None => (trimmed, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if integer.is_empty() || !all_digits(integer) || !all_digits(fraction) {
            return Err(parse_err());
        }
        if trimmed.contains('.') && fraction.is_empty() {
            return Err(parse_err());
        }
        if fraction.len() > PRECISION {
            return Err(parse_err());
        }

        let whole = U256::from_dec_str(integer).map_err(|_| parse_err())?;
        let mut raw = whole.checked_mul(scale()).ok_or(MathError::Overflow)?;
        if !fraction.is_empty() {
            let digits = U256::from_dec_str(fraction).map_err(|_| parse_err())?;
            let padded = digits * U256::exp10(PRECISION - fraction.len());
            raw = raw.checked_add(padded).ok_or(MathError::Overflow)?;
        }
        Ok(Dec(raw))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
