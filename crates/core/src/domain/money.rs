use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SCALE: u32 = 2;

/// A non-negative rupee amount held as whole paise.
///
/// Arithmetic never fails: subtraction saturates at zero and addition
/// saturates at the representable maximum. Derived amounts are rounded once,
/// half-up, to two decimal places by [`Money::multiply_by_rate`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(u64);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount `{0}` is negative")]
    Negative(Decimal),
    #[error("amount `{0}` has more than two decimal places")]
    ExcessPrecision(Decimal),
    #[error("amount `{0}` is out of range")]
    OutOfRange(Decimal),
    #[error("could not parse `{0}` as an amount")]
    Parse(String),
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(paise: u64) -> Self {
        Self(paise)
    }

    pub const fn from_major(rupees: u64) -> Self {
        Self(rupees.saturating_mul(100))
    }

    pub const fn minor_units(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Exact conversion; rejects negative values and sub-paisa precision.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative(value));
        }
        if value.normalize().scale() > SCALE {
            return Err(MoneyError::ExcessPrecision(value));
        }
        Self::from_paise_decimal(value, value * Decimal::ONE_HUNDRED)
    }

    /// Conversion that rounds half-up to whole paise instead of rejecting
    /// extra precision. Used for operator-entered coupon values.
    pub fn from_decimal_rounded(value: Decimal) -> Result<Self, MoneyError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative(value));
        }
        let paise = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(MoneyError::OutOfRange(value))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Self::from_paise_decimal(value, paise)
    }

    fn from_paise_decimal(original: Decimal, paise: Decimal) -> Result<Self, MoneyError> {
        paise.to_u64().map(Self).ok_or(MoneyError::OutOfRange(original))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), SCALE)
    }

    pub fn add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Clamped at zero: a discount larger than the amount yields zero rather
    /// than a negative price.
    pub fn subtract(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    pub fn times(self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(u64::from(quantity)))
    }

    /// Multiplies by a fractional rate (`0.05` for 5%) and rounds the result
    /// once, half-up, to whole paise. Negative rates yield zero.
    pub fn multiply_by_rate(self, rate: Decimal) -> Money {
        if rate.is_sign_negative() {
            return Money::ZERO;
        }
        match Decimal::from(self.0).checked_mul(rate) {
            Some(product) => product
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_u64()
                .map(Money)
                .unwrap_or(Money(u64::MAX)),
            None => Money(u64::MAX),
        }
    }
}

/// Converts a whole-number percentage (`12` for 12%) into a fractional rate.
pub fn percent(value: Decimal) -> Decimal {
    value / Decimal::ONE_HUNDRED
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(value.trim())
            .map_err(|_| MoneyError::Parse(value.to_string()))?;
        Self::from_decimal(decimal)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.to_decimal()
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Money::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
