use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
};

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

//--------------------------------------     MinorUnits       --------------------------------------------------------
/// A monetary amount in the smallest unit of its currency (cents for USD and friends). Payment providers charge in
/// minor units, while the catalog stores prices as decimals, so conversions happen through [`MinorUnits::from_decimal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);
op!(inplace MinorUnits, SubAssign, sub_assign);
op!(unary MinorUnits, Neg, neg);

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Convert a decimal price (2 decimal places) to minor units, rounding to the nearest whole unit.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyConversionError> {
        value
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|v| v.round())
            .and_then(|v| v.to_i64())
            .map(Self)
            .ok_or_else(|| MoneyConversionError(format!("{value} is out of range")))
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}
