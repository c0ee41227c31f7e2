//! Decimal price representation.
//!
//! Prices are kept as [`Decimal`] so that cart totals add up exactly; they
//! are rounded to two places (half away from zero) only when displayed.
//! A unit price is at most [`Price::MAX`]. Arithmetic on prices saturates
//! instead of overflowing.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a number")]
    Invalid,
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount is above [`Price::MAX`].
    #[error("price cannot exceed {}", Price::MAX)]
    TooLarge,
}

/// A non-negative amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest accepted unit price, one billion.
    pub const MAX: Self = Self(Decimal::from_parts(1_000_000_000, 0, 0, false, 0));

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero and
    /// [`PriceError::TooLarge`] if it is above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Convert a floating-point amount (as stored by the document database).
    ///
    /// Returns `None` for NaN, infinities and negative amounts.
    #[must_use]
    pub fn from_f64(amount: f64) -> Option<Self> {
        let decimal = Decimal::try_from(amount).ok()?;
        Self::new(decimal.normalize()).ok()
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Amount rounded to cents, half away from zero.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Amount as a floating-point number, for stores that only speak doubles.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.rounded().to_f64().unwrap_or_default()
    }
}

impl fmt::Display for Price {
    /// Always renders exactly two decimal places, e.g. `23.50`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded())
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim()).map_err(|_| PriceError::Invalid)?;
        Self::new(decimal)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_to_two_places() {
        assert_eq!(Price::from_str("3.5").unwrap().to_string(), "3.50");
        assert_eq!(Price::from_str("10").unwrap().to_string(), "10.00");
        assert_eq!(Price::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_display_rounds_instead_of_truncating() {
        assert_eq!(Price::from_str("1.005").unwrap().to_string(), "1.01");
        assert_eq!(Price::from_str("2.994").unwrap().to_string(), "2.99");
        assert_eq!(Price::from_str("2.995").unwrap().to_string(), "3.00");
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [
            Price::from_str("10.00").unwrap().times(2),
            Price::from_str("3.5").unwrap().times(1),
        ]
        .into_iter()
        .sum();
        assert_eq!(total.to_string(), "23.50");
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Price::from_f64(19.99).unwrap().to_string(), "19.99");
        assert!(Price::from_f64(-1.0).is_none());
        assert!(Price::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Price::from_str("abc"), Err(PriceError::Invalid));
        assert_eq!(Price::from_str("-2"), Err(PriceError::Negative));
        assert_eq!(
            Price::from_str("100000000000000000000"),
            Err(PriceError::TooLarge)
        );
        assert_eq!(Price::from_str("1000000000"), Ok(Price::MAX));
        assert!(Price::from_f64(1e20).is_none());
    }

    #[test]
    fn test_deserialize_checks_bounds() {
        assert_eq!(
            serde_json::from_str::<Price>("\"12.50\"").unwrap(),
            Price::from_cents(1250)
        );
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
        assert!(serde_json::from_str::<Price>("\"1000000000.01\"").is_err());
        assert_eq!(
            serde_json::to_string(&Price::from_cents(1250)).unwrap(),
            "\"12.50\""
        );
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Price(Decimal::MAX);
        assert_eq!(huge.times(u32::MAX).amount(), Decimal::MAX);
        assert_eq!((huge + Price::MAX).amount(), Decimal::MAX);
        let total: Price = [huge, huge, Price::from_cents(1)].into_iter().sum();
        assert_eq!(total.amount(), Decimal::MAX);
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(1999).to_string(), "19.99");
    }
}
