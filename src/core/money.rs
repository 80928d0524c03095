use crate::core::error::ValidationError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Decimal places carried by every [`MoneyAmount`].
pub const MONEY_SCALE: u32 = 2;

/// Signed fixed-point monetary amount with exactly two decimal places.
///
/// Every amount in the engine (expense totals, shares, balances,
/// obligations) is a `MoneyAmount`. The value is signed so that it can
/// also carry net balances: positive means the member is owed money,
/// negative means the member owes money.
///
/// # Examples
///
/// ```
/// use splitsmart_engine::core::money::MoneyAmount;
/// use rust_decimal_macros::dec;
///
/// let total = MoneyAmount::new(dec!(90)).unwrap();
/// assert_eq!(total.to_string(), "90.00");
///
/// let third = MoneyAmount::round_half_up(dec!(100) / dec!(3));
/// assert_eq!(third.to_string(), "33.33");
///
/// assert!(MoneyAmount::new(dec!(1.005)).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct MoneyAmount(Decimal);

impl MoneyAmount {
    pub const ZERO: MoneyAmount = MoneyAmount(Decimal::ZERO);

    /// Create an amount from a decimal that already has at most two places.
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value.normalize().scale() > MONEY_SCALE {
            return Err(ValidationError::Precision(value));
        }
        Ok(Self::rescaled(value))
    }

    /// Round an arbitrary decimal to two places, midpoints away from zero.
    pub fn round_half_up(value: Decimal) -> Self {
        Self::rescaled(value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Create an amount from an integer count of minor units.
    pub fn from_minor_units(units: i64) -> Self {
        Self(Decimal::new(units, MONEY_SCALE))
    }

    /// Integer count of minor units. Exact, since the scale is fixed at two.
    pub fn to_minor_units(self) -> Result<i64, ValidationError> {
        i64::try_from(self.0.mantissa()).map_err(|_| ValidationError::OutOfRange(self.0))
    }

    fn rescaled(mut value: Decimal) -> Self {
        value.rescale(MONEY_SCALE);
        Self(value)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// `self + rhs`, failing with `OutOfRange` instead of overflowing.
    pub fn checked_add(self, rhs: MoneyAmount) -> Result<Self, ValidationError> {
        self.0
            .checked_add(rhs.0)
            .map(Self::rescaled)
            .ok_or(ValidationError::OutOfRange(rhs.0))
    }

    /// `self × factor`, failing with `OutOfRange` instead of overflowing.
    pub fn checked_mul(self, factor: u32) -> Result<Self, ValidationError> {
        self.0
            .checked_mul(Decimal::from(factor))
            .map(Self::rescaled)
            .ok_or(ValidationError::OutOfRange(self.0))
    }

    /// Sum of `amounts`, failing with `OutOfRange` instead of overflowing.
    pub fn checked_sum<I>(amounts: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = MoneyAmount>,
    {
        amounts.into_iter().try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for MoneyAmount {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MoneyAmount> for Decimal {
    fn from(amount: MoneyAmount) -> Self {
        amount.0
    }
}

impl Add for MoneyAmount {
    type Output = MoneyAmount;

    fn add(self, rhs: MoneyAmount) -> Self::Output {
        Self::rescaled(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyAmount {
    fn add_assign(&mut self, rhs: MoneyAmount) {
        *self = *self + rhs;
    }
}

impl Sub for MoneyAmount {
    type Output = MoneyAmount;

    fn sub(self, rhs: MoneyAmount) -> Self::Output {
        Self::rescaled(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyAmount {
    fn sub_assign(&mut self, rhs: MoneyAmount) {
        *self = *self - rhs;
    }
}

impl Neg for MoneyAmount {
    type Output = MoneyAmount;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for MoneyAmount {
    fn sum<I: Iterator<Item = MoneyAmount>>(iter: I) -> Self {
        iter.fold(MoneyAmount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a MoneyAmount> for MoneyAmount {
    fn sum<I: Iterator<Item = &'a MoneyAmount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Shorthand used by tests and demos: `money("12.50")`.
///
/// # Panics
///
/// Panics if `value` is not a decimal with at most two places.
pub fn money(value: &str) -> MoneyAmount {
    let parsed: Decimal = value
        .parse()
        .unwrap_or_else(|e| panic!("invalid money literal '{}': {}", value, e));
    MoneyAmount::new(parsed).unwrap_or_else(|e| panic!("invalid money literal '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_display_has_two_places() {
        assert_eq!(money("30").to_string(), "30.00");
        assert_eq!(money("-0.5").to_string(), "-0.50");
        assert_eq!(MoneyAmount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_rejects_excess_precision() {
        assert_eq!(
            MoneyAmount::new(dec!(10.001)),
            Err(ValidationError::Precision(dec!(10.001)))
        );
        // Trailing zeros beyond two places are not extra precision.
        assert!(MoneyAmount::new(dec!(10.500)).is_ok());
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(MoneyAmount::round_half_up(dec!(0.125)), money("0.13"));
        assert_eq!(MoneyAmount::round_half_up(dec!(0.124)), money("0.12"));
        assert_eq!(MoneyAmount::round_half_up(dec!(-0.125)), money("-0.13"));
        assert_eq!(MoneyAmount::round_half_up(dec!(100) / dec!(6)), money("16.67"));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(money("12.34").to_minor_units(), Ok(1234));
        assert_eq!(money("-0.07").to_minor_units(), Ok(-7));
        assert_eq!(MoneyAmount::from_minor_units(9000), money("90.00"));
    }

    #[test]
    fn test_arithmetic_keeps_scale() {
        let total: MoneyAmount = [money("33.33"), money("33.33"), money("33.34")].iter().sum();
        assert_eq!(total, money("100"));
        assert_eq!(total.to_string(), "100.00");
        assert_eq!(-(money("5") - money("7.5")), money("2.5"));
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        assert_eq!(money("1.10").checked_add(money("2")).unwrap(), money("3.10"));
        assert_eq!(money("12.50").checked_mul(2).unwrap(), money("25"));

        let huge = MoneyAmount::new(Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0)).unwrap();
        assert!(matches!(huge.checked_add(huge), Err(ValidationError::OutOfRange(_))));
        assert!(matches!(huge.checked_mul(3), Err(ValidationError::OutOfRange(_))));
        assert!(MoneyAmount::checked_sum([huge, money("1"), huge]).is_err());
        assert!(huge.to_minor_units().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&money("42.1")).unwrap();
        assert_eq!(json, "\"42.10\"");
        let back: MoneyAmount = serde_json::from_str("\"7.25\"").unwrap();
        assert_eq!(back, money("7.25"));
        assert!(serde_json::from_str::<MoneyAmount>("\"7.255\"").is_err());
    }
}
