use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monetary amount held as integer minor units (cents).
///
/// All arithmetic happens on cents so percentage calculations round once,
/// half-up, instead of accumulating floating-point error. `BigDecimal` is
/// only used at the persistence/serialization edge (NUMERIC columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(i64);

#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("amount is not a finite number")]
    NotFinite,
    #[error("amount {0} is out of range")]
    OutOfRange(f64),
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Parse a major-unit amount (e.g. the `totalAmount` request field),
    /// rounding half-away-from-zero to the nearest cent.
    pub fn from_major(value: f64) -> Result<Self, MoneyError> {
        if !value.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        let cents = (value * 100.0).round();
        if cents.abs() > i64::MAX as f64 / 2.0 {
            return Err(MoneyError::OutOfRange(value));
        }
        Ok(Self(cents as i64))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Apply a rate expressed in basis points, rounding half-up.
    pub fn percentage_half_up(&self, rate_bps: i64) -> Money {
        Money((self.0 * rate_bps + 5_000) / 10_000)
    }
}

/// Convert a percentage (e.g. `15.0` for 15%) to basis points.
pub fn rate_to_bps(percent: f64) -> i64 {
    (percent * 100.0).round() as i64
}

impl From<Money> for BigDecimal {
    fn from(value: Money) -> Self {
        (BigDecimal::from(value.0) / BigDecimal::from(100)).with_scale(2)
    }
}

/// Read a scale-2 NUMERIC value back into cents.
pub fn cents_from_bigdecimal(value: &BigDecimal) -> Option<i64> {
    (value * BigDecimal::from(100)).with_scale(0).to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_major_rounds_to_nearest_cent() {
        assert_eq!(Money::from_major(12.345).unwrap().cents(), 1235);
        assert_eq!(Money::from_major(12.344).unwrap().cents(), 1234);
        assert_eq!(Money::from_major(200.0).unwrap().cents(), 20_000);
    }

    #[test]
    fn from_major_rejects_non_finite() {
        assert_eq!(Money::from_major(f64::NAN), Err(MoneyError::NotFinite));
        assert_eq!(Money::from_major(f64::INFINITY), Err(MoneyError::NotFinite));
    }

    #[test]
    fn percentage_half_up_rounds_at_midpoint() {
        // $10.00 at 15% = $1.50 exact
        assert_eq!(Money::from_cents(1000).percentage_half_up(1500).cents(), 150);
        // $0.01 at 50% = 0.5 cents, rounds up to 1 cent
        assert_eq!(Money::from_cents(1).percentage_half_up(5000).cents(), 1);
        // $33.33 at 10% = 333.3 cents, rounds down
        assert_eq!(Money::from_cents(3333).percentage_half_up(1000).cents(), 333);
    }

    #[test]
    fn bigdecimal_round_trip_preserves_cents() {
        let m = Money::from_cents(123_456);
        let dec = BigDecimal::from(m);
        assert_eq!(dec.to_string(), "1234.56");
        assert_eq!(cents_from_bigdecimal(&dec), Some(123_456));
    }

    #[test]
    fn rate_conversion() {
        assert_eq!(rate_to_bps(15.0), 1500);
        assert_eq!(rate_to_bps(7.5), 750);
        assert_eq!(rate_to_bps(0.0), 0);
    }
}
