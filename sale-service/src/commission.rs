use common_money::{rate_to_bps, Money};

/// Commission owed for one sale: `total * rate / 100`, rounded half-up to
/// cents. Returns `None` when the service carries no positive rate, in which
/// case no commission record is persisted.
pub fn compute(total: Money, commission_percentage: f64) -> Option<Money> {
    if commission_percentage <= 0.0 {
        return None;
    }
    Some(total.percentage_half_up(rate_to_bps(commission_percentage)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_percent_of_two_hundred() {
        let amount = compute(Money::from_major(200.0).unwrap(), 15.0).unwrap();
        assert_eq!(amount, Money::from_major(30.0).unwrap());
    }

    #[test]
    fn zero_rate_yields_no_record() {
        assert_eq!(compute(Money::from_major(200.0).unwrap(), 0.0), None);
        assert_eq!(compute(Money::from_major(200.0).unwrap(), -5.0), None);
    }

    #[test]
    fn fractional_rate_rounds_half_up() {
        // 12.5% of $99.99 = $12.49875 -> $12.50
        let amount = compute(Money::from_cents(9999), 12.5).unwrap();
        assert_eq!(amount.cents(), 1250);
    }
}
