use common_money::{cents_from_bigdecimal, Money};
use sale_service::commission;

#[test]
fn commission_for_a_standard_sale() {
    // $200.00 at 15% -> $30.00
    let total = Money::from_major(200.0).unwrap();
    let amount = commission::compute(total, 15.0).expect("commission");
    assert_eq!(amount.cents(), 3_000);
}

#[test]
fn no_commission_record_for_zero_rate() {
    let total = Money::from_major(200.0).unwrap();
    assert!(commission::compute(total, 0.0).is_none());
}

#[test]
fn commission_rounds_half_up_at_the_cent() {
    // $33.33 at 7.5% = 249.975 cents -> 250 cents
    let total = Money::from_cents(3_333);
    let amount = commission::compute(total, 7.5).expect("commission");
    assert_eq!(amount.cents(), 250);
}

#[test]
fn commission_survives_the_numeric_round_trip() {
    // The amount persisted as NUMERIC(10,2) reads back to the same cents.
    let total = Money::from_major(149.99).unwrap();
    let amount = commission::compute(total, 12.5).expect("commission");
    let stored = bigdecimal::BigDecimal::from(amount);
    assert_eq!(cents_from_bigdecimal(&stored), Some(amount.cents()));
}
