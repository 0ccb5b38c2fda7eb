use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::catalog::BomLine;
use crate::stock::BottleStock;

/// One product that cannot cover its bill-of-materials line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortfall {
    pub product_id: Uuid,
    pub required_ml: f64,
    pub available_ml: f64,
}

/// Point-in-time sufficiency check over a whole bill of materials.
///
/// Collects every short product rather than stopping at the first, so the
/// caller can render a complete diagnostic. Mutates nothing; the caller is
/// responsible for holding row locks if the result must stay true until the
/// consumption writes land.
pub fn check_all(
    lines: &[BomLine],
    states: &HashMap<Uuid, BottleStock>,
) -> Result<(), Vec<Shortfall>> {
    let mut shortfalls = Vec::new();
    for line in lines {
        let available_ml = states
            .get(&line.product_id)
            .map(|s| s.total_available_ml())
            .unwrap_or(0.0);
        if line.required_ml > available_ml {
            shortfalls.push(Shortfall {
                product_id: line.product_id,
                required_ml: line.required_ml,
                available_ml,
            });
        }
    }
    if shortfalls.is_empty() {
        Ok(())
    } else {
        Err(shortfalls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(sealed: i32, open: f64, capacity: f64) -> BottleStock {
        BottleStock {
            sealed_bottles: sealed,
            open_remaining_ml: open,
            bottle_capacity_ml: capacity,
        }
    }

    fn line(product_id: Uuid, required_ml: f64) -> BomLine {
        BomLine { product_id, required_ml }
    }

    #[test]
    fn all_sufficient_passes() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let states = HashMap::from([(a, stock(2, 30.0, 100.0)), (b, stock(0, 50.0, 500.0))]);
        assert!(check_all(&[line(a, 80.0), line(b, 50.0)], &states).is_ok());
    }

    #[test]
    fn reports_every_short_product_not_just_the_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let states = HashMap::from([
            (a, stock(0, 10.0, 100.0)),
            (b, stock(1, 0.0, 100.0)),
            (c, stock(0, 5.0, 100.0)),
        ]);
        let shortfalls =
            check_all(&[line(a, 50.0), line(b, 80.0), line(c, 25.0)], &states).unwrap_err();
        assert_eq!(shortfalls.len(), 2);
        assert_eq!(shortfalls[0].product_id, a);
        assert_eq!(shortfalls[0].available_ml, 10.0);
        assert_eq!(shortfalls[1].product_id, c);
    }

    #[test]
    fn missing_state_counts_as_zero_available() {
        let a = Uuid::new_v4();
        let shortfalls = check_all(&[line(a, 1.0)], &HashMap::new()).unwrap_err();
        assert_eq!(shortfalls, vec![Shortfall { product_id: a, required_ml: 1.0, available_ml: 0.0 }]);
    }

    #[test]
    fn zero_quantity_line_never_shortfalls() {
        let a = Uuid::new_v4();
        assert!(check_all(&[line(a, 0.0)], &HashMap::new()).is_ok());
    }
}
