use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Two-tier stock representation for one product: a count of sealed bottles
/// plus the contents of the single currently-open bottle. At most one bottle
/// is ever open; the scalar `open_remaining_ml` makes a second open bottle
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BottleStock {
    pub sealed_bottles: i32,
    pub open_remaining_ml: f64,
    pub bottle_capacity_ml: f64,
}

/// Outcome of depleting a stock state; the input state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Depletion {
    pub stock: BottleStock,
    pub bottles_opened: i32,
    pub consumed_ml: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("insufficient stock: {available} ml available, {required} ml required")]
pub struct InsufficientStock {
    pub available: f64,
    pub required: f64,
}

impl BottleStock {
    pub fn total_available_ml(&self) -> f64 {
        self.sealed_bottles as f64 * self.bottle_capacity_ml + self.open_remaining_ml
    }

    /// Deplete `required_ml` from this state.
    ///
    /// The open bottle is drained first; sealed bottles are opened one at a
    /// time only while unmet demand remains, so a bottle is never opened
    /// speculatively. Invariant on the result:
    /// `0 <= open_remaining_ml < bottle_capacity_ml`.
    pub fn consume(&self, required_ml: f64) -> Result<Depletion, InsufficientStock> {
        let available = self.total_available_ml();
        if required_ml > available {
            return Err(InsufficientStock { available, required: required_ml });
        }

        let mut next = *self;
        let mut bottles_opened = 0;

        if next.open_remaining_ml >= required_ml {
            next.open_remaining_ml -= required_ml;
        } else {
            let mut remaining = required_ml - next.open_remaining_ml;
            next.open_remaining_ml = 0.0;
            while remaining > 0.0 && next.sealed_bottles > 0 {
                next.sealed_bottles -= 1;
                bottles_opened += 1;
                let taken = remaining.min(next.bottle_capacity_ml);
                next.open_remaining_ml = next.bottle_capacity_ml - taken;
                remaining -= taken;
            }
        }

        Ok(Depletion { stock: next, bottles_opened, consumed_ml: required_ml })
    }
}
