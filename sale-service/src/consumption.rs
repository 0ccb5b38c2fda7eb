use serde::Serialize;
use sqlx::{Postgres, Row, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::stock::{BottleStock, InsufficientStock};

pub const CONSUMPTION_TYPE_SALE: &str = "sale";

pub(crate) const LOCK_STOCK_SQL: &str =
    "SELECT sealed_bottles, open_remaining_ml, bottle_capacity_ml \
     FROM product_stock WHERE product_id = $1 FOR UPDATE";

pub(crate) const UPDATE_STOCK_SQL: &str =
    "UPDATE product_stock SET sealed_bottles = $2, open_remaining_ml = $3, updated_at = NOW() \
     WHERE product_id = $1";

pub(crate) const INSERT_MOVEMENT_SQL: &str =
    "INSERT INTO stock_movements \
     (id, product_id, sale_id, service_id, staff_id, consumption_type, ml_consumed, \
      bottles_opened, sealed_bottles_before, sealed_bottles_after, open_ml_before, open_ml_after) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";

/// Identifiers stamped onto every movement row written for one sale.
#[derive(Debug, Clone, Copy)]
pub struct ConsumptionContext {
    pub sale_id: Uuid,
    pub service_id: Uuid,
    pub staff_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionResult {
    pub product_id: Uuid,
    pub ml_consumed: f64,
    pub bottles_opened: i32,
    pub sealed_bottles: i32,
    pub open_remaining_ml: f64,
    pub total_remaining_ml: f64,
}

#[derive(Debug, Error)]
pub enum ConsumptionError {
    #[error("product {product_id}: {source}")]
    Insufficient {
        product_id: Uuid,
        source: InsufficientStock,
    },
    #[error("stock row for product {0} is missing")]
    MissingStockRow(Uuid),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Read one product's stock row under a row lock held until the enclosing
/// transaction ends. Check-and-consume stays one serializable step as long
/// as every read of the row goes through this lock.
pub async fn lock_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<Option<BottleStock>, sqlx::Error> {
    let row = sqlx::query(LOCK_STOCK_SQL)
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|r| BottleStock {
        sealed_bottles: r.get("sealed_bottles"),
        open_remaining_ml: r.get("open_remaining_ml"),
        bottle_capacity_ml: r.get("bottle_capacity_ml"),
    }))
}

/// Deplete one product and record the movement, inside the caller's
/// transaction: exactly one stock write and one movement append, or neither.
pub async fn apply(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    required_ml: f64,
    ctx: &ConsumptionContext,
) -> Result<ConsumptionResult, ConsumptionError> {
    let before = lock_stock(tx, product_id)
        .await?
        .ok_or(ConsumptionError::MissingStockRow(product_id))?;

    let depletion = before
        .consume(required_ml)
        .map_err(|source| ConsumptionError::Insufficient { product_id, source })?;
    let after = depletion.stock;

    sqlx::query(UPDATE_STOCK_SQL)
        .bind(product_id)
        .bind(after.sealed_bottles)
        .bind(after.open_remaining_ml)
        .execute(&mut **tx)
        .await?;

    sqlx::query(INSERT_MOVEMENT_SQL)
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(ctx.sale_id)
        .bind(ctx.service_id)
        .bind(ctx.staff_id)
        .bind(CONSUMPTION_TYPE_SALE)
        .bind(depletion.consumed_ml)
        .bind(depletion.bottles_opened)
        .bind(before.sealed_bottles)
        .bind(after.sealed_bottles)
        .bind(before.open_remaining_ml)
        .bind(after.open_remaining_ml)
        .execute(&mut **tx)
        .await?;

    Ok(ConsumptionResult {
        product_id,
        ml_consumed: depletion.consumed_ml,
        bottles_opened: depletion.bottles_opened,
        sealed_bottles: after.sealed_bottles,
        open_remaining_ml: after.open_remaining_ml,
        total_remaining_ml: after.total_available_ml(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_query_takes_a_row_lock() {
        assert!(LOCK_STOCK_SQL.ends_with("FOR UPDATE"));
    }

    #[test]
    fn movement_insert_captures_before_and_after() {
        for col in [
            "sealed_bottles_before",
            "sealed_bottles_after",
            "open_ml_before",
            "open_ml_after",
        ] {
            assert!(INSERT_MOVEMENT_SQL.contains(col), "missing column {col}");
        }
    }
}
