use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use common_auth::{ensure_role, AuthContext, SALE_ROLES};
use common_http_errors::{ApiError, ApiJson};
use common_money::{cents_from_bigdecimal, Money};
use serde::{Deserialize, Serialize};
use sqlx::query_as;
use thiserror::Error;
use uuid::Uuid;

use crate::app::AppState;
use crate::availability::{self, Shortfall};
use crate::catalog;
use crate::commission;
use crate::consumption::{self, ConsumptionContext, ConsumptionError, ConsumptionResult};
use crate::stock_handlers::MovementRecord;

pub const PAYMENT_METHODS: &[&str] = &["cash", "card", "transfer"];

pub(crate) const INSERT_SALE_SQL: &str =
    "INSERT INTO sales (id, client_id, service_id, staff_id, total_amount, payment_method, status, notes) \
     VALUES ($1, $2, $3, $4, $5, $6, 'completed', $7) RETURNING created_at";

pub(crate) const INSERT_COMMISSION_SQL: &str =
    "INSERT INTO commissions (id, staff_id, sale_id, service_id, commission_percentage, commission_amount, status) \
     VALUES ($1, $2, $3, $4, $5, $6, 'pending')";

pub(crate) const LIST_SALES_SQL: &str =
    "SELECT id, client_id, service_id, staff_id, total_amount, payment_method, status, notes, created_at \
     FROM sales ORDER BY created_at DESC LIMIT 100";

pub(crate) const GET_SALE_SQL: &str =
    "SELECT id, client_id, service_id, staff_id, total_amount, payment_method, status, notes, created_at \
     FROM sales WHERE id = $1";

pub(crate) const SALE_MOVEMENTS_SQL: &str =
    "SELECT id, product_id, sale_id, service_id, staff_id, consumption_type, ml_consumed, \
            bottles_opened, sealed_bottles_before, sealed_bottles_after, open_ml_before, \
            open_ml_after, created_at \
     FROM stock_movements WHERE sale_id = $1 ORDER BY seq";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub staff_id: Uuid,
    pub total_amount: f64,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub staff_id: Uuid,
    pub total_amount: f64,
    pub payment_method: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub sale_id: Uuid,
    pub service_id: Uuid,
    pub commission_percentage: f64,
    pub commission_amount: f64,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub success: bool,
    pub sale: Sale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<Commission>,
    pub consumption_results: Vec<ConsumptionResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub movements: Vec<MovementRecord>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: Uuid,
    client_id: Uuid,
    service_id: Uuid,
    staff_id: Uuid,
    total_amount: BigDecimal,
    payment_method: String,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        let cents = cents_from_bigdecimal(&row.total_amount).unwrap_or(0);
        Sale {
            id: row.id,
            client_id: row.client_id,
            service_id: row.service_id,
            staff_id: row.staff_id,
            total_amount: Money::from_cents(cents).to_f64(),
            payment_method: row.payment_method,
            status: row.status,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum SaleError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{what} not found")]
    NotFound { what: &'static str },
    #[error("insufficient stock for {} product(s)", .0.len())]
    InsufficientStock(Vec<Shortfall>),
    #[error("consumption failed: {0}")]
    ConsumptionFailed(ConsumptionError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl SaleError {
    pub fn kind(&self) -> &'static str {
        match self {
            SaleError::Validation(_) => "VALIDATION",
            SaleError::Forbidden(_) => "UNAUTHORIZED",
            SaleError::NotFound { .. } => "NOT_FOUND",
            SaleError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            SaleError::ConsumptionFailed(_) => "CONSUMPTION_FAILED",
            SaleError::Db(_) => "INTERNAL",
        }
    }
}

impl From<ConsumptionError> for SaleError {
    fn from(value: ConsumptionError) -> Self {
        match value {
            ConsumptionError::Db(e) => SaleError::Db(e),
            other => SaleError::ConsumptionFailed(other),
        }
    }
}

impl From<SaleError> for ApiError {
    fn from(value: SaleError) -> Self {
        match value {
            SaleError::Validation(message) => ApiError::Validation { message },
            SaleError::Forbidden(message) => ApiError::Forbidden { message },
            SaleError::NotFound { what } => ApiError::NotFound { what },
            SaleError::InsufficientStock(shortfalls) => {
                let message = shortfalls
                    .iter()
                    .map(|s| {
                        format!(
                            "product {}: required {} ml, available {} ml",
                            s.product_id, s.required_ml, s.available_ml
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                let details = serde_json::to_value(&shortfalls).unwrap_or_default();
                ApiError::InsufficientStock { message, details }
            }
            SaleError::ConsumptionFailed(err) => {
                ApiError::ConsumptionFailed { message: err.to_string() }
            }
            SaleError::Db(err) => ApiError::internal(err),
        }
    }
}

#[derive(Debug)]
pub struct SaleOutcome {
    pub sale: Sale,
    pub commission: Option<Commission>,
    pub consumption_results: Vec<ConsumptionResult>,
}

pub(crate) fn validate_request(req: &NewSale) -> Result<Money, SaleError> {
    if !PAYMENT_METHODS.contains(&req.payment_method.as_str()) {
        return Err(SaleError::Validation(format!(
            "paymentMethod must be one of {}, got '{}'",
            PAYMENT_METHODS.join("/"),
            req.payment_method
        )));
    }
    let total = Money::from_major(req.total_amount)
        .map_err(|e| SaleError::Validation(format!("totalAmount: {e}")))?;
    if total.cents() < 0 {
        return Err(SaleError::Validation("totalAmount must not be negative".into()));
    }
    Ok(total)
}

/// The sale transaction: validate, authorize, then one database transaction
/// wrapping row locks, availability check, sale insert, every consumption,
/// and the commission insert. Any failure rolls the whole thing back, so
/// the only outcomes are fully committed or fully absent.
pub async fn execute_sale(
    state: &AppState,
    auth: &AuthContext,
    req: NewSale,
) -> Result<SaleOutcome, SaleError> {
    let total = validate_request(&req)?;

    ensure_role(auth, SALE_ROLES).map_err(|e| SaleError::Forbidden(e.message()))?;

    let service = catalog::load_service(&state.db, req.service_id)
        .await?
        .ok_or(SaleError::NotFound { what: "service" })?;
    let lines = catalog::load_bill_of_materials(&state.db, req.service_id).await?;

    let mut tx = state.db.begin().await?;

    // Lock every required row up front, in bill-of-materials order. The
    // locks are held until commit, so the availability check below cannot
    // go stale before the writes land.
    let mut states = HashMap::with_capacity(lines.len());
    for line in &lines {
        if let Some(stock) = consumption::lock_stock(&mut tx, line.product_id).await? {
            states.insert(line.product_id, stock);
        }
    }

    if let Err(shortfalls) = availability::check_all(&lines, &states) {
        return Err(SaleError::InsufficientStock(shortfalls));
    }

    let sale_id = Uuid::new_v4();
    let created_at: DateTime<Utc> = sqlx::query_scalar(INSERT_SALE_SQL)
        .bind(sale_id)
        .bind(req.client_id)
        .bind(req.service_id)
        .bind(req.staff_id)
        .bind(BigDecimal::from(total))
        .bind(req.payment_method.as_str())
        .bind(req.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

    let ctx = ConsumptionContext {
        sale_id,
        service_id: req.service_id,
        staff_id: req.staff_id,
    };

    let mut consumption_results = Vec::with_capacity(lines.len());
    for line in &lines {
        let result = consumption::apply(&mut tx, line.product_id, line.required_ml, &ctx).await?;
        if result.total_remaining_ml < state.low_stock_threshold_ml {
            tracing::warn!(
                product_id = %line.product_id,
                remaining_ml = result.total_remaining_ml,
                threshold_ml = state.low_stock_threshold_ml,
                "product running low after sale"
            );
        }
        consumption_results.push(result);
    }

    let commission = match commission::compute(total, service.commission_percentage) {
        Some(amount) => {
            let commission_id = Uuid::new_v4();
            sqlx::query(INSERT_COMMISSION_SQL)
                .bind(commission_id)
                .bind(req.staff_id)
                .bind(sale_id)
                .bind(req.service_id)
                .bind(service.commission_percentage)
                .bind(BigDecimal::from(amount))
                .execute(&mut *tx)
                .await?;
            Some(Commission {
                id: commission_id,
                staff_id: req.staff_id,
                sale_id,
                service_id: req.service_id,
                commission_percentage: service.commission_percentage,
                commission_amount: amount.to_f64(),
                status: "pending".into(),
            })
        }
        None => None,
    };

    tx.commit().await?;

    let sale = Sale {
        id: sale_id,
        client_id: req.client_id,
        service_id: req.service_id,
        staff_id: req.staff_id,
        total_amount: total.to_f64(),
        payment_method: req.payment_method,
        status: "completed".into(),
        notes: req.notes,
        created_at,
    };

    Ok(SaleOutcome { sale, commission, consumption_results })
}

pub async fn create_sale(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(payload): ApiJson<NewSale>,
) -> Result<Json<SaleResponse>, ApiError> {
    let timer = state.metrics.sale_duration_seconds.start_timer();
    match execute_sale(&state, &auth, payload).await {
        Ok(outcome) => {
            timer.observe_duration();
            state.metrics.sales_completed_total.inc();
            let opened: u64 = outcome
                .consumption_results
                .iter()
                .map(|r| r.bottles_opened as u64)
                .sum();
            state.metrics.bottles_opened_total.inc_by(opened);
            let consumed: f64 = outcome.consumption_results.iter().map(|r| r.ml_consumed).sum();
            state.metrics.ml_consumed_total.inc_by(consumed);
            tracing::info!(
                sale_id = %outcome.sale.id,
                service_id = %outcome.sale.service_id,
                staff_id = %outcome.sale.staff_id,
                bottles_opened = opened,
                ml_consumed = consumed,
                "sale committed"
            );
            Ok(Json(SaleResponse {
                success: true,
                sale: outcome.sale,
                commission: outcome.commission,
                consumption_results: outcome.consumption_results,
            }))
        }
        Err(err) => {
            timer.stop_and_discard();
            state.metrics.sales_failed_total.with_label_values(&[err.kind()]).inc();
            tracing::warn!(kind = err.kind(), error = %err, "sale rejected");
            Err(err.into())
        }
    }
}

pub async fn list_sales(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Sale>>, ApiError> {
    ensure_role(&auth, SALE_ROLES)
        .map_err(|e| ApiError::Forbidden { message: e.message() })?;

    let rows = query_as::<_, SaleRow>(LIST_SALES_SQL)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(rows.into_iter().map(Sale::from).collect()))
}

pub async fn get_sale(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(sale_id): Path<Uuid>,
) -> Result<Json<SaleDetail>, ApiError> {
    ensure_role(&auth, SALE_ROLES)
        .map_err(|e| ApiError::Forbidden { message: e.message() })?;

    let row = query_as::<_, SaleRow>(GET_SALE_SQL)
        .bind(sale_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ApiError::NotFound { what: "sale" })?;

    let movements = query_as::<_, MovementRecord>(SALE_MOVEMENTS_SQL)
        .bind(sale_id)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(SaleDetail { sale: row.into(), movements }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, amount: f64) -> NewSale {
        NewSale {
            client_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            staff_id: Uuid::new_v4(),
            total_amount: amount,
            payment_method: method.to_string(),
            notes: None,
        }
    }

    #[test]
    fn accepts_each_enumerated_payment_method() {
        for method in PAYMENT_METHODS {
            assert!(validate_request(&request(method, 200.0)).is_ok(), "{method}");
        }
    }

    #[test]
    fn rejects_unknown_payment_method() {
        let err = validate_request(&request("check", 200.0)).unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        assert_eq!(validate_request(&request("cash", -1.0)).unwrap_err().kind(), "VALIDATION");
        assert_eq!(validate_request(&request("cash", f64::NAN)).unwrap_err().kind(), "VALIDATION");
    }

    #[test]
    fn sale_insert_commits_with_completed_status() {
        assert!(INSERT_SALE_SQL.contains("'completed'"));
    }

    #[test]
    fn sale_movements_read_back_in_bill_of_materials_order() {
        // Movements of one sale share created_at (transaction timestamp),
        // so the insertion sequence must carry the order.
        assert!(SALE_MOVEMENTS_SQL.ends_with("ORDER BY seq"));
    }

    #[test]
    fn shortfall_error_maps_to_conflict_with_details() {
        let shortfall = Shortfall {
            product_id: Uuid::new_v4(),
            required_ml: 300.0,
            available_ml: 230.0,
        };
        let api: ApiError = SaleError::InsufficientStock(vec![shortfall]).into();
        assert_eq!(api.kind(), "INSUFFICIENT_STOCK");
        assert_eq!(api.status(), axum::http::StatusCode::CONFLICT);
    }
}
