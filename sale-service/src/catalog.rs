use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const SERVICE_SQL: &str =
    "SELECT id, name, commission_percentage FROM services WHERE id = $1";

pub(crate) const BOM_SQL: &str = "SELECT product_id, required_ml FROM service_products \
     WHERE service_id = $1 ORDER BY position";

/// A service as the pipeline needs it: identity plus commission rate.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceRecord {
    pub id: Uuid,
    pub name: String,
    pub commission_percentage: f64,
}

/// One bill-of-materials line: how much of a product one unit of the
/// service consumes. Lines come back in their fixed `position` order.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BomLine {
    pub product_id: Uuid,
    pub required_ml: f64,
}

pub async fn load_service(db: &PgPool, service_id: Uuid) -> Result<Option<ServiceRecord>, sqlx::Error> {
    sqlx::query_as::<_, ServiceRecord>(SERVICE_SQL)
        .bind(service_id)
        .fetch_optional(db)
        .await
}

pub async fn load_bill_of_materials(
    db: &PgPool,
    service_id: Uuid,
) -> Result<Vec<BomLine>, sqlx::Error> {
    sqlx::query_as::<_, BomLine>(BOM_SQL)
        .bind(service_id)
        .fetch_all(db)
        .await
}
