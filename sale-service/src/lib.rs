pub mod app;
pub mod availability;
pub mod catalog;
pub mod commission;
pub mod consumption;
pub mod sale_handlers;
pub mod stock;
pub mod stock_handlers;

pub use app::{build_router, AppState};

/// Warn-level log threshold: total remaining volume under which a product is
/// flagged as running low after a consumption commits.
pub const DEFAULT_LOW_STOCK_THRESHOLD_ML: f64 = 250.0;
