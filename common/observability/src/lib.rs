use prometheus::{Counter, Histogram, IntCounter, IntCounterVec, Registry};

#[derive(Clone)]
pub struct SaleMetrics {
    pub registry: Registry,
    pub sales_completed_total: IntCounter,
    pub sales_failed_total: IntCounterVec,
    pub bottles_opened_total: IntCounter,
    pub ml_consumed_total: Counter,
    pub sale_duration_seconds: Histogram,
    pub http_errors_total: IntCounterVec,
}

impl SaleMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let sales_completed_total = IntCounter::new(
            "sales_completed_total",
            "Sales committed successfully",
        ).unwrap();
        let sales_failed_total = IntCounterVec::new(
            prometheus::Opts::new(
                "sales_failed_total",
                "Sale transactions that failed, by error kind",
            ),
            &["kind"],
        ).unwrap();
        let bottles_opened_total = IntCounter::new(
            "bottles_opened_total",
            "Sealed bottles opened during consumption",
        ).unwrap();
        let ml_consumed_total = Counter::new(
            "ml_consumed_total",
            "Milliliters of product consumed by committed sales",
        ).unwrap();
        let sale_duration_seconds = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "sale_duration_seconds",
                "Duration of one sale transaction end to end",
            ).buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        ).unwrap();
        let http_errors_total = IntCounterVec::new(
            prometheus::Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)",
            ),
            &["service", "code", "status"],
        ).unwrap();
        let _ = registry.register(Box::new(sales_completed_total.clone()));
        let _ = registry.register(Box::new(sales_failed_total.clone()));
        let _ = registry.register(Box::new(bottles_opened_total.clone()));
        let _ = registry.register(Box::new(ml_consumed_total.clone()));
        let _ = registry.register(Box::new(sale_duration_seconds.clone()));
        let _ = registry.register(Box::new(http_errors_total.clone()));
        SaleMetrics {
            registry,
            sales_completed_total,
            sales_failed_total,
            bottles_opened_total,
            ml_consumed_total,
            sale_duration_seconds,
            http_errors_total,
        }
    }
}

impl Default for SaleMetrics {
    fn default() -> Self { Self::new() }
}
