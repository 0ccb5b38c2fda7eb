use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use common_auth::{JwtConfig, JwtVerifier};
use common_observability::SaleMetrics;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;

use sale_service::{build_router, AppState, DEFAULT_LOW_STOCK_THRESHOLD_ML};

fn build_jwt_verifier_from_env() -> anyhow::Result<Arc<JwtVerifier>> {
    let issuer = env::var("JWT_ISSUER").context("JWT_ISSUER must be set")?;
    let audience = env::var("JWT_AUDIENCE").context("JWT_AUDIENCE must be set")?;
    let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

    let mut config = JwtConfig::new(issuer, audience, secret);
    if let Ok(value) = env::var("JWT_LEEWAY_SECONDS") {
        if let Ok(leeway) = value.parse::<u32>() {
            config = config.with_leeway(leeway);
        }
    }

    Ok(Arc::new(JwtVerifier::new(config)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = PgPool::connect(&database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let jwt_verifier = build_jwt_verifier_from_env()?;

    let low_stock_threshold_ml = env::var("LOW_STOCK_THRESHOLD_ML")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD_ML);

    let state = AppState {
        db,
        jwt_verifier,
        metrics: Arc::new(SaleMetrics::new()),
        low_stock_threshold_ml,
    };
    let app = build_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8090);
    let ip: std::net::IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));
    info!(%addr, "starting sale-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
