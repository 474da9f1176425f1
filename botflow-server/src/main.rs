//! botflow REST API server.
//!
//! Serves the function push endpoint (external authority → catalog
//! reconciliation) and the compile-trigger endpoint (graph document +
//! catalog → instruction set for the execution engine).
//!
//! ## Usage
//!
//! ```bash
//! # In-memory catalog (POC mode)
//! BOTFLOW_API_KEY=secret cargo run
//!
//! # Postgres catalog
//! BOTFLOW_API_KEY=secret DATABASE_URL=postgresql://localhost/botflow \
//!     cargo run --features postgres
//! ```

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use botflow_core::CatalogStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botflow_server=info,botflow_core=info".into()),
        )
        .init();

    let api_key = std::env::var("BOTFLOW_API_KEY").context("BOTFLOW_API_KEY must be set")?;
    let store = build_store().await?;
    let state = AppState::new(store, api_key);

    let app = router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!(%addr, "botflow server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "postgres")]
async fn build_store() -> anyhow::Result<Arc<dyn CatalogStore>> {
    use sqlx::postgres::PgPoolOptions;

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .context("connecting to catalog database")?;
    info!("catalog database connection established");
    let store: Arc<dyn CatalogStore> = Arc::new(botflow_core::store::PgCatalog::new(pool));
    Ok(store)
}

#[cfg(not(feature = "postgres"))]
async fn build_store() -> anyhow::Result<Arc<dyn CatalogStore>> {
    info!("no database feature enabled; using in-memory catalog");
    let store: Arc<dyn CatalogStore> = Arc::new(botflow_core::MemoryCatalog::new());
    Ok(store)
}
