//! creem-sync service entry point.
//!
//! Wires configuration, the PostgreSQL pool, and the billing router, then
//! serves HTTP until shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use creem_sync::adapters::http::{billing_router, BillingAppState};
use creem_sync::adapters::postgres::{PostgresBillingReader, PostgresBillingStore};
use creem_sync::config::AppConfig;
use creem_sync::domain::billing::CreemWebhookVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        "starting creem-sync"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let state = BillingAppState {
        verifier: CreemWebhookVerifier::new(config.webhook.creem_webhook_secret.clone()),
        store: Arc::new(PostgresBillingStore::new(pool.clone())),
        reader: Arc::new(PostgresBillingReader::new(pool)),
    };

    let mut app = Router::new()
        .nest("/api", billing_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .with_state(state);

    let origins = config.server.cors_origins_list();
    if !origins.is_empty() {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .map(|o| o.parse())
            .collect::<Result<_, _>>()?;
        app = app.layer(CorsLayer::new().allow_origin(AllowOrigin::list(origins)));
    }

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
