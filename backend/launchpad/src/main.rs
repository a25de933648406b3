//! Launchpad backend — entry point.
//!
//! Opens the SQLite ledger, wires the launchpad façade and serves the REST
//! API. Transactions are signed by node-managed accounts behind `RPC_URL`.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use launchpad::api::{self, ApiState};
use launchpad::clock::SystemClock;
use launchpad::config::Config;
use launchpad::db::{self, SqliteStore};
use launchpad::{Launchpad, LaunchpadSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load optional .env file (ignored if missing) so it can set RUST_LOG too.
    let _ = dotenvy::dotenv();

    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    let launchpad = Arc::new(Launchpad::new(
        Arc::new(SqliteStore::new(pool)),
        Arc::new(SystemClock),
        LaunchpadSettings {
            privacy_pool_address: config.privacy_pool_address.clone(),
            default_timeout: config.operation_timeout(),
        },
    ));

    // Receipt polling is bounded by CONFIRMATION_TIMEOUT_SECS; this only caps
    // a single JSON-RPC round trip.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let api_port = config.api_port;
    let api_state = Arc::new(ApiState {
        launchpad,
        client,
        config,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route(
            "/projects",
            get(api::list_projects).post(api::create_project),
        )
        .route("/projects/:id", get(api::get_project))
        .route("/projects/:id/status", post(api::update_project_status))
        .route("/projects/:id/audit", get(api::audit_project))
        .route("/contribute", post(api::contribute))
        .route("/distribute", post(api::distribute))
        .route("/status", get(api::contribution_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{api_port}");
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
