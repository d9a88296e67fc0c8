//! Taleweaver API server entry point.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use taleweaver_api::config::AppConfig;
use taleweaver_api::state::AppState;
use taleweaver_core::clock::SystemClock;
use taleweaver_core::repository::DocumentStore;
use taleweaver_narrative::OfflineOracle;
use taleweaver_session::SessionContext;
use taleweaver_session::application::idle::spawn_idle_scanner;
use taleweaver_store::memory::InMemoryDocumentStore;
use taleweaver_store::pg_document_store::PgDocumentStore;
use taleweaver_store::schema::CREATE_DOCUMENT_TABLES;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Taleweaver API server");

    let config = AppConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            sqlx::raw_sql(CREATE_DOCUMENT_TABLES).execute(&pool).await?;
            tracing::info!("Using PostgreSQL document store");
            Arc::new(PgDocumentStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; sessions are kept in memory only");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    // No model backend is wired in yet; the offline oracle keeps play going.
    let sessions = SessionContext::new(
        store,
        Arc::new(OfflineOracle),
        Arc::new(SystemClock),
        config.pipeline.clone(),
    );
    let sessions = match config.load_keywords()? {
        Some(table) => {
            tracing::info!(path = ?config.keywords_path, "Using custom keyword table");
            sessions.with_keywords(&table)
        }
        None => sessions,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scanner = spawn_idle_scanner(sessions.clone(), config.idle_scan_interval, shutdown_rx);

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = taleweaver_api::app(AppState::new(sessions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Shutting down");
    shutdown_tx.send_replace(true);
    scanner.await?;

    Ok(())
}
