use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use footfall::config::AppConfig;
use footfall::ingest::handler::{self as ingest_handler, IngestState};
use footfall::query::cache::StatsCache;
use footfall::query::handler::{self as query_handler, QueryState};
use footfall::storage::store::Store;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Parser)]
#[command(name = "footfall", about = "Self-hosted page-view and download tracking")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "footfall=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(Some(&cli.config))?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        db_configured = config.database.path.is_some(),
        "starting footfall"
    );

    // Storage handle; a missing database path disables tracking
    let store = Arc::new(Store::connect(&config.database)?);
    store.init().await?;
    if store.is_available() {
        tracing::info!("database initialized");
    }

    let stats_cache = Arc::new(StatsCache::new(config.stats.cache_ttl_secs));

    let ingest_state = Arc::new(IngestState {
        store: store.clone(),
        stats_cache: stats_cache.clone(),
    });
    let query_state = Arc::new(QueryState {
        store,
        stats_cache,
    });

    // Tracking beacons are posted from the browser on the portfolio site,
    // so ingest allows any origin
    let track_cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([axum::http::Method::POST, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let stats_cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS]);

    let track_routes = Router::new()
        .route("/track/page-view", post(ingest_handler::track_page_view))
        .route("/track/cv-download", post(ingest_handler::track_cv_download))
        .layer(track_cors)
        .with_state(ingest_state);

    let stats_routes = Router::new()
        .route("/analytics/stats", get(query_handler::stats))
        .route("/health", get(query_handler::health))
        .layer(stats_cors)
        .with_state(query_state);

    let app = Router::new().merge(track_routes).merge(stats_routes);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    tracing::info!("shutting down...");
}
