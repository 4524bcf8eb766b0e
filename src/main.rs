//! Bitkub Market Data - order book streamer
//!
//! Fetches a REST snapshot for each configured pair, then keeps local order
//! books in sync with the Bitkub WebSocket streams and logs the top of book.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_data::{BitkubClient, Config, FeedMetrics, OrderBooks};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting Bitkub Market Data client");

    let config = Config::load()?;
    info!(symbols = ?config.symbols, base_url = %config.base_url, "Configuration loaded");

    let client = BitkubClient::new(&config)?;

    // Start health check server
    let metrics = Arc::new(client.metrics().clone());
    let health_port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_port, metrics).await {
            warn!(error = %e, "Health server error");
        }
    });

    let snapshots = client
        .fetch_order_books(&config.symbols, config.snapshot_limit)
        .await?;
    for (pair, book) in &snapshots {
        info!(
            pair = %pair,
            best_bid = ?book.best_bid().map(|l| l.price),
            best_ask = ?book.best_ask().map(|l| l.price),
            "REST order book snapshot"
        );
    }

    let handle = client.subscribe(&config.symbols, log_books).await?;
    info!(subscription = %handle, "Streaming order books, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    client.unsubscribe_all().await;
    info!("Shutdown complete");

    Ok(())
}

fn log_books(books: OrderBooks) {
    for (pair, book) in &books {
        info!(
            pair = %pair,
            best_bid = ?book.best_bid().map(|l| l.price),
            best_ask = ?book.best_ask().map(|l| l.price),
            spread_bps = ?book.spread_bps(),
            bid_levels = book.bids.len(),
            ask_levels = book.asks.len(),
            "Order book update"
        );
    }
}

/// Start HTTP server for health checks and metrics
async fn start_health_server(port: u16, metrics: Arc<FeedMetrics>) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .with_state(metrics);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Starting health check server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "component": "bitkub-market-data",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn render_metrics(State(metrics): State<Arc<FeedMetrics>>) -> Result<String, StatusCode> {
    metrics.render().map_err(|e| {
        warn!(error = %e, "Failed to render metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
