use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pagesift_client::{ProviderAnalyzer, ReqwestFetcher};
use pagesift_core::config::{AiConfig, ExtractConfig, FetchConfig, SecurityConfig};
use pagesift_core::service::AnalysisService;
use pagesift_core::traits::NullPublisher;
use pagesift_server::routes;
use pagesift_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagesift=info".parse()?))
        .with_target(false)
        .init();

    let api_key = std::env::var("PAGESIFT_API_KEY").expect("PAGESIFT_API_KEY must be set");
    let port = std::env::var("PAGESIFT_PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");

    // Composition root: every pipeline client is built here, once, and
    // injected. No lazily initialized globals.
    let fetcher = ReqwestFetcher::new(FetchConfig::from_env()?)?;
    let analyzer = ProviderAnalyzer::from_config(&AiConfig::from_env()?)?;
    let service = AnalysisService::new(
        fetcher,
        analyzer,
        SecurityConfig::from_env()?,
        ExtractConfig::from_env()?,
    );

    let state = Arc::new(AppState {
        service,
        publisher: NullPublisher,
        api_key,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received");
}
