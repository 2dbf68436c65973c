use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use viralscope_api::api::{create_router, AppState};
use viralscope_api::config::Config;
use viralscope_api::services::providers::catalog::CatalogTrendingSource;
use viralscope_api::services::providers::identity::LocalIdentityProvider;
use viralscope_api::services::providers::serp::SerpSearchProvider;
use viralscope_api::services::DiscoveryCoordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let identity = Arc::new(LocalIdentityProvider::new(config.session_email.clone()));
    let trending = Arc::new(CatalogTrendingSource::new());
    let search = Arc::new(SerpSearchProvider::new(
        config.search_api_key.clone(),
        config.search_api_url.clone(),
    ));

    let (coordinator, watcher_handle) = DiscoveryCoordinator::new(identity, trending, search).await;

    let app = create_router(AppState::new(coordinator));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    watcher_handle.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
