use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use meteo_stats::{api, config::Config, storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage = storage::connect(&config.database).await?;

    let api_router = api::create_api_router(storage);

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - Stats endpoints available at http://{}/stats/...", api_addr);

    axum::serve(api_listener, api_router).await?;

    Ok(())
}
