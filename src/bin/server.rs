//! Events API server: loads `.env`, opens the stores and serves the router.

use events_api::{app, AppState, ServerConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("events_api=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    if config.fake_secure || config.fake_authorized {
        tracing::warn!(
            fake_secure = config.fake_secure,
            fake_authorized = config.fake_authorized,
            "running with testing overrides"
        );
    }
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::open(config).await?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
