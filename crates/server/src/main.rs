use tracing::info;
use tracing_subscriber::EnvFilter;

use farmstead_server::config::ServerConfig;
use farmstead_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let state = AppState::new(&config)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "farmstead server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
