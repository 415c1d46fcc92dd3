//! API Server binary entrypoint.

use api_server::{ApiServer, ServerConfig};
use redsys_core::GatewayConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api_server=debug,redsys_core=info,tower_http=debug,axum=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Merchant settings from tpv.toml / TPV_* variables
    let gateway = GatewayConfig::load()?;

    // Create server config from environment
    let config = ServerConfig::from_env();

    // Create and run server
    let server = ApiServer::new(config, gateway)?;
    server.run().await?;

    Ok(())
}
