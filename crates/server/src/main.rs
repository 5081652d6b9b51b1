//! tokenlens Server - HTTP API for transformer token visualization
//!
//! Binds the visualization pipeline to an HTTP endpoint. The model is
//! loaded once at startup; a load failure aborts before serving.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = ServerConfig::load()?;

    // Start server
    server::start_server(config).await?;

    Ok(())
}
