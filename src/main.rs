use tracing_subscriber::EnvFilter;

use mulewatch::api;
use mulewatch::config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=info for output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("MuleWatch detection engine starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load_or_default(&config_path)?;
    tracing::info!(
        host = %config.api.host,
        port = config.api.port,
        max_transactions = config.limits.max_transactions,
        "Configuration loaded"
    );

    api::serve(config).await?;

    tracing::info!("MuleWatch stopped gracefully");
    Ok(())
}
