use chatbridge_server::{AppConfig, ChatServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatbridge=debug".into()),
        )
        .with_target(false)
        .with_line_number(true)
        .init();

    tracing::info!("Starting chat proxy");

    let config = AppConfig::load()?;
    tracing::debug!(config = ?config, "Configuration loaded");

    ChatServer::from_config(config)?.run().await
}
