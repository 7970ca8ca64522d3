//! Chat backend server binary
//!
//! Run with: cargo run --bin ragline-server [config.toml]

use ragline::{config::AppConfig, server::Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragline=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path);
            AppConfig::from_file(&path)?
        }
        None => AppConfig::default(),
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding service: {}", config.embedding.base_url);
    tracing::info!("  - Embedding dimensions: {}", config.embedding.dimensions);
    tracing::info!("  - Vector index: {}", config.index.base_url);
    tracing::info!("  - Completion service: {}", config.llm.base_url);
    tracing::info!("  - Ingest batch size: {}", config.ingest.batch_size);

    // Index connectivity is mandatory; Server::new exits with
    // IndexUnavailable if the retry budget runs out
    let server = Server::new(config).await?;

    tracing::info!("API: http://{}", server.address());
    tracing::info!("Health: http://{}/health", server.address());

    server.start().await?;

    Ok(())
}
