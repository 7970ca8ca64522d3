//! HTTP server

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use state::AppState;

/// The chat backend server
pub struct Server {
    config: AppConfig,
    state: AppState,
}

impl Server {
    /// Create a new server, connecting to the external services
    pub async fn new(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Build the router with all routes
    fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .merge(routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router
    }

    /// Start the server and the session sweep loop
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        self.state
            .sessions()
            .spawn_sweeper(self.config.session.sweep_interval_secs);

        let router = self.build_router();

        tracing::info!("Starting server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        // On shutdown the ready flag flips first, so load balancers stop
        // routing here while in-flight requests drain
        let state = self.state.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                state.set_ready(false);
                tracing::info!("Shutdown signal received, draining");
            })
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Server address for logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint; also probes the embedding service
async fn readiness(state: axum::extract::State<AppState>) -> axum::http::StatusCode {
    if !state.is_ready() {
        return axum::http::StatusCode::SERVICE_UNAVAILABLE;
    }
    match state.embedder().health_check().await {
        Ok(true) => axum::http::StatusCode::OK,
        _ => {
            tracing::warn!("Embedding service {} not reachable", state.embedder().name());
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::Result;
    use crate::providers::{Embedder, VectorIndex};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FakeEmbedder {
        healthy: bool,
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn tokenize(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(self.healthy)
        }

        fn name(&self) -> &str {
            "fake-embedder"
        }
    }

    struct NoopIndex;

    #[async_trait]
    impl VectorIndex for NoopIndex {
        async fn create_collection(&self, _: &str, _: usize, _: bool) -> Result<()> {
            Ok(())
        }

        async fn insert_batch(&self, _: &str, _: &[Vec<f32>], _: &[String], _: u64) -> Result<usize> {
            Ok(0)
        }

        async fn search(&self, _: &str, _: &[f32], _: usize) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "noop-index"
        }
    }

    fn test_state(healthy: bool) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.ingest.upload_dir = dir.path().join("uploads");
        config.ingest.datasets_dir = dir.path().to_path_buf();

        let state = AppState::with_providers(
            config,
            Arc::new(FakeEmbedder { healthy }),
            Arc::new(NoopIndex),
        );
        (state, dir)
    }

    #[tokio::test]
    async fn test_readiness_flips_with_shutdown_flag() {
        let (state, _dir) = test_state(true);

        let status = readiness(axum::extract::State(state.clone())).await;
        assert_eq!(status, axum::http::StatusCode::OK);

        state.set_ready(false);
        let status = readiness(axum::extract::State(state)).await;
        assert_eq!(status, axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_readiness_requires_healthy_embedder() {
        let (state, _dir) = test_state(false);

        let status = readiness(axum::extract::State(state)).await;
        assert_eq!(status, axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
