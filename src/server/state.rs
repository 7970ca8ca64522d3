//! Shared application state
//!
//! All collaborators are constructed here and injected into handlers
//! through axum state. Provider seams stay trait objects so tests can
//! substitute fakes without any HTTP in the way.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::ingestion::IngestPipeline;
use crate::jobs::JobRegistry;
use crate::providers::{Embedder, HttpVectorIndex, LlamaEmbedder, VectorIndex};
use crate::relay::InferenceClient;
use crate::session::SessionRegistry;
use crate::store::RecordStore;

/// Shared application state, cheap to clone
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    pipeline: IngestPipeline,
    inference: InferenceClient,
    sessions: Arc<SessionRegistry>,
    jobs: Arc<JobRegistry>,
    records: RecordStore,
    ready: RwLock<bool>,
}

impl AppState {
    /// Build state against the real external services.
    ///
    /// Fails fast if the vector index cannot be reached within the
    /// configured retry budget; every other collaborator is lazy.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(LlamaEmbedder::new(&config.embedding));
        tracing::info!(
            "Embedding client initialized ({} dims via {})",
            config.embedding.dimensions,
            config.embedding.base_url
        );

        let index: Arc<dyn VectorIndex> = Arc::new(HttpVectorIndex::connect(&config.index).await?);

        Ok(Self::with_providers(config, embedder, index))
    }

    /// Build state over explicit providers
    pub fn with_providers(
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        if let Err(e) = std::fs::create_dir_all(&config.ingest.upload_dir) {
            tracing::warn!(
                "Cannot create upload dir {}: {}",
                config.ingest.upload_dir.display(),
                e
            );
        }

        let pipeline = IngestPipeline::new(Arc::clone(&embedder), Arc::clone(&index), &config.ingest);
        let inference = InferenceClient::new(&config.llm);
        let sessions = Arc::new(SessionRegistry::new(&config.session));
        let records = RecordStore::open(config.ingest.upload_dir.join("records.json"));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                embedder,
                index,
                pipeline,
                inference,
                sessions,
                jobs: Arc::new(JobRegistry::new()),
                records,
                ready: RwLock::new(true),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.inner.embedder.as_ref()
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.inner.index.as_ref()
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    pub fn inference(&self) -> &InferenceClient {
        &self.inner.inference
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.inner.sessions
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.inner.jobs
    }

    pub fn records(&self) -> &RecordStore {
        &self.inner.records
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
