//! Configuration for the ingestion and relay service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Completion service configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Ingestion configuration
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Conversation session configuration
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service
    pub base_url: String,
    /// Embedding dimensions (fixed per deployment)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            dimensions: 384,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the vector index service
    pub base_url: String,
    /// Default collection name
    pub default_collection: String,
    /// Connection attempts at startup
    pub connect_attempts: u32,
    /// Backoff between connection attempts in seconds
    pub connect_backoff_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:19530".to_string(),
            default_collection: "default_collection".to_string(),
            connect_attempts: 3,
            connect_backoff_secs: 10,
        }
    }
}

/// Completion service (llama.cpp server) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the completion service
    pub base_url: String,
    /// System instruction prepended to every prompt
    pub instruction: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Top-k sampling
    pub top_k: u32,
    /// Top-p sampling
    pub top_p: f32,
    /// Maximum tokens to generate
    pub n_predict: u32,
    /// Seconds without any streamed bytes before the relay gives up.
    /// Distinct from a total-duration limit: a slow but active generation
    /// is never cut off.
    pub idle_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8008".to_string(),
            instruction: "You are an AI assistant. Your top priority is helping users with their requests.".to_string(),
            temperature: 0.2,
            top_k: 40,
            top_p: 0.9,
            n_predict: 128,
            idle_timeout_secs: 300,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Records per insert batch
    pub batch_size: usize,
    /// Directory holding JSON-Lines datasets
    pub datasets_dir: PathBuf,
    /// Directory holding uploaded files
    pub upload_dir: PathBuf,
    /// Designated document field for direct-mode datasets
    pub document_field: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            datasets_dir: PathBuf::from("./datasets"),
            upload_dir: PathBuf::from("./uploaded_files"),
            document_field: "text".to_string(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of context documents to retrieve per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Conversation session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds of inactivity before a session is evicted
    pub inactive_secs: u64,
    /// Sweep interval in seconds
    pub sweep_interval_secs: u64,
    /// Maximum stored length of a single message
    pub max_message_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactive_secs: 300,
            sweep_interval_secs: 60,
            max_message_len: 4096,
        }
    }
}
