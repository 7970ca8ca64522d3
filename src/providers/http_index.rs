//! REST client for the external vector index service

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::IndexConfig;
use crate::error::{Error, Result};

use super::vector_index::VectorIndex;

/// Vector index client over the index's REST contract
///
/// Connectivity is verified once at construction with a bounded retry
/// budget; individual calls after that are not retried.
pub struct HttpVectorIndex {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    dimension: usize,
}

#[derive(Serialize)]
struct InsertRecord<'a> {
    id: u64,
    vector: &'a [f32],
    doc: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    metric: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    documents: Vec<String>,
}

impl HttpVectorIndex {
    /// Connect to the index, probing connectivity with the configured retry
    /// budget. Exhausting the budget is fatal: the caller gets
    /// `Error::IndexUnavailable`.
    pub async fn connect(config: &IndexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(5)
            .build()
            .unwrap_or_default();

        let url = format!("{}/healthz", config.base_url);
        let mut last_err = String::new();

        for attempt in 1..=config.connect_attempts {
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Vector index connected at {}", config.base_url);
                    return Ok(Self {
                        client,
                        base_url: config.base_url.clone(),
                    });
                }
                Ok(response) => {
                    last_err = format!("HTTP {}", response.status());
                }
                Err(e) => {
                    last_err = e.to_string();
                }
            }

            if attempt < config.connect_attempts {
                tracing::warn!(
                    "Vector index connection attempt {}/{} failed: {}",
                    attempt,
                    config.connect_attempts,
                    last_err
                );
                sleep(Duration::from_secs(config.connect_backoff_secs)).await;
            }
        }

        Err(Error::IndexUnavailable {
            attempts: config.connect_attempts,
            message: last_err,
        })
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::index(format!("Collection lookup failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(Error::index(format!("Collection lookup failed: HTTP {}", s))),
        }
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::index(format!("Collection drop failed: {}", e)))?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(Error::index(format!(
                "Collection drop failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn create_collection(&self, name: &str, dimension: usize, recreate: bool) -> Result<()> {
        if recreate && self.collection_exists(name).await? {
            tracing::info!("Collection {} exists, dropping", name);
            self.drop_collection(name).await?;
        }

        let url = format!("{}/collections", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateCollectionRequest { name, dimension })
            .send()
            .await
            .map_err(|e| Error::index(format!("Collection create failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::index(format!(
                "Collection create failed: HTTP {}",
                response.status()
            )));
        }

        tracing::info!("Collection {} created (dimension {})", name, dimension);
        Ok(())
    }

    async fn insert_batch(
        &self,
        collection: &str,
        vectors: &[Vec<f32>],
        documents: &[String],
        start_id: u64,
    ) -> Result<usize> {
        let url = format!("{}/collections/{}/records", self.base_url, collection);
        let mut written = 0usize;

        for (i, (vector, doc)) in vectors.iter().zip(documents.iter()).enumerate() {
            let id = start_id + i as u64;
            let record = InsertRecord {
                id,
                vector,
                doc,
            };

            // Best-effort per record: a rejection is logged and skipped,
            // the remainder of the batch still goes in
            let result = self.client.post(&url).json(&record).send().await;
            match result {
                Ok(response) if response.status().is_success() => written += 1,
                Ok(response) => {
                    let err = Error::RecordRejected {
                        id,
                        message: format!("HTTP {}", response.status()),
                    };
                    tracing::warn!("{} (collection {})", err, collection);
                }
                Err(e) => {
                    let err = Error::RecordRejected {
                        id,
                        message: e.to_string(),
                    };
                    tracing::warn!("{} (collection {})", err, collection);
                }
            }
        }

        Ok(written)
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<String>> {
        let url = format!("{}/collections/{}/search", self.base_url, collection);
        let request = SearchRequest {
            vector: query_vector,
            metric: "cosine",
            top_k: k,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::index(format!("Search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::index(format!(
                "Search failed: HTTP {}",
                response.status()
            )));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::index(format!("Failed to parse search response: {}", e)))?;

        Ok(search_response.documents)
    }

    fn name(&self) -> &str {
        "http-index"
    }
}
