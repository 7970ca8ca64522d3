//! Batched embedding-ingestion pipeline
//!
//! Drives an `Embedder` and a `VectorIndex` over a record source in
//! bounded-size batches. Ids are assigned here, not by the index: each
//! batch's starting id is the cumulative count of records handed to the
//! index so far, which keeps ids unique and gap-free across batches.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::providers::{Embedder, VectorIndex};

use super::{derive_collection_name, DatasetReader, IngestMode};

/// Outcome of one ingestion job
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    /// Target collection
    pub collection: String,
    /// Records written to the index
    pub records_written: u64,
    /// Records lost to embedding errors, index rejections or bad input
    pub records_failed: u64,
    /// Number of insert calls issued
    pub batches_flushed: u64,
}

/// Batched ingestion pipeline
pub struct IngestPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
    document_field: String,
}

impl IngestPipeline {
    /// Create a pipeline over the given providers
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            batch_size: config.batch_size,
            document_field: config.document_field.clone(),
        }
    }

    /// Ingest a dataset under a collection derived from `source`.
    ///
    /// The collection is recreated: re-ingesting the same source name drops
    /// and replaces the prior collection. Per-record and per-batch failures
    /// are counted and skipped; only an unopenable source aborts the job.
    pub async fn ingest_dataset(
        &self,
        reader: DatasetReader,
        source: &str,
        mode: IngestMode,
    ) -> Result<IngestSummary> {
        let collection = derive_collection_name(source);
        tracing::info!(
            "Ingesting dataset {} ({}) into collection {} ({:?} mode)",
            source,
            reader.path().display(),
            collection,
            mode
        );

        self.index
            .create_collection(&collection, self.embedder.dimensions(), true)
            .await?;

        let mut batcher = Batcher::new(
            self.embedder.as_ref(),
            self.index.as_ref(),
            &collection,
            self.batch_size,
        );

        for record in reader {
            match record {
                Ok(fields) => match self.prepare(&fields, mode) {
                    Some((embed_text, document)) => {
                        batcher.push(embed_text, document).await;
                    }
                    None => {
                        tracing::warn!(
                            "Record missing document field '{}', skipping",
                            self.document_field
                        );
                        batcher.note_failure(1);
                    }
                },
                Err(e) => {
                    tracing::warn!("Unreadable record in {}: {}", source, e);
                    batcher.note_failure(1);
                }
            }
        }

        // Trailing partial batch is flushed unconditionally
        batcher.flush().await;

        let summary = batcher.finish(collection.clone());
        tracing::info!(
            "Dataset {} loaded: {} written, {} failed, {} batches",
            source,
            summary.records_written,
            summary.records_failed,
            summary.batches_flushed
        );
        Ok(summary)
    }

    /// Ingest a single delimited file: every cell becomes an independent
    /// document, embedded and stored individually.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestSummary> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::source_unavailable(format!("Bad file path: {}", path.display())))?;

        let collection = derive_collection_name(file_name);
        tracing::info!("Ingesting file {} into collection {}", file_name, collection);

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                Error::source_unavailable(format!("Cannot open file {}: {}", path.display(), e))
            })?;

        self.index
            .create_collection(&collection, self.embedder.dimensions(), true)
            .await?;

        let mut batcher = Batcher::new(
            self.embedder.as_ref(),
            self.index.as_ref(),
            &collection,
            self.batch_size,
        );

        for record in csv_reader.records() {
            match record {
                Ok(row) => {
                    for cell in row.iter() {
                        let cell = cell.trim();
                        if cell.is_empty() {
                            continue;
                        }
                        batcher.push(cell.to_string(), cell.to_string()).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("Unreadable row in {}: {}", file_name, e);
                    batcher.note_failure(1);
                }
            }
        }

        batcher.flush().await;

        let summary = batcher.finish(collection.clone());
        tracing::info!(
            "File {} loaded: {} written, {} failed, {} batches",
            file_name,
            summary.records_written,
            summary.records_failed,
            summary.batches_flushed
        );
        Ok(summary)
    }

    /// Turn one record into (text to embed, document to store) per the mode.
    /// Returns `None` when a direct-mode record lacks the document field.
    fn prepare(&self, fields: &Map<String, Value>, mode: IngestMode) -> Option<(String, String)> {
        match mode {
            IngestMode::Direct => {
                let document = fields.get(&self.document_field).map(stringify)?;
                let context = fields
                    .iter()
                    .filter(|(key, _)| *key != &self.document_field)
                    .map(|(key, value)| format!("{}:{}", key, stringify(value)))
                    .collect::<Vec<_>>()
                    .join(" ");
                Some((context, document))
            }
            IngestMode::AllFields => {
                // Only string-valued fields participate; other scalar types
                // are skipped
                let document = fields
                    .iter()
                    .filter_map(|(key, value)| {
                        value.as_str().map(|s| format!("{}:{}", key, s))
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                Some((document.clone(), document))
            }
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Accumulates (embed text, document) pairs and flushes them through the
/// embedder into the index one batch at a time, bounding peak memory to a
/// single batch.
struct Batcher<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    collection: &'a str,
    batch_size: usize,
    embed_texts: Vec<String>,
    documents: Vec<String>,
    /// Id cursor: cumulative records handed to the index. A skipped batch
    /// does not advance it, so ids stay gap-free.
    next_id: u64,
    written: u64,
    failed: u64,
    batches: u64,
}

impl<'a> Batcher<'a> {
    fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        collection: &'a str,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            collection,
            batch_size,
            embed_texts: Vec::with_capacity(batch_size),
            documents: Vec::with_capacity(batch_size),
            next_id: 0,
            written: 0,
            failed: 0,
            batches: 0,
        }
    }

    async fn push(&mut self, embed_text: String, document: String) {
        self.embed_texts.push(embed_text);
        self.documents.push(document);
        if self.documents.len() >= self.batch_size {
            self.flush().await;
        }
    }

    fn note_failure(&mut self, count: u64) {
        self.failed += count;
    }

    /// Flush the pending batch. Embedding or index errors skip the batch
    /// and count its records as failed; the job continues.
    async fn flush(&mut self) {
        if self.documents.is_empty() {
            return;
        }

        let batch_len = self.documents.len();
        let embed_texts = std::mem::take(&mut self.embed_texts);
        let documents = std::mem::take(&mut self.documents);

        let embeddings = match self.embedder.tokenize(&embed_texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::warn!(
                    "Embedding failed for batch of {} (collection {}): {}",
                    batch_len,
                    self.collection,
                    e
                );
                self.failed += batch_len as u64;
                return;
            }
        };

        match self
            .index
            .insert_batch(self.collection, &embeddings, &documents, self.next_id)
            .await
        {
            Ok(written) => {
                self.batches += 1;
                self.next_id += batch_len as u64;
                self.written += written as u64;
                self.failed += (batch_len - written) as u64;
            }
            Err(e) => {
                tracing::warn!(
                    "Insert failed for batch of {} (collection {}): {}",
                    batch_len,
                    self.collection,
                    e
                );
                self.failed += batch_len as u64;
            }
        }
    }

    fn finish(self, collection: String) -> IngestSummary {
        IngestSummary {
            collection,
            records_written: self.written,
            records_failed: self.failed,
            batches_flushed: self.batches,
        }
    }
}
