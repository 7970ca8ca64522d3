//! Vector index trait for collection management, batched insert and search

use async_trait::async_trait;

use crate::error::Result;

/// Trait for the external similarity index
///
/// Id assignment is the caller's responsibility: the pipeline hands
/// `insert_batch` an explicit `start_id` so ids stay unique and gap-free
/// across batches and across jobs targeting the same collection, instead of
/// relying on the index's own auto-increment.
///
/// Implementations:
/// - `HttpVectorIndex`: REST client for the external index service
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a collection; when `recreate` is set and a collection of that
    /// name exists, drop it first and build fresh
    async fn create_collection(&self, name: &str, dimension: usize, recreate: bool) -> Result<()>;

    /// Insert `vectors.len()` records with ids `start_id..start_id + len`,
    /// pairing each vector with the document at the same position.
    ///
    /// Insertion is best-effort per record: a rejected record is logged and
    /// skipped without aborting the rest of the batch. Returns the number of
    /// records actually written.
    async fn insert_batch(
        &self,
        collection: &str,
        vectors: &[Vec<f32>],
        documents: &[String],
        start_id: u64,
    ) -> Result<usize>;

    /// Return up to `k` documents ranked by cosine similarity, best first.
    /// An under-populated collection yields a shorter (possibly empty)
    /// result, never an error.
    async fn search(&self, collection: &str, query_vector: &[f32], k: usize)
        -> Result<Vec<String>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
