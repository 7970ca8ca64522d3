//! Query-time retrieval context lookup

use crate::error::Result;
use crate::providers::{Embedder, VectorIndex};

/// Search a collection for the documents most similar to `query`.
///
/// Returns up to `k` documents, best first; an under-populated collection
/// yields fewer (possibly zero) without error.
pub async fn search_context(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    collection: &str,
    query: &str,
    k: usize,
) -> Result<Vec<String>> {
    let embeddings = embedder.tokenize(std::slice::from_ref(&query.to_string())).await?;
    let query_vector = embeddings
        .into_iter()
        .next()
        .unwrap_or_default();

    let documents = index.search(collection, &query_vector, k).await?;
    tracing::debug!(
        "Retrieved {} context documents from {} for query",
        documents.len(),
        collection
    );
    Ok(documents)
}

/// Prepend retrieved context to a user message for the completion prompt
pub fn augment_with_context(message: &str, context: &[String]) -> String {
    if context.is_empty() {
        return message.to_string();
    }
    format!("Context:\n{}\n\n{}", context.join("\n"), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_augment_without_context_is_passthrough() {
        assert_eq!(augment_with_context("hi", &[]), "hi");
    }

    #[test]
    fn test_augment_prepends_documents() {
        let context = vec!["doc one".to_string(), "doc two".to_string()];
        let augmented = augment_with_context("question", &context);
        assert_eq!(augmented, "Context:\ndoc one\ndoc two\n\nquestion");
    }
}
