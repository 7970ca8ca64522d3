//! Dataset and file ingestion into the vector index

pub mod dataset;
pub mod pipeline;

pub use dataset::DatasetReader;
pub use pipeline::{IngestPipeline, IngestSummary};

use serde::{Deserialize, Serialize};

/// How a dataset's records are turned into documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// One designated field is the retrievable document; the remaining
    /// fields form the context payload that gets embedded
    #[default]
    Direct,
    /// Every string field is concatenated into one document that is both
    /// embedded and stored
    AllFields,
}

/// Derive a collection name from a source identifier by stripping all
/// non-alphanumeric characters.
///
/// The derivation is lossy on purpose: distinct source names that differ
/// only in punctuation normalize to the same collection. Callers treat the
/// result as a best-effort derived key, not a strong identity.
pub fn derive_collection_name(source: &str) -> String {
    source.chars().filter(|c| c.is_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_collection_name() {
        assert_eq!(derive_collection_name("Sample Set!"), "SampleSet");
        assert_eq!(derive_collection_name("data.csv"), "datacsv");
        assert_eq!(derive_collection_name("abc123"), "abc123");
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let once = derive_collection_name("my-data_set v2");
        let twice = derive_collection_name(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_punctuation_variants_collide() {
        assert_eq!(
            derive_collection_name("wiki/articles"),
            derive_collection_name("wiki.articles")
        );
    }
}
