//! Provider abstractions for embeddings and the vector index
//!
//! Trait-based seams so the server wires real HTTP clients while tests
//! substitute in-memory fakes.

pub mod embedding;
pub mod http_index;
pub mod llama;
pub mod vector_index;

pub use embedding::Embedder;
pub use http_index::HttpVectorIndex;
pub use llama::LlamaEmbedder;
pub use vector_index::VectorIndex;
