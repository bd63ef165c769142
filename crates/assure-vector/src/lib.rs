//! Assure Vector - Retrieval layer for compliance chunks
//!
//! Implements the [`ChunkRetriever`] contract on top of a Qdrant collection:
//! the query is embedded into the same vector space used at ingestion time,
//! then searched with a mandatory framework metadata filter. An in-memory
//! retriever with the same contract backs tests and index-less development.
//!
//! [`ChunkRetriever`]: assure_core::ChunkRetriever

pub mod embedding;
pub mod memory;
pub mod qdrant_retriever;

pub use embedding::{EmbeddingClient, OpenAiEmbedding};
pub use memory::InMemoryRetriever;
pub use qdrant_retriever::QdrantRetriever;
