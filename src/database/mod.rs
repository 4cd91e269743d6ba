// Database module
// LanceDB holds chunk text, embeddings and metadata for retrieval

pub mod lancedb;

pub use self::lancedb::{ChunkMetadata, EmbeddingRecord, SearchResult, VectorStore};
