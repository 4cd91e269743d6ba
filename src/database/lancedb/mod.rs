// LanceDB vector database module
// Handles vector storage and similarity search for knowledge-base chunks


pub mod vector_store;

pub use vector_store::{COLLECTION_NAME, SearchResult, VectorStore};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primitive-valued metadata attached to a chunk (string, number or boolean)
pub type ChunkMetadata = Map<String, Value>;

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this entry
    pub id: String,
    /// The vector embedding of `content`
    pub vector: Vec<f32>,
    /// The chunk text
    pub content: String,
    /// Metadata copied from the source record
    pub metadata: ChunkMetadata,
    /// Index of this chunk within its source record
    pub chunk_index: u32,
    /// Timestamp when this entry was written
    pub created_at: String,
}
