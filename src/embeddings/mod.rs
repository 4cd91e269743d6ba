// Embeddings module
// Ollama integration and description chunking

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, ContentChunk, char_len, chunk_text};
pub use ollama::{EmbeddingResult, OllamaClient};

/// Anything that turns texts into vectors, one vector per input, in order
pub trait Embedder: Send + Sync {
    fn embed_texts(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    #[inline]
    fn embed_query(&self, query: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_texts(&[query.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedder returned no vector for the query"))
    }
}
