#[cfg(test)]
mod tests;

use itertools::Itertools;
use tracing::{debug, info};

use crate::database::lancedb::{ChunkMetadata, SearchResult, VectorStore};
use crate::embeddings::Embedder;
use crate::{LawError, Result};

/// Context returned when the store has nothing to offer
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// Placed between chunks so the model can see where one ends
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

pub const DEFAULT_N_RESULTS: usize = 4;

/// Characters of chunk text shown per match in diagnostics
pub const PREVIEW_CHARS: usize = 400;

/// Context for one query: joined chunk texts plus one metadata map per chunk
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub context: String,
    pub metadatas: Vec<ChunkMetadata>,
}

impl RetrievalResult {
    #[inline]
    pub fn empty() -> Self {
        Self {
            context: NO_RELEVANT_INFORMATION.to_string(),
            metadatas: Vec::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metadatas.is_empty()
    }
}

/// Receives every match the retriever hands to the prompt
pub trait RetrievalDiagnostics: Send + Sync {
    fn on_match(&self, rank: usize, result: &SearchResult);

    #[inline]
    fn on_empty(&self, _query: &str) {}
}

/// Writes matches to the log at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl RetrievalDiagnostics for TracingDiagnostics {
    #[inline]
    fn on_match(&self, rank: usize, result: &SearchResult) {
        info!("{}", describe_match(rank, result));
    }

    #[inline]
    fn on_empty(&self, query: &str) {
        info!("No documents retrieved for query: {}", query);
    }
}

/// Newlines flattened to spaces, cut to `limit` characters with a `...` marker
#[inline]
pub fn preview_text(text: &str, limit: usize) -> String {
    let flattened = text.replace('\n', " ");
    if flattened.chars().count() <= limit {
        return flattened;
    }

    let mut preview: String = flattened.chars().take(limit).collect();
    preview.push_str("...");
    preview
}

/// Human-readable summary of one match; `rank` is 1-based
#[inline]
pub fn describe_match(rank: usize, result: &SearchResult) -> String {
    let metadata = serde_json::to_string(&result.metadata).unwrap_or_default();
    format!(
        "#{} distance: {:.4}\nmeta: {}\ntext: {}",
        rank,
        result.distance,
        metadata,
        preview_text(&result.content, PREVIEW_CHARS)
    )
}

/// Chunk texts joined with [`CHUNK_SEPARATOR`], or the sentinel when there are none
#[inline]
pub fn join_documents(documents: &[&str]) -> String {
    if documents.is_empty() {
        return NO_RELEVANT_INFORMATION.to_string();
    }
    documents.join(CHUNK_SEPARATOR)
}

/// Finds the chunks closest to a query
pub struct ContextRetriever {
    store: VectorStore,
    embedder: Box<dyn Embedder>,
    diagnostics: Option<Box<dyn RetrievalDiagnostics>>,
}

impl ContextRetriever {
    #[inline]
    pub fn new(store: VectorStore, embedder: Box<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            diagnostics: None,
        }
    }

    #[inline]
    pub fn with_diagnostics(mut self, diagnostics: Box<dyn RetrievalDiagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Up to `n_results` chunks for `query`, closest first
    ///
    /// An empty store is not an error: the context is the sentinel text and
    /// the metadata list is empty.
    #[inline]
    pub async fn retrieve(&self, query: &str, n_results: usize) -> Result<RetrievalResult> {
        let query_vector = self
            .embedder
            .embed_query(query)
            .map_err(|e| LawError::Embedding(format!("Failed to embed query: {:#}", e)))?;

        let matches = self.store.search_similar(&query_vector, n_results).await?;
        debug!("Retrieved {} chunks for query", matches.len());

        if let Some(diagnostics) = &self.diagnostics {
            if matches.is_empty() {
                diagnostics.on_empty(query);
            }
            for (index, result) in matches.iter().enumerate() {
                diagnostics.on_match(index + 1, result);
            }
        }

        if matches.is_empty() {
            return Ok(RetrievalResult::empty());
        }

        let context = join_documents(&matches.iter().map(|m| m.content.as_str()).collect_vec());
        let metadatas = matches.into_iter().map(|m| m.metadata).collect();

        Ok(RetrievalResult { context, metadatas })
    }
}
