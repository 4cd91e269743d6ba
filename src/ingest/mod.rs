// Ingestion module
// Loads a JSON knowledge base, chunks each description and stores embeddings

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::lancedb::{ChunkMetadata, EmbeddingRecord, VectorStore};
use crate::embeddings::{ChunkingConfig, Embedder, OllamaClient, chunk_text};
use crate::{LawError, Result};

/// Field holding the text that gets chunked and embedded
pub const CONTENT_FIELD: &str = "description";

/// Record fields copied into chunk metadata when their values are primitive
pub const METADATA_FIELDS: [&str; 6] = [
    "category",
    "title",
    "description",
    "history",
    "purpose",
    "case_examples",
];

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read knowledge base {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse knowledge base {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Knowledge base {0} must contain a top-level JSON array")]
    NotAnArray(PathBuf),

    #[error("Record {seq_num} is malformed: {reason}")]
    MalformedRecord { seq_num: usize, reason: String },
}

/// One entry of the knowledge base
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeRecord {
    /// 1-based position in the source array
    pub seq_num: usize,
    pub description: String,
    pub metadata: ChunkMetadata,
}

/// A chunk waiting for its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChunk {
    pub content: String,
    pub chunk_index: u32,
    pub metadata: ChunkMetadata,
}

/// What to do with entries already in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngestMode {
    /// Add new entries next to the existing ones
    #[default]
    Append,
    /// Clear the collection before writing
    Rebuild,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub records: usize,
    pub chunks: usize,
    pub embeddings: usize,
    /// Records whose description was empty or whitespace
    pub skipped_records: usize,
}

/// True for values a vector-store metadata column can hold directly
#[inline]
pub fn is_primitive(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null
    )
}

/// Metadata for every chunk of one record
///
/// Nested arrays and objects are dropped, as are nulls and absent fields.
#[inline]
pub fn build_metadata(record: &Map<String, Value>, source: &str, seq_num: usize) -> ChunkMetadata {
    let mut metadata = ChunkMetadata::new();

    for field in METADATA_FIELDS {
        match record.get(field) {
            Some(Value::Null) | None => {}
            Some(value) if is_primitive(value) => {
                metadata.insert(field.to_string(), value.clone());
            }
            Some(_) => {
                debug!("Dropping non-primitive '{}' from record {}", field, seq_num);
            }
        }
    }

    metadata.insert("source".to_string(), Value::from(source));
    metadata.insert("seq_num".to_string(), Value::from(seq_num));
    metadata
}

/// Parse the text of a knowledge-base file
///
/// `source` ends up in every record's metadata.
#[inline]
pub fn parse_knowledge_base(
    text: &str,
    source: &Path,
) -> std::result::Result<Vec<KnowledgeRecord>, IngestError> {
    let value: Value = serde_json::from_str(text).map_err(|e| IngestError::Parse {
        path: source.to_path_buf(),
        source: e,
    })?;

    let Value::Array(items) = value else {
        return Err(IngestError::NotAnArray(source.to_path_buf()));
    };

    let source_name = source.display().to_string();

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let seq_num = index + 1;

            let Value::Object(record) = item else {
                return Err(IngestError::MalformedRecord {
                    seq_num,
                    reason: "expected a JSON object".to_string(),
                });
            };

            let description = match record.get(CONTENT_FIELD) {
                Some(Value::String(text)) => text.clone(),
                Some(_) => {
                    return Err(IngestError::MalformedRecord {
                        seq_num,
                        reason: format!("'{}' must be a string", CONTENT_FIELD),
                    });
                }
                None => {
                    return Err(IngestError::MalformedRecord {
                        seq_num,
                        reason: format!("missing '{}'", CONTENT_FIELD),
                    });
                }
            };

            Ok(KnowledgeRecord {
                seq_num,
                description,
                metadata: build_metadata(record, &source_name, seq_num),
            })
        })
        .collect()
}

/// Read and parse a knowledge-base file
#[inline]
pub fn load_knowledge_base(path: &Path) -> std::result::Result<Vec<KnowledgeRecord>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|e| IngestError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let source = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    parse_knowledge_base(&text, &source)
}

/// Split one record into chunks that each carry the record's metadata
#[inline]
pub fn prepare_chunks(record: &KnowledgeRecord, chunking: &ChunkingConfig) -> Vec<PreparedChunk> {
    chunk_text(&record.description, chunking)
        .into_iter()
        .map(|chunk| PreparedChunk {
            content: chunk.content,
            chunk_index: u32::try_from(chunk.chunk_index).unwrap_or(u32::MAX),
            metadata: record.metadata.clone(),
        })
        .collect()
}

/// Turns a knowledge-base file into stored vector entries
pub struct Ingestor {
    store: VectorStore,
    embedder: Box<dyn Embedder>,
    chunking: ChunkingConfig,
}

impl Ingestor {
    /// Open the store and the Ollama client described by `config`
    ///
    /// Fails early when the embedding backend or its model is unavailable.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let client = OllamaClient::new(&config.ollama)?;
        client
            .health_check()
            .map_err(|e| LawError::Embedding(format!("{:#}", e)))?;

        let store = VectorStore::new(config).await?;

        Ok(Self::from_parts(
            store,
            Box::new(client),
            config.chunking.clone(),
        ))
    }

    #[inline]
    pub fn from_parts(
        store: VectorStore,
        embedder: Box<dyn Embedder>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            chunking,
        }
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Ingest one knowledge-base file
    ///
    /// Nothing is written unless every record parses and every chunk is
    /// embedded. In [`IngestMode::Rebuild`] the collection is cleared just
    /// before the write, so a failed write leaves it empty.
    #[inline]
    pub async fn ingest_file(&mut self, path: &Path, mode: IngestMode) -> Result<IngestStats> {
        info!("Ingesting knowledge base from {}", path.display());

        let records = load_knowledge_base(path)?;
        let mut stats = IngestStats {
            records: records.len(),
            ..IngestStats::default()
        };

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(records.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut entries = Vec::new();
        for record in &records {
            bar.set_message(format!("record {}", record.seq_num));

            let chunks = prepare_chunks(record, &self.chunking);
            if chunks.is_empty() {
                warn!("Record {} has an empty description, skipping", record.seq_num);
                stats.skipped_records += 1;
                bar.inc(1);
                continue;
            }

            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_texts(&texts).map_err(|e| {
                LawError::Embedding(format!(
                    "Failed to embed record {}: {:#}",
                    record.seq_num, e
                ))
            })?;

            if vectors.len() != chunks.len() {
                return Err(LawError::Embedding(format!(
                    "Expected {} embeddings for record {}, got {}",
                    chunks.len(),
                    record.seq_num,
                    vectors.len()
                )));
            }

            stats.chunks += chunks.len();
            stats.embeddings += vectors.len();

            let created_at = Utc::now().to_rfc3339();
            entries.extend(chunks.into_iter().zip(vectors).map(|(chunk, vector)| {
                EmbeddingRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    content: chunk.content,
                    metadata: chunk.metadata,
                    chunk_index: chunk.chunk_index,
                    created_at: created_at.clone(),
                }
            }));

            bar.inc(1);
        }
        bar.finish_and_clear();

        let rebuilding = mode == IngestMode::Rebuild;
        if rebuilding {
            self.store.clear().await?;
        }

        if entries.is_empty() {
            info!("No chunks produced from {}", path.display());
            return Ok(stats);
        }

        if let Err(e) = self.store.store_embeddings_batch(entries).await {
            if rebuilding {
                error!(
                    "Collection was cleared but the new entries could not be stored; \
                     it is now empty until `ingest --rebuild` succeeds"
                );
            }
            return Err(e);
        }
        self.store.optimize().await?;

        info!(
            "Ingested {} records into {} chunks ({} skipped)",
            stats.records, stats.chunks, stats.skipped_records
        );
        Ok(stats)
    }
}
