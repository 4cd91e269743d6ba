
use super::{ChunkMetadata, EmbeddingRecord};
use crate::{LawError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Name of the table holding the knowledge base
pub const COLLECTION_NAME: &str = "legal_knowledge";

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub chunk_index: u32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the knowledge-base table under the configured directory
    ///
    /// A new table is created with the configured embedding dimension; an
    /// existing table keeps the dimension it was created with.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, LawError> {
        let db_path = config.vector_database_path();
        let dimension = config.ollama.embedding_dimension as usize;
        Self::open(&db_path, COLLECTION_NAME, dimension).await
    }

    /// Open a table at an explicit path
    #[inline]
    pub async fn open(
        db_path: &Path,
        table_name: &str,
        default_dimension: usize,
    ) -> Result<Self, LawError> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            LawError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = db_path.display().to_string();
        let connection = lancedb::connect(&uri).execute().await.map_err(|e| {
            error!("Failed to connect to LanceDB: {}", e);
            LawError::Database(format!("Failed to connect to LanceDB: {}", e))
        })?;

        let mut store = Self {
            connection,
            table_name: table_name.to_string(),
            vector_dimension: default_dimension,
        };

        store.initialize_table().await?;

        info!("Vector store '{}' initialized", store.table_name);
        Ok(store)
    }

    /// Dimension of the vector column
    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    /// Initialize the table with the correct schema
    async fn initialize_table(&mut self) -> Result<(), LawError> {
        if self.table_exists().await? {
            debug!("Table already exists, detecting vector dimension");
            match self.detect_existing_vector_dimension().await {
                Ok(dim) => {
                    self.vector_dimension = dim;
                    info!("Detected existing vector dimension: {}", dim);
                }
                Err(e) => {
                    warn!(
                        "Could not detect vector dimension from existing table: {}",
                        e
                    );
                }
            }
            return Ok(());
        }

        self.create_empty_table().await
    }

    async fn table_exists(&self) -> Result<bool, LawError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| LawError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.contains(&self.table_name))
    }

    async fn create_empty_table(&self) -> Result<(), LawError> {
        let schema = Self::create_schema(self.vector_dimension);

        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| LawError::Database(format!("Failed to create table: {}", e)))?;

        info!(
            "Table '{}' created with {} dimensions",
            self.table_name, self.vector_dimension
        );
        Ok(())
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, LawError> {
        let table = self.open_table().await?;

        let schema = table
            .schema()
            .await
            .map_err(|e| LawError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return usize::try_from(*size).map_err(|_| {
                        LawError::Database(format!("Invalid vector dimension: {}", size))
                    });
                }
            }
        }

        Err(LawError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    async fn open_table(&self) -> Result<lancedb::Table, LawError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| LawError::Database(format!("Failed to open table: {}", e)))
    }

    /// Append a batch of records; existing rows are never replaced
    ///
    /// An empty table whose dimension differs from the incoming vectors is
    /// recreated. A populated table with a different dimension is an error.
    #[inline]
    pub async fn store_embeddings_batch(
        &mut self,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), LawError> {
        let Some(first) = records.first() else {
            debug!("No embeddings to store");
            return Ok(());
        };

        debug!("Storing batch of {} embeddings", records.len());

        let vector_dim = first.vector.len();
        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(LawError::Database(format!(
                "Inconsistent vector dimensions in batch: {} vs {} (record {})",
                vector_dim,
                bad.vector.len(),
                bad.id
            )));
        }

        if self.vector_dimension != vector_dim {
            let existing = self.count_embeddings().await?;
            if existing > 0 {
                return Err(LawError::Database(format!(
                    "Embedding dimension {} does not match the stored dimension {}; \
                     re-ingest with --rebuild to replace the collection",
                    vector_dim, self.vector_dimension
                )));
            }

            info!(
                "Vector dimension changed from {} to {}, recreating empty table",
                self.vector_dimension, vector_dim
            );
            self.vector_dimension = vector_dim;
            self.drop_table_if_exists().await?;
            self.create_empty_table().await?;
        }

        let record_batch = self.create_record_batch(&records)?;

        let table = self.open_table().await?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| LawError::Database(format!("Failed to insert embeddings: {}", e)))?;

        info!("Successfully stored {} embeddings", records.len());
        Ok(())
    }

    /// Create a RecordBatch from embedding records
    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch, LawError> {
        let len = records.len();
        let vector_dim = self.vector_dimension;

        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        let mut contents = Vec::with_capacity(len);
        let mut metadata = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.vector);
            contents.push(record.content.as_str());
            metadata.push(serde_json::to_string(&record.metadata).map_err(|e| {
                LawError::Database(format!("Failed to serialize chunk metadata: {}", e))
            })?);
            chunk_indices.push(record.chunk_index);
            created_ats.push(record.created_at.as_str());
        }

        let schema = Self::create_schema(vector_dim);

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    LawError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| LawError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Nearest neighbours of `query_vector`, closest first
    ///
    /// Returns at most `limit` results and never pads; an empty table yields
    /// an empty list.
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, LawError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        if limit == 0 || self.count_embeddings().await? == 0 {
            return Ok(Vec::new());
        }

        if query_vector.len() != self.vector_dimension {
            return Err(LawError::Database(format!(
                "Query vector has {} dimensions but the collection stores {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        let table = self.open_table().await?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| LawError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| LawError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = self.parse_search_results_stream(results).await?;
        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        search_results.truncate(limit);
        Ok(search_results)
    }

    /// Flatten the result stream's batches into one ordered list
    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>, LawError> {
        let mut search_results = Vec::new();

        while let Some(batch_result) = results
            .try_next()
            .await
            .map_err(|e| LawError::Database(format!("Failed to read result stream: {}", e)))?
        {
            let parsed_batch = Self::parse_search_batch(&batch_result)?;
            search_results.extend(parsed_batch);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, LawError> {
        batch
            .column_by_name(name)
            .ok_or_else(|| LawError::Database(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| LawError::Database(format!("Invalid {} column type", name)))
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, LawError> {
        let contents = Self::string_column(batch, "content")?;
        let metadata = Self::string_column(batch, "metadata")?;

        let chunk_indices = batch
            .column_by_name("chunk_index")
            .ok_or_else(|| LawError::Database("Missing chunk_index column".to_string()))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| LawError::Database("Invalid chunk_index column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut search_results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let metadata: ChunkMetadata = serde_json::from_str(metadata.value(row))
                .map_err(|e| LawError::Database(format!("Corrupt chunk metadata: {}", e)))?;

            let distance =
                distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            search_results.push(SearchResult {
                content: contents.value(row).to_string(),
                metadata,
                chunk_index: chunk_indices.value(row),
                distance,
            });
        }

        Ok(search_results)
    }

    /// Get the total number of entries stored
    #[inline]
    pub async fn count_embeddings(&self) -> Result<u64, LawError> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| LawError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Remove every entry, leaving an empty table with the current dimension
    #[inline]
    pub async fn clear(&mut self) -> Result<(), LawError> {
        info!("Clearing collection '{}'", self.table_name);
        self.drop_table_if_exists().await?;
        self.create_empty_table().await
    }

    /// Compact the table files after a bulk write
    #[inline]
    pub async fn optimize(&mut self) -> Result<(), LawError> {
        debug!("Optimizing vector database");

        let table = self.open_table().await?;

        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| LawError::Database(format!("Failed to optimize table: {}", e)))?;

        info!("Vector database optimization completed");
        Ok(())
    }

    async fn drop_table_if_exists(&self) -> Result<(), LawError> {
        if self.table_exists().await? {
            info!("Dropping table '{}'", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| LawError::Database(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }

    /// Check that the table exists and can be read
    #[inline]
    pub async fn validate_integrity(&self) -> Result<bool, LawError> {
        debug!("Validating database integrity");

        match self.table_exists().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Table '{}' missing during integrity check", self.table_name);
                return Ok(false);
            }
            Err(e) => {
                error!("Failed to list tables during integrity check: {}", e);
                return Ok(false);
            }
        }

        match self.count_embeddings().await {
            Ok(count) => {
                debug!("Database integrity check passed, {} rows found", count);
                Ok(true)
            }
            Err(e) => {
                error!("Failed to read table during integrity check: {}", e);
                Ok(false)
            }
        }
    }
}
