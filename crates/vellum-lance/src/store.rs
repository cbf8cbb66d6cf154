//! LanceDB vector store

use std::path::Path;
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, Table};
use tracing::{debug, info, warn};

use vellum_core::{
    flatten_properties, properties_to_json, Chunk, JsonMap, SearchHit, StoreError, StoreResult,
    VectorIndex,
};
use vellum_llm::EmbeddingProvider;

/// Vector store backed by LanceDB.
///
/// One table holds the chunk index: id, text, metadata (JSON) and the
/// embedding vector. The connection is pooled internally, so one store
/// instance is safe to share across concurrent callers.
pub struct LanceVectorStore {
    connection: Connection,
    table_name: String,
    provider: Arc<dyn EmbeddingProvider>,
}

fn vector_err(e: lancedb::Error) -> StoreError {
    StoreError::Vector(e.to_string())
}

impl LanceVectorStore {
    /// Open or create a LanceDB store at the given path.
    pub async fn open(
        path: impl AsRef<Path>,
        table_name: impl Into<String>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> StoreResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        // Ensure directory exists
        if let Some(parent) = path.as_ref().parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Vector(e.to_string()))?;
        }

        let connection = connect(&path_str).execute().await.map_err(vector_err)?;
        info!("Vector store opened at {}", path_str);

        Ok(Self {
            connection,
            table_name: table_name.into(),
            provider,
        })
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> StoreResult<usize> {
        match self.open_table().await? {
            Some(table) => table.count_rows(None).await.map_err(vector_err),
            None => Ok(0),
        }
    }

    /// Whether the index holds no chunks.
    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }

    fn schema(&self) -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.provider.dimensions() as i32,
                ),
                false,
            ),
        ]))
    }

    async fn open_table(&self) -> StoreResult<Option<Table>> {
        let names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(vector_err)?;
        if !names.iter().any(|n| n == &self.table_name) {
            return Ok(None);
        }
        let table = self
            .connection
            .open_table(self.table_name.as_str())
            .execute()
            .await
            .map_err(vector_err)?;
        Ok(Some(table))
    }

    fn build_batch(&self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> StoreResult<RecordBatch> {
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let metadata: Vec<String> = chunks
            .iter()
            .map(|c| {
                let flattened = properties_to_json(&flatten_properties(&c.metadata));
                serde_json::to_string(&flattened)
                    .map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect::<StoreResult<_>>()?;

        let dimensions = self.provider.dimensions() as i32;
        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            vectors
                .into_iter()
                .map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>())),
            dimensions,
        );

        RecordBatch::try_new(
            self.schema(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(texts)),
                Arc::new(StringArray::from(metadata)),
                Arc::new(vector_array),
            ],
        )
        .map_err(|e| StoreError::Vector(e.to_string()))
    }

    fn hits_from_batches(batches: &[RecordBatch]) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        for batch in batches {
            let ids = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>());
            let texts = batch
                .column_by_name("text")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>());
            let metadata = batch
                .column_by_name("metadata")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>());
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

            let (Some(ids), Some(texts), Some(metadata)) = (ids, texts, metadata) else {
                warn!("Search result batch is missing expected columns");
                continue;
            };

            for row in 0..batch.num_rows() {
                let parsed: JsonMap = serde_json::from_str(metadata.value(row)).unwrap_or_else(|e| {
                    warn!("Undecodable chunk metadata in vector store: {}", e);
                    JsonMap::new()
                });
                // L2 distance, ascending; map to a descending similarity
                let score = distances
                    .filter(|d| !d.is_null(row))
                    .map(|d| 1.0 / (1.0 + d.value(row)));

                hits.push(SearchHit {
                    id: ids.value(row).to_string(),
                    text: texts.value(row).to_string(),
                    metadata: parsed,
                    score,
                });
            }
        }
        hits
    }

    fn delete_predicate(chunks: &[Chunk]) -> String {
        let quoted: Vec<String> = chunks
            .iter()
            .map(|c| format!("'{}'", c.id.replace('\'', "''")))
            .collect();
        format!("id IN ({})", quoted.join(", "))
    }
}

#[async_trait]
impl VectorIndex for LanceVectorStore {
    async fn index(&self, chunks: &[Chunk]) -> StoreResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .provider
            .embed_batch(&texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let batch = self.build_batch(chunks, vectors)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        match self.open_table().await? {
            Some(table) => {
                // Replace any previously indexed rows for these ids
                table
                    .delete(&Self::delete_predicate(chunks))
                    .await
                    .map_err(vector_err)?;
                table
                    .add(Box::new(reader))
                    .execute()
                    .await
                    .map_err(vector_err)?;
            }
            None => {
                self.connection
                    .create_table(self.table_name.as_str(), Box::new(reader))
                    .execute()
                    .await
                    .map_err(vector_err)?;
            }
        }

        info!("Indexed {} chunks into vector store", chunks.len());
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> StoreResult<Vec<SearchHit>> {
        let vector = match self.provider.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Query embedding failed, returning no results: {}", e);
                return Ok(Vec::new());
            }
        };

        let Some(table) = self.open_table().await? else {
            debug!("Vector table does not exist yet, returning no results");
            return Ok(Vec::new());
        };

        let batches: Vec<RecordBatch> = match async {
            table
                .query()
                .nearest_to(vector.as_slice())?
                .limit(top_k)
                .execute()
                .await?
                .try_collect()
                .await
        }
        .await
        {
            Ok(batches) => batches,
            Err(e) => {
                warn!("Vector search failed, returning no results: {}", e);
                return Ok(Vec::new());
            }
        };

        let hits = Self::hits_from_batches(&batches);
        debug!("Retrieved {} results for query", hits.len());
        Ok(hits)
    }

    async fn reset(&self) -> StoreResult<()> {
        if self.open_table().await?.is_some() {
            self.connection
                .drop_table(self.table_name.as_str(), &[])
                .await
                .map_err(vector_err)?;
            warn!("Dropped vector table {}", self.table_name);
        }
        Ok(())
    }
}
