//! Shared request state

use std::path::PathBuf;
use std::sync::Arc;

use vellum_core::{GraphStore, VectorIndex};
use vellum_ingest::IngestionPipeline;
use vellum_retrieval::QueryEngine;

/// Service handles shared by every request.
///
/// Constructed once at process start and injected; no route reaches for
/// globals.
#[derive(Clone)]
pub struct AppState {
    /// Document ingestion pipeline
    pub ingestion: Arc<IngestionPipeline>,
    /// Query engine over hybrid retrieval
    pub engine: Arc<QueryEngine>,
    /// Graph store handle, for the health probe
    pub graph: Arc<dyn GraphStore>,
    /// Vector index handle, for the health probe
    pub vector: Arc<dyn VectorIndex>,
    /// Directory uploads are written to before ingestion
    pub upload_dir: PathBuf,
}
