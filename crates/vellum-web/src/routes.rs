//! API routes

use axum::extract::{Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use vellum_core::{GraphStore, VectorIndex};

use crate::error::WebError;
use crate::state::AppState;

/// Document extensions the text parser accepts.
const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "text"];

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/upload", post(upload_documents))
        .route("/api/query", post(query_documents))
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Vellum document retrieval API",
    }))
}

fn supported_document(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, WebError> {
    let mut doc_ids = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
            return Err(WebError::BadRequest(format!(
                "Invalid filename: {filename}"
            )));
        }
        if !supported_document(&filename) {
            return Err(WebError::BadRequest(format!(
                "File {filename} is not a supported document type"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| WebError::BadRequest(format!("Failed to read upload {filename}: {e}")))?;

        tokio::fs::create_dir_all(&state.upload_dir)
            .await
            .map_err(|e| WebError::Internal(format!("Failed to create upload dir: {e}")))?;
        let path = state.upload_dir.join(&filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| WebError::Internal(format!("Failed to save {filename}: {e}")))?;

        match state.ingestion.ingest(&path).await {
            Ok(doc_id) => {
                info!("Successfully uploaded and ingested: {}", filename);
                doc_ids.push(doc_id);
            }
            Err(e) => {
                error!("Error processing {}: {:#}", filename, e);
                return Err(WebError::Ingestion(format!(
                    "Error processing {filename}: {e:#}"
                )));
            }
        }
    }

    let message = format!("Successfully ingested {} document(s)", doc_ids.len());
    Ok(Json(json!({
        "document_ids": doc_ids,
        "message": message,
    })))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_max_hops")]
    max_hops: u32,
}

fn default_top_k() -> usize {
    5
}

fn default_max_hops() -> u32 {
    2
}

async fn query_documents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<serde_json::Value>, WebError> {
    if request.query.trim().is_empty() {
        return Err(WebError::BadRequest("query must not be empty".into()));
    }

    let outcome = state
        .engine
        .query(&request.query, request.top_k, request.max_hops)
        .await;

    serde_json::to_value(&outcome)
        .map(Json)
        .map_err(|e| WebError::Internal(format!("Failed to serialize outcome: {e}")))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let graph = match state.graph.health_check().await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {e}"),
    };

    // The vector engine has no cheap liveness probe beyond an empty search
    let vector = match state.vector.search("", 1).await {
        Ok(_) => "initialized".to_string(),
        Err(e) => format!("error: {e}"),
    };

    Json(json!({
        "status": "ok",
        "neo4j": graph,
        "vector_store": vector,
    }))
}
