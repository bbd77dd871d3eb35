use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::PoisonError;
use tracing::debug;

use super::AppState;
use super::errors::ApiError;
use crate::notes::InsertedNote;

#[inline]
pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/search-note", post(search_note))
        .route("/insert-note", post(insert_note))
}

#[inline]
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteRequest {
    /// Falls back to the server's configured key when absent
    #[serde(default)]
    api_key: Option<String>,
    text: String,
}

#[derive(Debug, Serialize)]
struct DataResponse<T> {
    data: T,
}

async fn search_note(
    State(state): State<AppState>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Json<DataResponse<Vec<String>>>, ApiError> {
    let Json(request) = payload?;
    let api_key = state
        .config
        .pinecone
        .resolve_api_key(request.api_key.as_deref())?;

    debug!("Searching notes for {} characters of text", request.text.len());

    let texts = run_blocking(move || state.note_store(&api_key)?.search_notes(&request.text))
        .await?;

    Ok(Json(DataResponse { data: texts }))
}

async fn insert_note(
    State(state): State<AppState>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Json<DataResponse<InsertedNote>>, ApiError> {
    let Json(request) = payload?;
    let api_key = state
        .config
        .pinecone
        .resolve_api_key(request.api_key.as_deref())?;

    let inserted = run_blocking(move || {
        let store = state.note_store(&api_key)?;
        // Sequential ids are read-modify-write on the sentinel
        let _guard = state
            .insert_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        store.insert_note(&request.text)
    })
    .await?;

    Ok(Json(DataResponse { data: inserted }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "note-search"
    }))
}

/// Pinecone calls block, so they run on tokio's blocking pool
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::internal(format!("Worker task failed: {}", e)))?
        .map_err(ApiError::from)
}
