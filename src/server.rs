//! HTTP server for the document pipeline.
//!
//! Exposes upload, listing, processing, deletion, and question answering as
//! a JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method   | Path | Description |
//! |----------|------|-------------|
//! | `POST`   | `/api/documents/upload` | Multipart upload into the blob store |
//! | `GET`    | `/api/documents/list` | Stored files with index membership |
//! | `POST`   | `/api/documents/process` | Ingest named files into the index |
//! | `DELETE` | `/api/documents/{filename}` | Remove a document's chunks and blob |
//! | `GET`    | `/ask?message=...` | Answer a question from uploaded documents |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Partial success
//!
//! Batch endpoints (`upload`, `process`) return `200 OK` when every file
//! succeeded and `206 Partial Content` when any file failed. The body always
//! carries both the successes and the per-file failure reasons, so a caller
//! can retry exactly the failed subset.
//!
//! # Error Contract
//!
//! Non-batch error responses use one schema:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no indexed chunks for report.pdf" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `generation_disabled`
//! (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! upload clients.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::delete::{delete_document, DeletionOutcome};
use crate::embedding::create_provider;
use crate::error::PipelineError;
use crate::index::{create_index, VectorIndex};
use crate::ingest::process_files;
use crate::rag::{answer, create_chat, ChatProvider};
use crate::retrieve::list_documents;
use crate::storage::BlobStore;

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<BlobStore>,
    index: Arc<dyn VectorIndex>,
    /// `None` when `[generation]` is disabled; `/ask` then returns 400.
    chat: Option<Arc<dyn ChatProvider>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<BlobStore>,
        index: Arc<dyn VectorIndex>,
        chat: Option<Arc<dyn ChatProvider>>,
    ) -> Self {
        Self {
            config,
            store,
            index,
            chat,
        }
    }
}

/// Builds the application router. Split out from [`run_server`] so tests can
/// serve it on an ephemeral port.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/documents/upload", post(handle_upload))
        .route("/api/documents/list", get(handle_list))
        .route("/api/documents/process", post(handle_process))
        .route("/api/documents/{filename}", delete(handle_delete))
        .route("/ask", get(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated. Wires up the blob store, vector index, and chat provider from
/// the configuration.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let store = Arc::new(BlobStore::new(&config.storage.root)?);

    let embedder = if config.embedding.is_enabled() {
        Some(create_provider(&config.embedding)?)
    } else {
        None
    };
    let index = create_index(&config.index, embedder).await?;

    let chat = if config.generation.is_enabled() {
        Some(create_chat(&config.generation)?)
    } else {
        None
    };

    let state = AppState::new(config, store, index, chat);
    let app = build_router(state);

    info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(msg) => not_found(msg),
            other => internal(other.to_string()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/documents/upload ============

/// JSON response body for `POST /api/documents/upload`.
#[derive(Serialize)]
struct UploadResponse {
    /// Filenames stored successfully.
    uploaded: Vec<String>,
    /// `"name (reason)"` labels for files that could not be stored.
    failed: Vec<String>,
}

/// Handler for `POST /api/documents/upload`.
///
/// Accepts one or more files as multipart form parts and writes each to the
/// blob store under its client-supplied filename. Re-uploading an existing
/// filename overwrites the stored bytes. Upload does not index; call
/// `process` afterwards.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut uploaded = Vec::new();
    let mut failed = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        match field.bytes().await {
            Ok(bytes) => match state.store.put(&filename, &bytes) {
                Ok(()) => {
                    info!(filename, size = bytes.len(), "stored upload");
                    uploaded.push(filename);
                }
                Err(e) => {
                    warn!(filename, error = %e, "upload failed");
                    failed.push(format!("{} ({})", filename, e));
                }
            },
            Err(e) => {
                warn!(filename, error = %e, "upload body read failed");
                failed.push(format!("{} ({})", filename, e));
            }
        }
    }

    if uploaded.is_empty() && failed.is_empty() {
        return Err(bad_request("no files in multipart body"));
    }

    let status = if failed.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::PARTIAL_CONTENT
    };
    Ok((status, Json(UploadResponse { uploaded, failed })).into_response())
}

// ============ GET /api/documents/list ============

/// One listing row: stored file metadata plus index membership.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedDocument {
    filename: String,
    /// File size in bytes.
    size: u64,
    /// Upload time as epoch milliseconds.
    upload_time: i64,
    in_index: bool,
}

/// Handler for `GET /api/documents/list`.
///
/// Returns every stored file with its size, upload time, and whether any of
/// its chunks are currently in the vector index. Each row costs one index
/// probe.
async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<ListedDocument>>, AppError> {
    let statuses = list_documents(
        &state.store,
        state.index.as_ref(),
        state.config.retrieval.probe_limit,
    )
    .await
    .map_err(|e| internal(e.to_string()))?;

    let rows = statuses
        .into_iter()
        .map(|s| ListedDocument {
            filename: s.filename,
            size: s.size_bytes,
            upload_time: s.uploaded_at.timestamp_millis(),
            in_index: s.in_index,
        })
        .collect();
    Ok(Json(rows))
}

// ============ POST /api/documents/process ============

/// JSON response body for `POST /api/documents/process`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessResponse {
    processed_files: Vec<String>,
    /// `"name (reason)"` labels for files that failed.
    failed_files: Vec<String>,
    total_documents_added: usize,
}

/// Handler for `POST /api/documents/process`.
///
/// Body is a JSON array of stored filenames. Each file is extracted,
/// chunked, and indexed independently; one failure never aborts the rest of
/// the batch. Returns `206` when any file failed.
async fn handle_process(
    State(state): State<AppState>,
    Json(filenames): Json<Vec<String>>,
) -> Result<Response, AppError> {
    if filenames.is_empty() {
        return Err(bad_request("no filenames given"));
    }

    let report = process_files(
        &state.store,
        state.index.as_ref(),
        &state.config.chunking,
        &filenames,
    )
    .await;

    let status = if report.is_partial() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let body = ProcessResponse {
        processed_files: report.processed_files(),
        failed_files: report.failed_files(),
        total_documents_added: report.total_chunks_added,
    };
    Ok((status, Json(body)).into_response())
}

// ============ DELETE /api/documents/{filename} ============

/// JSON response body for `DELETE /api/documents/{filename}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    filename: String,
    chunks_deleted: usize,
    blob_deleted: bool,
}

/// Handler for `DELETE /api/documents/{filename}`.
///
/// Removes the document's chunks from the index, then its blob. `404` when
/// the index holds no chunks for the filename; the blob is left untouched in
/// that case.
async fn handle_delete(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let outcome = delete_document(
        &state.store,
        state.index.as_ref(),
        &filename,
        state.config.retrieval.scan_cap,
    )
    .await?;

    match outcome {
        DeletionOutcome::NotFoundInIndex => {
            Err(not_found(format!("no indexed chunks for {}", filename)))
        }
        DeletionOutcome::Deleted {
            chunks_deleted,
            blob_deleted,
        } => Ok(Json(DeleteResponse {
            filename,
            chunks_deleted,
            blob_deleted,
        })),
    }
}

// ============ GET /ask ============

#[derive(Deserialize)]
struct AskParams {
    message: String,
}

/// Handler for `GET /ask?message=...`.
///
/// Retrieves the most relevant uploaded chunks, assembles the prompt, and
/// returns the generated answer as plain text.
async fn handle_ask(
    State(state): State<AppState>,
    Query(params): Query<AskParams>,
) -> Result<String, AppError> {
    if params.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    let Some(chat) = &state.chat else {
        let mut e = bad_request("generation provider is disabled");
        e.code = "generation_disabled".to_string();
        return Err(e);
    };

    answer(
        state.index.as_ref(),
        chat.as_ref(),
        &params.message,
        &state.config.retrieval,
        &state.config.generation,
    )
    .await
    .map_err(|e| internal(e.to_string()))
}
