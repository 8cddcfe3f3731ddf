//! HTTP server exposing the ingestion and query pipelines.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Answer a question against the indexed corpus |
//! | `POST` | `/add-data` | Multipart file upload into the index |
//! | `GET`  | `/health-check` | Probe the vector index and embedding provider |
//!
//! # Error Contract
//!
//! Failures are reported as `{ "error": { "code": "...", "message": "..." } }`
//! with a machine-readable code and a deliberately generic message; stage
//! detail stays in the logs. "Nothing relevant found" is not a failure — it
//! comes back as a normal `200` query response with an explanatory message.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the admin UI (a plain
//! HTTP client of these endpoints) can be served from anywhere.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::extract::SUPPORTED_EXTENSIONS;
use crate::index::VectorIndex;
use crate::ingest::{IngestError, IngestPipeline};
use crate::models::{QueryRequest, QueryResponse};
use crate::query::{QueryError, QueryPipeline};

/// Largest accepted upload, in bytes.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state passed to all route handlers.
///
/// The pipelines and client handles are constructed once at startup and
/// shared across concurrent requests via `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestPipeline>,
    pub query: Arc<QueryPipeline>,
    pub embedder: Arc<dyn EmbeddingClient>,
    pub index: Arc<dyn VectorIndex>,
}

/// Starts the HTTP server on the address configured in `[server].bind` and
/// runs until the process is terminated.
pub async fn run_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(state);

    info!(addr = %bind_addr, "docqa server listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router with all routes and layers attached.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/add-data", post(handle_add_data))
        .route("/health-check", get(handle_health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
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

fn bad_request(code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: code.to_string(),
        message: message.into(),
    }
}

fn internal_error(code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: code.to_string(),
        message: message.into(),
    }
}

/// Maps an ingestion failure to its HTTP representation. Only the
/// unsupported-extension gate is the client's fault.
fn ingest_error_response(err: &IngestError) -> AppError {
    match err {
        IngestError::UnsupportedFileType(name) => bad_request(
            "unsupported_file_type",
            format!(
                "unsupported file type: {} (supported: {})",
                name,
                SUPPORTED_EXTENSIONS.join(", ")
            ),
        ),
        IngestError::Extraction(_) => internal_error(
            "extraction_error",
            "an error occurred while extracting text from the file",
        ),
        IngestError::Storage(_) => internal_error(
            "storage_error",
            "an error occurred while storing the uploaded file",
        ),
        IngestError::Indexing { .. } => internal_error(
            "indexing_error",
            "an error occurred while indexing the file",
        ),
    }
}

/// Maps a query failure to its HTTP representation. All stage failures are
/// infrastructure problems, so everything is a 500 with a generic message.
fn query_error_response(err: &QueryError) -> AppError {
    let code = match err {
        QueryError::Embedding(_) => "embedding_error",
        QueryError::Retrieval(_) => "retrieval_error",
        QueryError::ContextAssembly(_) => "context_assembly_error",
        QueryError::Generation(_) => "generation_error",
    };
    internal_error(code, "an error occurred while processing your query")
}

// ============ POST /query ============

async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let response = state
        .query
        .answer(&request.query)
        .await
        .map_err(|e| query_error_response(&e))?;
    Ok(Json(response))
}

// ============ POST /add-data ============

#[derive(Serialize)]
struct AddDataResponse {
    status: String,
    message: String,
}

async fn handle_add_data(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AddDataResponse>, AppError> {
    // Take the first part that carries a filename.
    let mut upload: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request("invalid_multipart", e.to_string()))?
    {
        let Some(name) = field.file_name() else {
            continue;
        };
        let filename = name.to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request("invalid_multipart", e.to_string()))?;
        upload = Some((filename, bytes));
        break;
    }
    let Some((filename, bytes)) = upload else {
        return Err(bad_request("missing_file", "no file part in upload"));
    };

    info!(file = %filename, size = bytes.len(), "received upload");

    let report = state
        .ingest
        .ingest(&filename, &bytes)
        .await
        .map_err(|e| ingest_error_response(&e))?;

    Ok(Json(AddDataResponse {
        status: "success".to_string(),
        message: format!(
            "File {} processed and indexed ({} chunks).",
            report.file, report.chunks_indexed
        ),
    }))
}

// ============ GET /health-check ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Probes both external dependencies: the vector index (`describe`) and the
/// embedding provider (embedding a fixed probe string). Always `200`; the
/// body says healthy or unhealthy, matching what monitoring expects.
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    if let Err(e) = state.index.describe().await {
        error!(error = %e, "health check: vector index unreachable");
        return Json(HealthResponse {
            status: "unhealthy".to_string(),
            error: Some(e.to_string()),
        });
    }

    if let Err(e) = state.embedder.embed("health check").await {
        error!(error = %e, "health check: embedding provider unreachable");
        return Json(HealthResponse {
            status: "unhealthy".to_string(),
            error: Some(e.to_string()),
        });
    }

    Json(HealthResponse {
        status: "healthy".to_string(),
        error: None,
    })
}
