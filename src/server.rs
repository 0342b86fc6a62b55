//! HTTP entry point for CSV imports.
//!
//! Exposes the import driver to the admin UI as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/import-csv` | Import `{ "csvData": "..." }`, return the report |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Response Contract
//!
//! A structurally valid request always gets `200`, even when every row
//! failed; row failures are reported in-band:
//!
//! ```json
//! { "message": "Imported 2 products, 1 failed", "count": 2, "errors": 1,
//!   "errorDetails": ["Error importing Bowl: Sanity API error 500: ..."] }
//! ```
//!
//! Structural failures return `{ "error": "<message>" }`: `400` when
//! `csvData` is missing, blank, or the body is not valid JSON, and `500`
//! when the import itself could not complete.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the admin UI can be
//! served from a different origin.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use catalog_import_core::report::ImportReport;

use crate::config::Config;
use crate::import::{ImportError, Importer};
use crate::store::{open_store, DocumentStore};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    importer: Arc<Importer>,
}

/// Starts the import server against the configured store.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;
    run_server_with_store(config, store).await
}

/// Like [`run_server`], but with a caller-supplied store.
pub async fn run_server_with_store(
    config: &Config,
    store: Arc<dyn DocumentStore>,
) -> anyhow::Result<()> {
    let importer = Arc::new(Importer::from_config(config, store)?.with_source("api"));
    let app = router(importer);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "import server listening");
    println!("Import server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router. Exposed so callers can serve it on their own listener.
pub fn router(importer: Arc<Importer>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/import-csv", post(handle_import))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { importer })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::NoData => bad_request(err.to_string()),
            ImportError::Internal(e) => {
                error!(error = %format!("{:#}", e), "import failed");
                internal("Import failed")
            }
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
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

// ============ POST /api/import-csv ============

/// Request body for `POST /api/import-csv`.
#[derive(Deserialize)]
struct ImportRequest {
    #[serde(rename = "csvData", default)]
    csv_data: Option<String>,
}

/// Response body for a structurally successful import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    message: String,
    count: usize,
    errors: usize,
    error_details: Vec<String>,
}

impl From<&ImportReport> for ImportResponse {
    fn from(report: &ImportReport) -> Self {
        Self {
            message: report.summary(),
            count: report.imported_count(),
            errors: report.error_count(),
            error_details: report.error_messages().to_vec(),
        }
    }
}

/// Handler for `POST /api/import-csv`.
///
/// The import runs in its own task: a client that disconnects mid-request
/// does not cancel the row being written.
async fn handle_import(
    State(state): State<AppState>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResponse>, AppError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;
    let csv_data = request
        .csv_data
        .filter(|data| !data.trim().is_empty())
        .ok_or(ImportError::NoData)?;

    info!(bytes = csv_data.len(), "import request received");

    let importer = state.importer.clone();
    let report = tokio::spawn(async move { importer.run(Some(&csv_data)).await })
        .await
        .map_err(|e| {
            error!(error = %e, "import task aborted");
            internal("Import failed")
        })??;

    Ok(Json(ImportResponse::from(&report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_maps_to_400() {
        let err = AppError::from(ImportError::NoData);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "No CSV data provided");
    }

    #[test]
    fn test_internal_maps_to_500() {
        let err = AppError::from(ImportError::Internal(anyhow::anyhow!("disk on fire")));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Import failed");
    }

    #[test]
    fn test_request_field_name() {
        let req: ImportRequest = serde_json::from_str(r#"{"csvData":"Name,Slug\n"}"#).unwrap();
        assert_eq!(req.csv_data.as_deref(), Some("Name,Slug\n"));

        let req: ImportRequest = serde_json::from_str("{}").unwrap();
        assert!(req.csv_data.is_none());
    }
}
