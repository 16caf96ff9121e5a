//! Recording gallery routes

use crate::{ApiResponse, AppState};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use recording_store::StoreError;
use tracing::warn;

/// GET /list_recordings - Served recordings, newest first
pub async fn list_recordings(State(state): State<AppState>) -> Json<Vec<String>> {
    match state.session.store().list() {
        Ok(names) => Json(names),
        Err(e) => {
            warn!(error = %e, "Failed to list recordings");
            Json(Vec::new())
        }
    }
}

/// GET /recordings/:filename - Download a recording as an attachment
pub async fn download_recording(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    let path = match state.session.store().resolve(&filename) {
        Ok(path) => path,
        Err(StoreError::InvalidName(_)) => return StatusCode::BAD_REQUEST.into_response(),
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    match tokio::fs::read(&path).await {
        Ok(data) => (
            [
                (
                    header::CONTENT_TYPE,
                    "application/octet-stream".to_string(),
                ),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            data,
        )
            .into_response(),
        Err(e) => {
            warn!(filename, error = %e, "Failed to read recording");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// POST /delete_recording/:filename - Remove a recording file
pub async fn delete_recording(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Json<ApiResponse> {
    match state.session.store().delete(&filename) {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => Json(ApiResponse::failure(e.to_string())),
    }
}
