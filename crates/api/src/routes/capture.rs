//! Local record and still-capture routes
//!
//! On the Client node these double as the arm endpoints the Server-role
//! coordinator calls before firing the pulse.

use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::error;

/// POST /start_record - Arm and start a recording session in this node's
/// own sync role. On the Client node the device blocks waiting for the
/// Server's pulse.
pub async fn start_record(State(state): State<AppState>) -> Json<ApiResponse> {
    let base_name = recording_store::video_base_name(state.session.role().label());
    match state.session.prepare_and_start_recording(&base_name).await {
        Ok(()) => Json(ApiResponse::with_filename(base_name)),
        Err(e) => Json(ApiResponse::failure(e.to_string())),
    }
}

/// POST /stop_record - Stop the active recording and restore the preview
pub async fn stop_record(State(state): State<AppState>) -> Json<ApiResponse> {
    match state.session.stop_recording().await {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => Json(ApiResponse::failure(e.to_string())),
    }
}

/// POST /capture_photo - Arm a still capture and return immediately.
///
/// The capture runs in the background: the caller (the Server-role
/// coordinator, or an operator) must not be blocked waiting for this node's
/// pulse wait. The session restores its own preview regardless of outcome.
pub async fn capture_photo(State(state): State<AppState>) -> Json<ApiResponse> {
    let filename = recording_store::photo_file_name(state.session.role().label());
    let session = Arc::clone(&state.session);
    let task_filename = filename.clone();

    tokio::spawn(async move {
        if let Err(e) = session.capture_single_image(&task_filename).await {
            error!(filename = task_filename, error = %e, "Background still capture failed");
        }
    });

    Json(ApiResponse::with_filename(filename))
}
