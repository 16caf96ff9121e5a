//! Synchronized-operation routes (Server-role node only)

use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use sync_coordinator::SyncCoordinator;

fn coordinator(state: &AppState) -> Option<Arc<SyncCoordinator>> {
    state.coordinator.clone()
}

/// POST /start_sync_record - Arm the peer, then start the local recording
/// whose start fires the synchronization pulse.
pub async fn start_sync_record(State(state): State<AppState>) -> Json<ApiResponse> {
    let Some(coordinator) = coordinator(&state) else {
        return Json(ApiResponse::failure("Not the server-role node"));
    };

    match coordinator.start_synchronized_recording().await {
        Ok(outcome) => {
            let mut response = ApiResponse::with_filename(outcome.filename);
            if let Some(warning) = outcome.peer_warning {
                response = response.message(warning);
            }
            Json(response)
        }
        Err(e) => Json(ApiResponse::failure(e.to_string())),
    }
}

/// POST /stop_sync_record - Stop locally first, then best-effort notify the
/// peer. Always succeeds; a peer warning rides along in the message.
pub async fn stop_sync_record(State(state): State<AppState>) -> Json<ApiResponse> {
    let Some(coordinator) = coordinator(&state) else {
        return Json(ApiResponse::failure("Not the server-role node"));
    };

    let outcome = coordinator.stop_synchronized_recording().await;
    let mut response = ApiResponse::ok();
    if let Some(warning) = outcome.peer_warning {
        response = response.message(warning);
    }
    Json(response)
}

/// POST /capture_sync_photo - Arm the peer's still capture, then capture
/// locally. A peer arming failure aborts the whole operation.
pub async fn capture_sync_photo(State(state): State<AppState>) -> Json<ApiResponse> {
    let Some(coordinator) = coordinator(&state) else {
        return Json(ApiResponse::failure("Not the server-role node"));
    };

    match coordinator.capture_synchronized_still().await {
        Ok(filename) => Json(ApiResponse::with_filename(filename)),
        Err(e) => Json(ApiResponse::failure(e.to_string())),
    }
}
