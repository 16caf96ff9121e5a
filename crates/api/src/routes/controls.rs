//! Camera control routes

use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::Json;
use capture_device::ControlUpdate;
use serde::Deserialize;

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

#[derive(Debug, Deserialize)]
pub struct ResolutionRequest {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

/// POST /set_controls - Merge a partial control update and push it live.
///
/// On the Server node the update is first forwarded best-effort to the peer
/// so both sensors stay matched; a forwarding failure never blocks the
/// local update.
pub async fn set_controls(
    State(state): State<AppState>,
    Json(update): Json<ControlUpdate>,
) -> Json<ApiResponse> {
    if let Some(coordinator) = &state.coordinator {
        coordinator.forward_controls(&update).await;
    }

    match state.session.apply_controls(&update).await {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => Json(ApiResponse::failure(e.to_string())),
    }
}

/// POST /set_resolution - Update the main-stream resolution and restart the
/// preview to apply it. Blocked while a recording is active.
pub async fn set_resolution(
    State(state): State<AppState>,
    Json(request): Json<ResolutionRequest>,
) -> Json<ApiResponse> {
    if let Some(coordinator) = &state.coordinator {
        coordinator
            .forward_resolution(request.width, request.height)
            .await;
    }

    match state
        .session
        .set_resolution(request.width, request.height)
        .await
    {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => Json(ApiResponse::failure(e.to_string())),
    }
}
