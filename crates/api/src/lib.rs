//! Stereo Camera Node Control Surface
//!
//! Thin HTTP layer translating inbound API calls into session controller
//! and coordinator operations. Both node roles expose the same common
//! routes; the Server-role node additionally exposes the synchronized
//! variants that fan out to the peer.

use axum::routing::{get, post};
use axum::Router;
use camera_session::CameraSession;
use capture_device::{CaptureDevice, SyncRole};
use recording_store::RecordingStore;
use serde::Serialize;
use std::sync::Arc;
use sync_coordinator::{PeerClient, SyncCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod routes;

pub use config::StereoNodeConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// This node's session controller
    pub session: Arc<CameraSession>,
    /// Present on the Server-role node only
    pub coordinator: Option<Arc<SyncCoordinator>>,
}

/// Structured response for every control operation
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            filename: None,
        }
    }

    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            success: true,
            message: None,
            filename: Some(filename.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            filename: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Create the application router.
///
/// Synchronized-operation routes are only mounted when the state carries a
/// coordinator (Server role).
pub fn create_router(state: AppState) -> Router {
    // The browser UI is served from either node; allow it everywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/video_feed", get(routes::stream::video_feed))
        .route("/set_controls", post(routes::controls::set_controls))
        .route("/set_resolution", post(routes::controls::set_resolution))
        .route("/start_record", post(routes::capture::start_record))
        .route("/stop_record", post(routes::capture::stop_record))
        .route("/capture_photo", post(routes::capture::capture_photo))
        .route("/list_recordings", get(routes::recordings::list_recordings))
        .route(
            "/recordings/:filename",
            get(routes::recordings::download_recording),
        )
        .route(
            "/delete_recording/:filename",
            post(routes::recordings::delete_recording),
        );

    if state.coordinator.is_some() {
        router = router
            .route("/start_sync_record", post(routes::sync::start_sync_record))
            .route("/stop_sync_record", post(routes::sync::stop_sync_record))
            .route(
                "/capture_sync_photo",
                post(routes::sync::capture_sync_photo),
            );
    }

    router.layer(cors).with_state(state)
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Build the node's services from configuration and serve the control
/// surface until shutdown.
pub async fn run_server(cfg: StereoNodeConfig) -> anyhow::Result<()> {
    let store = RecordingStore::new(&cfg.recordings_dir)?;
    let session = Arc::new(CameraSession::new(CaptureDevice::new(), cfg.role, store));
    session.restart_preview().await?;

    let coordinator = match cfg.role {
        SyncRole::Server => Some(Arc::new(SyncCoordinator::new(
            Arc::clone(&session),
            PeerClient::new(&cfg.peer_addr),
        ))),
        SyncRole::Client => None,
    };

    let app = create_router(AppState {
        session,
        coordinator,
    });

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    info!(addr = %cfg.listen_addr, role = ?cfg.role, "Control surface listening");
    axum::serve(listener, app).await?;
    Ok(())
}
