//! Handshake sequencing

use crate::{CoordinatorError, PeerClient};
use camera_session::{CameraSession, SessionError};
use capture_device::ControlUpdate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed delay between arming the peer's still capture and firing the local
/// pulse. Inherited heuristic: there is no ready-acknowledgement from the
/// peer's background capture task, so we give it this long to reach its
/// blocking start before the pulse goes out.
pub const PHOTO_ARM_DELAY: Duration = Duration::from_millis(200);

/// Result of a start-record handshake
#[derive(Debug, Clone)]
pub struct RecordStartOutcome {
    /// Local recording base name
    pub filename: String,
    /// Base name the peer reported for its half of the pair, if it armed
    pub peer_filename: Option<String>,
    /// Set when the peer failed to arm and the recording proceeded anyway;
    /// the pair may be desynchronized.
    pub peer_warning: Option<String>,
}

/// Result of a stop-record handshake
#[derive(Debug, Clone)]
pub struct RecordStopOutcome {
    /// Set when the best-effort peer notification failed
    pub peer_warning: Option<String>,
}

/// Sequences the cross-node handshakes from the Server-role node.
///
/// Calls the controller locally and the peer's control surface remotely;
/// never owns any peer state.
pub struct SyncCoordinator {
    session: Arc<CameraSession>,
    peer: PeerClient,
}

impl SyncCoordinator {
    pub fn new(session: Arc<CameraSession>, peer: PeerClient) -> Self {
        Self { session, peer }
    }

    /// Start-record handshake: arm the peer, then start locally.
    ///
    /// The arm request completes (success or timeout) strictly before the
    /// local start fires the pulse. A peer arming failure does not abort:
    /// the local recording proceeds and the outcome carries a warning —
    /// known edge case, the pair may record desynchronized rather than not
    /// at all. A local start failure is returned as-is; no compensating
    /// rollback is sent to the peer.
    pub async fn start_synchronized_recording(
        &self,
    ) -> Result<RecordStartOutcome, CoordinatorError> {
        if self.session.is_recording().await {
            return Err(SessionError::AlreadyRecording.into());
        }

        let (peer_filename, peer_warning) = match self.peer.arm_record().await {
            Ok(ack) if ack.success => (ack.filename, None),
            Ok(ack) => {
                let reason = ack.message.unwrap_or_else(|| "peer refused to arm".into());
                warn!(reason, "Peer failed to arm for recording, proceeding unsynchronized");
                (None, Some(format!("Peer failed to arm: {reason}")))
            }
            Err(e) => {
                warn!(error = %e, "Peer unreachable for record arm, proceeding unsynchronized");
                (None, Some(format!("Peer unreachable: {e}")))
            }
        };

        let filename = recording_store::video_base_name(self.session.role().label());
        self.session.prepare_and_start_recording(&filename).await?;
        info!(filename, armed_peer = peer_warning.is_none(), "Synchronized recording started");

        Ok(RecordStartOutcome {
            filename,
            peer_filename,
            peer_warning,
        })
    }

    /// Stop-record handshake: stop locally first, then best-effort notify
    /// the peer. Stopping is never blocked by network issues.
    pub async fn stop_synchronized_recording(&self) -> RecordStopOutcome {
        if self.session.is_recording().await {
            if let Err(e) = self.session.stop_recording().await {
                warn!(error = %e, "Local stop-record reported an error");
            }
        }

        let peer_warning = match self.peer.stop_record().await {
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Peer stop-record notification failed (ignored)");
                Some(format!("Peer stop notification failed: {e}"))
            }
        };
        RecordStopOutcome { peer_warning }
    }

    /// Capture-still handshake: arm the peer, wait for it to reach its
    /// blocking start, then capture locally (pulse fires here).
    ///
    /// Unlike record, a peer arming failure aborts the whole operation: an
    /// unsynchronized pair of stills is a failed capture. The peer restores
    /// its own preview regardless of the local outcome.
    pub async fn capture_synchronized_still(&self) -> Result<String, CoordinatorError> {
        if self.session.is_recording().await {
            return Err(SessionError::RecordingInProgress.into());
        }

        self.peer.arm_photo().await?;
        tokio::time::sleep(PHOTO_ARM_DELAY).await;

        let filename = recording_store::photo_file_name(self.session.role().label());
        self.session.capture_single_image(&filename).await?;
        info!(filename, "Synchronized still captured");
        Ok(filename)
    }

    /// Best-effort control forwarding; a failure never blocks the local
    /// update since the operator watches the local preview.
    pub async fn forward_controls(&self, update: &ControlUpdate) {
        if let Err(e) = self.peer.forward_controls(update).await {
            warn!(error = %e, "Control forwarding to peer failed (ignored)");
        }
    }

    /// Best-effort resolution forwarding
    pub async fn forward_resolution(&self, width: u32, height: u32) {
        if let Err(e) = self.peer.forward_resolution(width, height).await {
            warn!(error = %e, "Resolution forwarding to peer failed (ignored)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use capture_device::{CaptureDevice, MockHook, SyncRole};
    use recording_store::RecordingStore;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use std::time::Instant;

    type ArmLog = Arc<Mutex<Vec<Instant>>>;

    async fn peer_arm_record(State(log): State<ArmLog>) -> Json<serde_json::Value> {
        log.lock().unwrap().push(Instant::now());
        Json(serde_json::json!({
            "success": true,
            "filename": "right_20260825_120000"
        }))
    }

    async fn peer_arm_photo(State(log): State<ArmLog>) -> Json<serde_json::Value> {
        log.lock().unwrap().push(Instant::now());
        Json(serde_json::json!({ "success": true }))
    }

    async fn peer_stop_record() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "success": true }))
    }

    /// Fake Client-role peer that records the instant each arm request lands
    async fn spawn_fake_peer() -> (SocketAddr, ArmLog) {
        let log: ArmLog = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/start_record", post(peer_arm_record))
            .route("/capture_photo", post(peer_arm_photo))
            .route("/stop_record", post(peer_stop_record))
            .with_state(Arc::clone(&log));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, log)
    }

    /// Address nothing listens on: bind an ephemeral port, then drop it
    fn dead_peer_addr() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    fn coordinator_with_mock(
        peer_addr: SocketAddr,
        tag: &str,
    ) -> (SyncCoordinator, Arc<CameraSession>, MockHook) {
        let (device, hook) = CaptureDevice::mock();
        let dir = std::env::temp_dir().join(format!(
            "sync-coordinator-test-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let store = RecordingStore::new(dir).unwrap();
        let session = Arc::new(CameraSession::new(device, SyncRole::Server, store));
        let coordinator = SyncCoordinator::new(
            Arc::clone(&session),
            PeerClient::new(&peer_addr.to_string()),
        );
        (coordinator, session, hook)
    }

    #[tokio::test]
    async fn test_peer_arm_completes_before_local_pulse() {
        let (peer_addr, arm_log) = spawn_fake_peer().await;
        let (coordinator, session, hook) = coordinator_with_mock(peer_addr, "ordering");

        let outcome = coordinator.start_synchronized_recording().await.unwrap();
        assert!(outcome.peer_warning.is_none());
        assert_eq!(
            outcome.peer_filename.as_deref(),
            Some("right_20260825_120000")
        );
        assert!(session.is_recording().await);

        let arm_instants = arm_log.lock().unwrap().clone();
        let pulses = hook.pulse_log();
        assert_eq!(arm_instants.len(), 1);
        assert_eq!(pulses.len(), 1);
        // Arm receipt strictly precedes pulse emission
        assert!(arm_instants[0] < pulses[0]);
    }

    #[tokio::test]
    async fn test_start_record_proceeds_with_warning_when_peer_down() {
        // Known edge case preserved from the field deployment: a dead peer
        // does not abort the start, the pair just records desynchronized.
        let (coordinator, session, _hook) =
            coordinator_with_mock(dead_peer_addr(), "peer-down-record");

        let outcome = coordinator.start_synchronized_recording().await.unwrap();
        assert!(outcome.peer_warning.is_some());
        assert!(outcome.peer_filename.is_none());
        assert!(session.is_recording().await);
    }

    #[tokio::test]
    async fn test_start_record_rejected_while_recording() {
        let (peer_addr, _arm_log) = spawn_fake_peer().await;
        let (coordinator, _session, _hook) = coordinator_with_mock(peer_addr, "already");

        coordinator.start_synchronized_recording().await.unwrap();
        let err = coordinator.start_synchronized_recording().await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Session(SessionError::AlreadyRecording)
        ));
    }

    #[tokio::test]
    async fn test_capture_still_aborts_when_peer_down() {
        let (coordinator, session, _hook) =
            coordinator_with_mock(dead_peer_addr(), "peer-down-photo");
        session.restart_preview().await.unwrap();

        let err = coordinator.capture_synchronized_still().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::PeerUnreachable(_)));
        // No local capture was attempted; the preview is untouched
        assert!(!session.is_recording().await);
    }

    #[tokio::test]
    async fn test_capture_still_arm_then_local_capture() {
        let (peer_addr, arm_log) = spawn_fake_peer().await;
        let (coordinator, session, _hook) = coordinator_with_mock(peer_addr, "photo-ok");
        session.restart_preview().await.unwrap();

        let filename = coordinator.capture_synchronized_still().await.unwrap();
        assert!(filename.starts_with("left_photo_"));
        assert!(filename.ends_with(".jpg"));
        assert_eq!(arm_log.lock().unwrap().len(), 1);
        assert!(session.store().resolve(&filename).is_ok());
    }

    #[tokio::test]
    async fn test_capture_still_blocked_while_recording() {
        let (peer_addr, arm_log) = spawn_fake_peer().await;
        let (coordinator, _session, _hook) = coordinator_with_mock(peer_addr, "photo-blocked");

        coordinator.start_synchronized_recording().await.unwrap();
        let err = coordinator.capture_synchronized_still().await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Session(SessionError::RecordingInProgress)
        ));
        // The photo arm was never sent
        assert_eq!(arm_log.lock().unwrap().len(), 1); // only the record arm
    }

    #[tokio::test]
    async fn test_stop_record_never_blocked_by_peer() {
        let (coordinator, session, _hook) =
            coordinator_with_mock(dead_peer_addr(), "peer-down-stop");

        // Not recording and peer dead: still completes, warning only
        let outcome = coordinator.stop_synchronized_recording().await;
        assert!(outcome.peer_warning.is_some());
        assert!(!session.is_recording().await);
    }

    #[tokio::test]
    async fn test_stop_record_stops_locally_then_notifies() {
        let (peer_addr, _arm_log) = spawn_fake_peer().await;
        let (coordinator, session, _hook) = coordinator_with_mock(peer_addr, "stop-ok");

        coordinator.start_synchronized_recording().await.unwrap();
        assert!(session.is_recording().await);

        let outcome = coordinator.stop_synchronized_recording().await;
        assert!(outcome.peer_warning.is_none());
        assert!(!session.is_recording().await);
    }

    #[tokio::test]
    async fn test_control_forwarding_failure_is_swallowed() {
        let (coordinator, _session, _hook) =
            coordinator_with_mock(dead_peer_addr(), "forward");
        // Must not error or hang past the forwarding timeout
        coordinator
            .forward_controls(&ControlUpdate {
                exposure: Some(5000),
                ..Default::default()
            })
            .await;
        coordinator.forward_resolution(1280, 720).await;
    }
}
