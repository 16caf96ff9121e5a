//! Session controller implementation

use crate::SessionError;
use capture_device::{
    CaptureDevice, ControlUpdate, ControlValues, EncoderConfig, EncoderId, EncoderKind,
    EncoderSink, Resolution, SyncRole,
};
use frame_relay::{FrameRelay, FrameStream};
use recording_store::RecordingStore;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Session state machine positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Default: device started, preview encoder feeding the relay
    Previewing,
    /// Transient: hardware quiesced mid-transition
    Reconfiguring,
    /// Recording encoder active alongside the preview encoder
    Recording,
    /// Transient: one-shot still in flight
    Capturing,
}

struct RecordingHandle {
    base_name: String,
    encoder: EncoderId,
}

struct Inner {
    device: CaptureDevice,
    controls: ControlValues,
    resolution: Resolution,
    state: SessionState,
    recording: Option<RecordingHandle>,
    preview_encoder: Option<EncoderId>,
}

/// Per-node capture session controller.
///
/// All hardware-touching operations execute with mutual exclusion against
/// each other; concurrent invocation mid-transition is undefined by the
/// hardware contract, so everything funnels through one async mutex.
pub struct CameraSession {
    role: SyncRole,
    relay: FrameRelay,
    store: RecordingStore,
    inner: Mutex<Inner>,
}

impl CameraSession {
    /// Create a session controller owning the given device.
    ///
    /// The caller starts the preview with [`CameraSession::restart_preview`]
    /// once the surrounding services are wired up.
    pub fn new(device: CaptureDevice, role: SyncRole, store: RecordingStore) -> Self {
        Self {
            role,
            relay: FrameRelay::new(),
            store,
            inner: Mutex::new(Inner {
                device,
                controls: ControlValues::new(role),
                resolution: Resolution::MAIN_DEFAULT,
                state: SessionState::Reconfiguring,
                recording: None,
                preview_encoder: None,
            }),
        }
    }

    /// This node's hardware synchronization role
    pub fn role(&self) -> SyncRole {
        self.role
    }

    /// Recording store backing this session
    pub fn store(&self) -> &RecordingStore {
        &self.store
    }

    /// Open an independent live-frame consumer session.
    ///
    /// Does not take the session lock; streaming continues across
    /// reconfigurations and simply stalls until frames resume.
    pub fn frame_stream(&self) -> FrameStream {
        self.relay.subscribe()
    }

    /// Universal safe reset: stop everything, reconfigure with the current
    /// resolution and controls, and return to Previewing.
    pub async fn restart_preview(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        self.restart_preview_locked(&mut inner).await
    }

    async fn restart_preview_locked(&self, inner: &mut Inner) -> Result<(), SessionError> {
        self.stop_camera_locked(inner);
        inner.state = SessionState::Reconfiguring;

        // Sync role is derived; force it right before any hardware start
        inner.controls.sync_role = self.role;
        inner
            .device
            .configure(inner.resolution, Resolution::LORES, &inner.controls)
            .await
            .map_err(SessionError::Configure)?;

        let preview = inner
            .device
            .start_encoder(EncoderConfig {
                kind: EncoderKind::Preview,
                sink: EncoderSink::Relay(self.relay.clone()),
                wait_for_pulse: false,
            })
            .map_err(SessionError::Encoder)?;
        inner.preview_encoder = Some(preview);

        if let Err(e) = inner.device.start().await {
            inner.device.stop_encoder(preview);
            inner.preview_encoder = None;
            return Err(SessionError::Start(e));
        }

        inner.state = SessionState::Previewing;
        info!(role = ?self.role, "Preview started");
        Ok(())
    }

    /// Arm and start a synchronized recording session.
    ///
    /// The critical ordering: full stop, configure (fixed frame rate, forced
    /// sync role), attach recording and preview encoders, then `start()` —
    /// the exact instant the hardware pulse is emitted (Server) or awaited
    /// (Client). The session is Recording only after `start()` returns; on
    /// any earlier failure no encoders are left attached.
    pub async fn prepare_and_start_recording(&self, base_name: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;
        if inner.recording.is_some() {
            return Err(SessionError::AlreadyRecording);
        }

        self.stop_camera_locked(inner);
        inner.state = SessionState::Reconfiguring;

        inner.controls.sync_role = self.role;
        inner
            .device
            .configure(inner.resolution, Resolution::LORES, &inner.controls)
            .await
            .map_err(SessionError::Configure)?;

        let recording = inner
            .device
            .start_encoder(EncoderConfig {
                kind: EncoderKind::Recording,
                sink: EncoderSink::File {
                    video: self.store.video_path(base_name),
                    timestamps: self.store.timestamps_path(base_name),
                },
                wait_for_pulse: self.role == SyncRole::Client,
            })
            .map_err(SessionError::Encoder)?;

        let preview = match inner.device.start_encoder(EncoderConfig {
            kind: EncoderKind::Preview,
            sink: EncoderSink::Relay(self.relay.clone()),
            wait_for_pulse: false,
        }) {
            Ok(id) => id,
            Err(e) => {
                inner.device.stop_encoder(recording);
                return Err(SessionError::Encoder(e));
            }
        };
        inner.preview_encoder = Some(preview);

        if let Err(e) = inner.device.start().await {
            inner.device.stop_encoder(recording);
            inner.device.stop_encoder(preview);
            inner.preview_encoder = None;
            return Err(SessionError::Start(e));
        }

        inner.recording = Some(RecordingHandle {
            base_name: base_name.to_string(),
            encoder: recording,
        });
        inner.state = SessionState::Recording;
        info!(base_name, role = ?self.role, "Recording started");
        Ok(())
    }

    /// Safely quiesce the hardware: detach the recording encoder if present,
    /// best-effort detach the preview encoder, stop the device if started.
    /// Never raises on the nothing-to-stop case.
    pub async fn stop_camera(&self) {
        let mut inner = self.inner.lock().await;
        self.stop_camera_locked(&mut inner);
    }

    fn stop_camera_locked(&self, inner: &mut Inner) {
        if let Some(rec) = inner.recording.take() {
            inner.device.stop_encoder(rec.encoder);
            info!(base_name = rec.base_name, "Recording encoder detached");
        }
        if let Some(preview) = inner.preview_encoder.take() {
            inner.device.stop_encoder(preview);
        }
        inner.device.stop();
        inner.state = SessionState::Reconfiguring;
    }

    /// Stop an active recording session and restore the preview
    pub async fn stop_recording(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.recording.is_none() {
            return Err(SessionError::NotRecording);
        }
        self.stop_camera_locked(&mut inner);
        self.restart_preview_locked(&mut inner).await
    }

    /// Synchronized one-shot still capture.
    ///
    /// Sequence: stop, configure, start (pulse emit/await happens here),
    /// capture, write to the store, restore preview. If anything fails after
    /// the stop, the controller attempts a preview restart before surfacing
    /// the original error — the node must never be left stopped as a side
    /// effect of a failed capture.
    pub async fn capture_single_image(&self, file_name: &str) -> Result<PathBuf, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.recording.is_some() {
            return Err(SessionError::RecordingInProgress);
        }
        inner.state = SessionState::Capturing;

        match self.capture_locked(&mut inner, file_name).await {
            Ok(path) => {
                self.restart_preview_locked(&mut inner).await?;
                Ok(path)
            }
            Err(e) => {
                error!(file_name, error = %e, "Still capture failed, recovering preview");
                if let Err(recover) = self.restart_preview_locked(&mut inner).await {
                    error!(error = %recover, "Preview recovery after failed capture also failed");
                }
                Err(e)
            }
        }
    }

    async fn capture_locked(
        &self,
        inner: &mut Inner,
        file_name: &str,
    ) -> Result<PathBuf, SessionError> {
        self.stop_camera_locked(inner);

        inner.controls.sync_role = self.role;
        inner
            .device
            .configure(inner.resolution, Resolution::LORES, &inner.controls)
            .await
            .map_err(SessionError::Configure)?;
        inner.device.start().await.map_err(SessionError::Start)?;

        let jpeg = inner
            .device
            .capture_still()
            .await
            .map_err(SessionError::Still)?;
        self.store
            .write_photo(file_name, &jpeg)
            .map_err(|e| SessionError::Io(e.to_string()))
    }

    /// Merge a partial control update and push the merged set live.
    ///
    /// Does not stop or reconfigure the device; resolution and sync role
    /// changes only take effect at the next configure. A hardware rejection
    /// surfaces without altering the session state.
    pub async fn apply_controls(&self, update: &ControlUpdate) -> Result<(), SessionError> {
        update
            .validate()
            .map_err(|e| SessionError::InvalidControl(e.to_string()))?;

        let mut inner = self.inner.lock().await;
        inner.controls.merge(update);
        let merged = inner.controls.clone();
        inner
            .device
            .set_controls(&merged)
            .map_err(SessionError::Controls)
    }

    /// Change the main-stream resolution and restart the preview to apply it
    pub async fn set_resolution(&self, width: u32, height: u32) -> Result<(), SessionError> {
        if width == 0 || height == 0 {
            return Err(SessionError::InvalidControl(format!(
                "resolution must be non-zero, got {width}x{height}"
            )));
        }
        let mut inner = self.inner.lock().await;
        if inner.recording.is_some() {
            return Err(SessionError::RecordingInProgress);
        }
        inner.resolution = Resolution::new(width, height);
        info!(width, height, "Resolution updated, restarting preview");
        self.restart_preview_locked(&mut inner).await
    }

    /// Current state machine position
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Whether a recording session is active
    pub async fn is_recording(&self) -> bool {
        self.inner.lock().await.recording.is_some()
    }

    /// Base name of the active recording session, if any
    pub async fn recording_base_name(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .recording
            .as_ref()
            .map(|r| r.base_name.clone())
    }

    /// Snapshot of the node's merged control values
    pub async fn controls(&self) -> ControlValues {
        self.inner.lock().await.controls.clone()
    }

    /// Current main-stream resolution
    pub async fn resolution(&self) -> Resolution {
        self.inner.lock().await.resolution
    }
}
