//! Capture device adapter
//!
//! Concrete handle to the node's capture hardware. The hardware itself is an
//! external collaborator; the methods here document its contract and the
//! mock constructor stands in for it in tests, with fault-injection knobs
//! and a pulse log driven through a shared [`MockHook`].

use crate::controls::ControlValues;
use crate::{CaptureError, EncoderKind, Resolution, SyncRole};
use bytes::Bytes;
use frame_relay::FrameRelay;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Opaque handle to an attached encoder pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderId(u64);

/// Destination for an encoder's compressed output
#[derive(Clone)]
pub enum EncoderSink {
    /// Preview frames fan out through the relay
    Relay(FrameRelay),
    /// Recording: video elementary stream plus per-frame timestamp sidecar
    File { video: PathBuf, timestamps: PathBuf },
}

/// Request to attach an encoder pipeline
pub struct EncoderConfig {
    pub kind: EncoderKind,
    pub sink: EncoderSink,
    /// Client-role recordings hold their first frame until the hardware
    /// pulse arrives
    pub wait_for_pulse: bool,
}

struct Encoder {
    id: EncoderId,
    sink: EncoderSink,
    wait_for_pulse: bool,
}

struct ActiveConfig {
    main: Resolution,
    lores: Resolution,
    controls: ControlValues,
}

#[derive(Default)]
struct MockState {
    fail_next_configure: bool,
    fail_next_start: bool,
    fail_next_still: bool,
    fail_next_set_controls: bool,
    fail_sync_wait: bool,
    started: bool,
    pulses: Vec<Instant>,
    preview_sink: Option<FrameRelay>,
    recording_wait_for_pulse: Option<bool>,
}

/// Test-side handle into a mock device.
///
/// Lets tests inject the next hardware failure, feed preview frames into
/// whatever sink is currently attached, and inspect emitted sync pulses.
#[derive(Clone)]
pub struct MockHook {
    state: Arc<Mutex<MockState>>,
}

impl MockHook {
    /// Fail the next `configure()` call
    pub fn fail_next_configure(&self) {
        self.lock().fail_next_configure = true;
    }

    /// Fail the next `start()` call
    pub fn fail_next_start(&self) {
        self.lock().fail_next_start = true;
    }

    /// Fail the next `capture_still()` call
    pub fn fail_next_still(&self) {
        self.lock().fail_next_still = true;
    }

    /// Fail the next live `set_controls()` call
    pub fn fail_next_set_controls(&self) {
        self.lock().fail_next_set_controls = true;
    }

    /// Make Client-role starts time out waiting for the pulse
    pub fn fail_sync_wait(&self, fail: bool) {
        self.lock().fail_sync_wait = fail;
    }

    /// Push a preview frame the way running hardware would.
    ///
    /// Returns true if the device was started with a preview encoder
    /// attached and the frame was delivered to its sink.
    pub fn push_preview_frame(&self, frame: Bytes) -> bool {
        let state = self.lock();
        match (&state.preview_sink, state.started) {
            (Some(relay), true) => {
                relay.publish(frame);
                true
            }
            _ => false,
        }
    }

    /// Instants at which this device emitted a synchronization pulse
    pub fn pulse_log(&self) -> Vec<Instant> {
        self.lock().pulses.clone()
    }

    /// Pulse-wait flag of the attached recording encoder, if any
    pub fn recording_wait_for_pulse(&self) -> Option<bool> {
        self.lock().recording_wait_for_pulse
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // Poisoning only happens if a test panicked mid-access
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Exclusive handle to the node's capture hardware.
///
/// Invariants enforced here:
/// - configuration may only change while stopped
/// - at most one encoder of each kind is attached
/// - stills require a started device with no recording encoder
pub struct CaptureDevice {
    config: Option<ActiveConfig>,
    started: bool,
    preview: Option<Encoder>,
    recording: Option<Encoder>,
    next_encoder_id: u64,
    mock: Option<Arc<Mutex<MockState>>>,
}

impl CaptureDevice {
    /// Open the node's capture hardware
    pub fn new() -> Self {
        info!("Opening capture device");
        Self {
            config: None,
            started: false,
            preview: None,
            recording: None,
            next_encoder_id: 1,
            mock: None,
        }
    }

    /// Create a mock device for tests (no hardware required)
    pub fn mock() -> (Self, MockHook) {
        debug!("Creating mock capture device");
        let state = Arc::new(Mutex::new(MockState::default()));
        let hook = MockHook {
            state: Arc::clone(&state),
        };
        let device = Self {
            config: None,
            started: false,
            preview: None,
            recording: None,
            next_encoder_id: 1,
            mock: Some(state),
        };
        (device, hook)
    }

    /// Apply a full configuration. Fails with [`CaptureError::Busy`] if the
    /// device is started.
    pub async fn configure(
        &mut self,
        main: Resolution,
        lores: Resolution,
        controls: &ControlValues,
    ) -> Result<(), CaptureError> {
        if self.started {
            return Err(CaptureError::Busy);
        }

        if let Some(state) = &self.mock {
            let mut state = lock(state);
            if state.fail_next_configure {
                state.fail_next_configure = false;
                return Err(CaptureError::ConfigureFailed("injected failure".into()));
            }
        }

        // In real hardware this builds the video configuration for the main
        // and lores streams and pushes the control set to the ISP.
        debug!(
            width = main.width,
            height = main.height,
            role = ?controls.sync_role,
            "Configuring capture device"
        );

        self.config = Some(ActiveConfig {
            main,
            lores,
            controls: controls.clone(),
        });
        Ok(())
    }

    /// Start the device.
    ///
    /// Server role: the hardware emits the synchronization pulse at this
    /// instant. Client role: this call blocks until a pulse is observed,
    /// bounded by the hardware timeout; exceeding it is a fatal
    /// [`CaptureError::SyncTimeout`].
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        let config = self.config.as_ref().ok_or(CaptureError::NotConfigured)?;
        if self.started {
            return Err(CaptureError::Busy);
        }
        let role = config.controls.sync_role;

        if let Some(state) = &self.mock {
            let mut state = lock(state);
            if state.fail_next_start {
                state.fail_next_start = false;
                return Err(CaptureError::StartFailed("injected failure".into()));
            }
            if role == SyncRole::Client && state.fail_sync_wait {
                return Err(CaptureError::SyncTimeout);
            }
            if role == SyncRole::Server {
                state.pulses.push(Instant::now());
            }
            state.started = true;
        }

        // In real hardware the Client-role start blocks here until the pulse
        // arrives; it must run off the shared request dispatcher.
        match role {
            SyncRole::Server => debug!("Device started, sync pulse emitted"),
            SyncRole::Client => debug!("Device started after observing sync pulse"),
        }

        self.started = true;
        Ok(())
    }

    /// Stop the device. Idempotent: stopping an already-stopped device is a
    /// no-op, never an error. Attached encoders are not detached here.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        debug!("Stopping capture device");
        self.started = false;
        if let Some(state) = &self.mock {
            lock(state).started = false;
        }
    }

    /// Attach an encoder pipeline. Valid once configured; frames only flow
    /// while the device is started.
    pub fn start_encoder(&mut self, config: EncoderConfig) -> Result<EncoderId, CaptureError> {
        if self.config.is_none() {
            return Err(CaptureError::NotConfigured);
        }
        let slot = match config.kind {
            EncoderKind::Preview => &mut self.preview,
            EncoderKind::Recording => &mut self.recording,
        };
        if slot.is_some() {
            return Err(CaptureError::EncoderActive(config.kind));
        }

        if self.mock.is_none() {
            if let EncoderSink::File { video, timestamps } = &config.sink {
                std::fs::File::create(video).map_err(|e| CaptureError::Sink(e.to_string()))?;
                std::fs::File::create(timestamps)
                    .map_err(|e| CaptureError::Sink(e.to_string()))?;
            }
        }

        let id = EncoderId(self.next_encoder_id);
        self.next_encoder_id += 1;
        debug!(kind = ?config.kind, wait_for_pulse = config.wait_for_pulse, "Encoder attached");

        if let Some(state) = &self.mock {
            let mut state = lock(state);
            match (config.kind, &config.sink) {
                (EncoderKind::Preview, EncoderSink::Relay(relay)) => {
                    state.preview_sink = Some(relay.clone());
                }
                (EncoderKind::Recording, _) => {
                    state.recording_wait_for_pulse = Some(config.wait_for_pulse);
                }
                _ => {}
            }
        }

        *slot = Some(Encoder {
            id,
            sink: config.sink,
            wait_for_pulse: config.wait_for_pulse,
        });
        Ok(id)
    }

    /// Detach an encoder pipeline. Returns false if no encoder with that
    /// handle is attached.
    pub fn stop_encoder(&mut self, id: EncoderId) -> bool {
        for (kind, slot) in [
            (EncoderKind::Preview, &mut self.preview),
            (EncoderKind::Recording, &mut self.recording),
        ] {
            if slot.as_ref().map(|e| e.id) == Some(id) {
                *slot = None;
                debug!(kind = ?kind, "Encoder detached");
                if let Some(state) = &self.mock {
                    let mut state = lock(state);
                    match kind {
                        EncoderKind::Preview => state.preview_sink = None,
                        EncoderKind::Recording => state.recording_wait_for_pulse = None,
                    }
                }
                return true;
            }
        }
        false
    }

    /// One-shot high-resolution capture from the main stream.
    ///
    /// Only valid while started and with no recording encoder attached.
    pub async fn capture_still(&mut self) -> Result<Bytes, CaptureError> {
        if !self.started {
            return Err(CaptureError::NotStarted);
        }
        if self.recording.is_some() {
            return Err(CaptureError::EncoderActive(EncoderKind::Recording));
        }

        if let Some(state) = &self.mock {
            let mut state = lock(state);
            if state.fail_next_still {
                state.fail_next_still = false;
                return Err(CaptureError::StillFailed("injected failure".into()));
            }
        }

        // In real hardware this waits for the next synchronized request on
        // the main stream and JPEG-encodes it. The mock returns a minimal
        // JPEG byte pair so downstream file handling stays honest.
        debug!("Captured still frame");
        Ok(Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]))
    }

    /// Push the merged control set to the hardware without a stop/start.
    ///
    /// Resolution and sync role changes do not take effect here; they apply
    /// at the next `configure()`.
    pub fn set_controls(&mut self, controls: &ControlValues) -> Result<(), CaptureError> {
        if let Some(state) = &self.mock {
            let mut state = lock(state);
            if state.fail_next_set_controls {
                state.fail_next_set_controls = false;
                return Err(CaptureError::ControlRejected("injected failure".into()));
            }
        }

        if let Some(config) = &mut self.config {
            config.controls = controls.clone();
        } else {
            warn!("Control update before first configure; values apply at next configure");
        }
        debug!(frame_rate = controls.frame_rate, "Controls pushed to hardware");
        Ok(())
    }

    /// Whether the device is currently started
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether an encoder of the given kind is attached
    pub fn has_encoder(&self, kind: EncoderKind) -> bool {
        match kind {
            EncoderKind::Preview => self.preview.is_some(),
            EncoderKind::Recording => self.recording.is_some(),
        }
    }

    /// File sink of the attached recording encoder, if any
    pub fn recording_sink(&self) -> Option<(PathBuf, PathBuf)> {
        match self.recording.as_ref().map(|e| &e.sink) {
            Some(EncoderSink::File { video, timestamps }) => {
                Some((video.clone(), timestamps.clone()))
            }
            _ => None,
        }
    }

    /// Whether the attached recording encoder holds frames for the pulse
    pub fn recording_waits_for_pulse(&self) -> bool {
        self.recording.as_ref().is_some_and(|e| e.wait_for_pulse)
    }
}

impl Default for CaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(state: &Arc<Mutex<MockState>>) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}
