//! Capture Session Controller
//!
//! Owns one capture device and one frame relay per node and enforces the
//! session state machine: Previewing, Reconfiguring, Recording, Capturing.
//! Every hardware-touching operation funnels through a single mutex; any
//! reconfiguration fully quiesces the hardware first, and every failure path
//! ends in a best-effort return to the preview state.

mod session;

pub use session::{CameraSession, SessionState};

use capture_device::CaptureError;
use thiserror::Error;

/// Errors surfaced by session controller operations.
///
/// Display strings double as the human-readable reasons returned to the
/// control surface.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A recording session is already active; start rejected
    #[error("Already recording")]
    AlreadyRecording,

    /// Stop requested with no active recording session
    #[error("Not recording")]
    NotRecording,

    /// Operation blocked while a recording encoder is active
    #[error("Recording in progress")]
    RecordingInProgress,

    /// Hardware rejected the configuration
    #[error("Failed to configure capture device: {0}")]
    Configure(CaptureError),

    /// Encoder pipeline could not be attached
    #[error("Failed to attach encoder: {0}")]
    Encoder(CaptureError),

    /// Hardware failed to start, including sync-pulse timeout
    #[error("Failed to start capture device: {0}")]
    Start(CaptureError),

    /// One-shot still capture failed
    #[error("Still capture failed: {0}")]
    Still(CaptureError),

    /// Live control update rejected
    #[error("{0}")]
    Controls(CaptureError),

    /// Caller supplied an out-of-range value
    #[error("{0}")]
    InvalidControl(String),

    /// Recording storage failure
    #[error("Storage error: {0}")]
    Io(String),
}
