//! Capture Device Adapter
//!
//! Abstraction over the stereo rig's capture hardware. One node owns exactly
//! one device; configuration may only change while the device is stopped,
//! and `start()` is the instant the hardware synchronization pulse is
//! emitted (Server role) or awaited (Client role).

pub mod controls;
pub mod device;

pub use controls::{ControlUpdate, ControlValues};
pub use device::{CaptureDevice, EncoderConfig, EncoderId, EncoderSink, MockHook};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the capture hardware boundary
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Configuration attempted while the device is running
    #[error("Device is started; stop before reconfiguring")]
    Busy,

    /// Start attempted without a prior configure
    #[error("Device has no active configuration")]
    NotConfigured,

    /// Operation requires a started device
    #[error("Device is not started")]
    NotStarted,

    /// An encoder of the requested kind is already attached
    #[error("{0:?} encoder already attached")]
    EncoderActive(EncoderKind),

    /// Hardware rejected the configuration
    #[error("Configure failed: {0}")]
    ConfigureFailed(String),

    /// Hardware failed to start
    #[error("Start failed: {0}")]
    StartFailed(String),

    /// Client role timed out waiting for the synchronization pulse
    #[error("Timed out waiting for synchronization pulse")]
    SyncTimeout,

    /// One-shot still capture failed
    #[error("Still capture failed: {0}")]
    StillFailed(String),

    /// Live control update rejected by the hardware
    #[error("Control update rejected: {0}")]
    ControlRejected(String),

    /// Caller supplied an out-of-range control value
    #[error("Invalid control value: {0}")]
    InvalidControl(String),

    /// Encoder sink I/O failure
    #[error("Encoder sink error: {0}")]
    Sink(String),
}

/// Hardware synchronization role.
///
/// The Server node emits a pulse when its device starts; the Client node's
/// start blocks until it observes one. The session controller force-applies
/// this value right before every hardware start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncRole {
    Server,
    Client,
}

impl SyncRole {
    /// File-name label for this node's outputs ("left" for the Server node)
    pub fn label(&self) -> &'static str {
        match self {
            SyncRole::Server => "left",
            SyncRole::Client => "right",
        }
    }
}

/// Stream resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Default main-stream resolution
    pub const MAIN_DEFAULT: Resolution = Resolution::new(1920, 1080);

    /// Fixed low-resolution preview stream
    pub const LORES: Resolution = Resolution::new(640, 480);
}

/// Kind of compressed-output pipeline attached to a started device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    /// Continuous MJPEG on the lores stream, feeds the frame relay
    Preview,
    /// Continuous H264 on the main stream, feeds persistent storage
    Recording,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_labels() {
        assert_eq!(SyncRole::Server.label(), "left");
        assert_eq!(SyncRole::Client.label(), "right");
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&SyncRole::Server).unwrap(), "\"server\"");
        let role: SyncRole = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(role, SyncRole::Client);
    }
}
