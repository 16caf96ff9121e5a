//! Cross-Node Synchronization Coordinator
//!
//! Runs on the Server-role node only. Every handshake has the same shape:
//! arm the peer (Client role) first, then perform the local Server-role
//! operation whose `start()` fires the hardware pulse. The peer arm must
//! complete — success or timeout — strictly before the local pulse; that
//! ordering is the central correctness property of the whole rig.
//!
//! Failure policy is explicit per call site: control forwarding and stop
//! notifications are best-effort and never block the local operation;
//! the capture-still arm is fatal; the record arm is tolerated with a
//! warning (see the coordinator docs for the accepted desync risk).

mod coordinator;
mod peer;

pub use coordinator::{RecordStartOutcome, RecordStopOutcome, SyncCoordinator, PHOTO_ARM_DELAY};
pub use peer::{PeerClient, PeerResponse};

use camera_session::SessionError;
use thiserror::Error;

/// Errors surfaced by coordinator handshakes
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The peer could not be reached or answered garbage within the
    /// handshake timeout. Fatal for capture-still, tolerated elsewhere.
    #[error("Peer node failed: {0}")]
    PeerUnreachable(String),

    /// The local session controller rejected the operation
    #[error("{0}")]
    Session(#[from] SessionError),
}
