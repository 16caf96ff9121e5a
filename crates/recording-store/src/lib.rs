//! Recording Store
//!
//! Manages the node's fixed recordings directory. Recordings are written as
//! a video elementary stream plus a parallel per-frame timestamp sidecar
//! sharing the base name; stills are single JPEG files. Names encode node
//! role, capture type and a timestamp so the two nodes' outputs stay
//! distinguishable and sortable.

mod store;

pub use store::{photo_file_name, video_base_name, RecordingStore};

use thiserror::Error;

/// Errors from recording file management
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested recording does not exist
    #[error("Recording not found: {0}")]
    NotFound(String),

    /// Name contains path separators or other disallowed components
    #[error("Invalid recording name: {0}")]
    InvalidName(String),

    /// Underlying filesystem failure
    #[error("Storage I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
