//! Frame Relay Implementation

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;

/// Broadcast-notify single-slot frame cell.
///
/// One physical buffer shared by arbitrarily many concurrent consumers.
/// Built on a versioned watch channel: publishing overwrites the slot and
/// wakes every waiting consumer; a consumer that misses intermediate
/// versions simply reads the newest one on its next wake.
#[derive(Clone)]
pub struct FrameRelay {
    tx: Arc<watch::Sender<Option<Bytes>>>,
}

impl FrameRelay {
    /// Create an empty relay (no frame published yet)
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Overwrite the slot with a new frame and wake all waiting consumers
    pub fn publish(&self, frame: Bytes) {
        // send_replace never fails, even with zero receivers
        self.tx.send_replace(Some(frame));
    }

    /// Open an independent consumer session
    pub fn subscribe(&self) -> FrameStream {
        FrameStream {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of currently attached consumers
    pub fn consumer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FrameRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-consumer read handle.
///
/// Each consumer blocks independently until woken and then reads the current
/// slot contents. Dropping the handle is the cancellation path; it never
/// disturbs the producer or other consumers.
pub struct FrameStream {
    rx: watch::Receiver<Option<Bytes>>,
}

impl FrameStream {
    /// Wait for the next published frame.
    ///
    /// Returns `None` once every producer handle has been dropped. A read
    /// never yields the same slot version twice and is never empty once the
    /// first frame has arrived.
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }

    /// Read the current slot without waiting, if a frame has ever arrived.
    ///
    /// The read counts as seen: a following `next_frame` waits for a newer
    /// frame rather than re-delivering this one.
    pub fn latest(&mut self) -> Option<Bytes> {
        self.rx.borrow_and_update().clone()
    }
}
