//! Single-Slot Frame Relay
//!
//! Hands the newest compressed preview frame from the capture pipeline to
//! any number of waiting stream consumers. Latest-wins: the slot is
//! overwritten on every frame, there is no queueing and no backpressure.
//! Slow consumers observe a strict subsequence of the produced frames.

mod relay;

pub use relay::{FrameRelay, FrameStream};
