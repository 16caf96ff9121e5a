//! Live preview stream

use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::convert::Infallible;

/// GET /video_feed - MJPEG multipart stream of the latest preview frames.
///
/// The stream never terminates on a transient hardware hiccup; it simply
/// stalls until frame production resumes. Closing the connection drops the
/// relay subscription, which is the consumer's cancellation path.
pub async fn video_feed(State(state): State<AppState>) -> Response {
    let mut frames = state.session.frame_stream();
    // Serve the frame already in the slot right away instead of making the
    // new consumer wait out a full frame interval
    let first = frames.latest();

    let body = Body::from_stream(futures::stream::unfold(
        (frames, first),
        |(mut frames, pending)| async move {
            let frame = match pending {
                Some(frame) => frame,
                None => frames.next_frame().await?,
            };
            let mut part = Vec::with_capacity(frame.len() + 64);
            part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
            part.extend_from_slice(&frame);
            part.extend_from_slice(b"\r\n");
            Some((Ok::<_, Infallible>(Bytes::from(part)), (frames, None)))
        },
    ));

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
