//! HTTP client for the peer node's control surface

use crate::CoordinatorError;
use capture_device::ControlUpdate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Generous: the peer must fully quiesce and reconfigure its hardware
/// before it can answer the record arm request.
const ARM_RECORD_TIMEOUT: Duration = Duration::from_secs(5);

/// Short: arming a still is a cheap state check plus a spawned task.
const ARM_PHOTO_TIMEOUT: Duration = Duration::from_secs(2);

/// Short: stopping must never hang on the network.
const STOP_RECORD_TIMEOUT: Duration = Duration::from_secs(2);

/// Shortest: control forwarding is best-effort by policy.
const FORWARD_TIMEOUT: Duration = Duration::from_secs(1);

/// Structured response from the peer's control surface
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Serialize)]
struct ResolutionPayload {
    width: u32,
    height: u32,
}

/// Typed client for the peer node, one timeout per call kind.
///
/// Holds no peer state beyond the network address.
#[derive(Clone)]
pub struct PeerClient {
    http: reqwest::Client,
    base_url: String,
}

impl PeerClient {
    /// Client for the peer at `host:port`
    pub fn new(peer_addr: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{peer_addr}"),
        }
    }

    /// Address this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Arm the peer for a synchronized recording; it will configure itself
    /// in Client role and block waiting for our pulse.
    pub async fn arm_record(&self) -> Result<PeerResponse, CoordinatorError> {
        self.post_empty("/start_record", ARM_RECORD_TIMEOUT).await
    }

    /// Tell the peer to stop recording and restore its preview
    pub async fn stop_record(&self) -> Result<PeerResponse, CoordinatorError> {
        self.post_empty("/stop_record", STOP_RECORD_TIMEOUT).await
    }

    /// Arm the peer for a synchronized still; the peer captures in the
    /// background upon this notification.
    pub async fn arm_photo(&self) -> Result<PeerResponse, CoordinatorError> {
        self.post_empty("/capture_photo", ARM_PHOTO_TIMEOUT).await
    }

    /// Forward a control update so both sensors stay matched
    pub async fn forward_controls(
        &self,
        update: &ControlUpdate,
    ) -> Result<PeerResponse, CoordinatorError> {
        self.post_json("/set_controls", update, FORWARD_TIMEOUT).await
    }

    /// Forward a resolution change
    pub async fn forward_resolution(
        &self,
        width: u32,
        height: u32,
    ) -> Result<PeerResponse, CoordinatorError> {
        self.post_json(
            "/set_resolution",
            &ResolutionPayload { width, height },
            FORWARD_TIMEOUT,
        )
        .await
    }

    async fn post_empty(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<PeerResponse, CoordinatorError> {
        debug!(path, "Peer call");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| CoordinatorError::PeerUnreachable(e.to_string()))?;
        parse(response).await
    }

    async fn post_json<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
        timeout: Duration,
    ) -> Result<PeerResponse, CoordinatorError> {
        debug!(path, "Peer call");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| CoordinatorError::PeerUnreachable(e.to_string()))?;
        parse(response).await
    }
}

async fn parse(response: reqwest::Response) -> Result<PeerResponse, CoordinatorError> {
    if !response.status().is_success() {
        return Err(CoordinatorError::PeerUnreachable(format!(
            "peer returned HTTP {}",
            response.status()
        )));
    }
    response
        .json()
        .await
        .map_err(|e| CoordinatorError::PeerUnreachable(format!("invalid peer response: {e}")))
}
