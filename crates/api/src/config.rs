//! Node configuration

use capture_device::SyncRole;
use serde::{Deserialize, Serialize};

/// Configuration for one camera node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StereoNodeConfig {
    /// Hardware synchronization role (the Server node runs the coordinator)
    pub role: SyncRole,
    /// Address the control surface listens on
    pub listen_addr: String,
    /// Peer node's control surface address (used by the Server node only)
    pub peer_addr: String,
    /// Directory for recordings and stills
    pub recordings_dir: String,
}

impl Default for StereoNodeConfig {
    fn default() -> Self {
        Self {
            role: SyncRole::Server,
            listen_addr: "0.0.0.0:5000".to_string(),
            peer_addr: "192.168.1.102:5000".to_string(),
            recordings_dir: "recordings".to_string(),
        }
    }
}

impl StereoNodeConfig {
    /// Load configuration from `stereo-node.{toml,yaml,json}` if present,
    /// with `STEREO_*` environment variables taking precedence.
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("role", "server")?
            .set_default("listen_addr", defaults.listen_addr)?
            .set_default("peer_addr", defaults.peer_addr)?
            .set_default("recordings_dir", defaults.recordings_dir)?
            .add_source(config::File::with_name("stereo-node").required(false))
            .add_source(config::Environment::with_prefix("STEREO"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = StereoNodeConfig::default();
        assert_eq!(cfg.role, SyncRole::Server);
        assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
        assert_eq!(cfg.recordings_dir, "recordings");
    }

    #[test]
    fn test_load_uses_defaults_without_sources() {
        let cfg = StereoNodeConfig::load().unwrap();
        assert_eq!(cfg.role, SyncRole::Server);
        assert_eq!(cfg.peer_addr, "192.168.1.102:5000");
    }
}
