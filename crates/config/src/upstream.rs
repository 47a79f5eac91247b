//! Upstream collector connection settings

use std::time::Duration;

use serde::Deserialize;

/// `[upstream]` section, shared by every RPC forwarder
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// `"HOST:PORT"` of the collector
    pub address: String,

    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Bound on one whole upstream call, from open to terminal status
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:11800".into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(20),
        }
    }
}
