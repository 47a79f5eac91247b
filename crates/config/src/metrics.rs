//! Metrics reporting configuration
//!
//! Enabled by default: a minimal config logs one snapshot of every
//! component per minute.

use std::time::Duration;

use serde::Deserialize;

/// Metrics output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// Human-readable lines
    #[default]
    Human,
    /// One JSON document per report
    Json,
}

/// Metrics configuration
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "30s"
/// format = "json"
/// include_receivers = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,

    /// Reporting interval
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    pub format: MetricsFormat,

    /// Envelopes routed, buffered, flushed and dropped
    pub include_pipeline: bool,

    /// Connections and calls on the RPC and HTTP servers
    pub include_servers: bool,

    /// Streams, frames and decode errors per receiver
    pub include_receivers: bool,

    /// Batches and sync calls per forwarder
    pub include_forwarders: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            format: MetricsFormat::Human,
            include_pipeline: true,
            include_servers: true,
            include_receivers: true,
            include_forwarders: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty() {
        let config: MetricsConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.format, MetricsFormat::Human);
        assert!(config.include_pipeline);
        assert!(config.include_forwarders);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
interval = "250ms"
format = "json"
include_servers = false
include_receivers = false
"#;
        let config: MetricsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.format, MetricsFormat::Json);
        assert!(!config.include_servers);
        assert!(!config.include_receivers);
        assert!(config.include_pipeline);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        assert!(toml::from_str::<MetricsConfig>("interval = \"soon\"").is_err());
    }
}
