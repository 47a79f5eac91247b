//! Satellite Configuration
//!
//! TOML-based configuration with defaults for everything but the wiring:
//! which receivers run and which forwarder carries each event type.
//!
//! ```
//! use satellite_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(r#"
//! [server.grpc]
//! address = ":11800"
//!
//! [[receivers]]
//! name = "native-tracing"
//! kind = "grpc_native_tracing"
//!
//! [[forwarders]]
//! name = "native-tracing"
//! event_type = "segment"
//! "#).unwrap();
//! assert_eq!(config.enabled_receivers().count(), 1);
//! ```

mod error;
mod forwarders;
mod global;
mod logging;
mod metrics;
mod pipeline;
mod receivers;
mod server;
mod upstream;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use forwarders::{ForwarderConfig, ForwarderKind};
pub use global::GlobalConfig;
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use pipeline::{FallbackStrategy, MAX_RETRY_BACKOFF, PipelineConfig};
pub use receivers::{ReceiverConfig, ReceiverKind};
pub use server::{GrpcServerConfig, HttpServerConfig, ServerConfig, ServerKind, parse_address};
pub use upstream::UpstreamConfig;

/// Main configuration structure
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub global: GlobalConfig,
    pub log: LogConfig,
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub pipeline: PipelineConfig,
    pub receivers: Vec<ReceiverConfig>,
    pub forwarders: Vec<ForwarderConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check wiring and values; `from_file` and `from_str` already call this
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    pub fn enabled_receivers(&self) -> impl Iterator<Item = &ReceiverConfig> {
        self.receivers.iter().filter(|r| r.enabled)
    }

    pub fn enabled_forwarders(&self) -> impl Iterator<Item = &ForwarderConfig> {
        self.forwarders.iter().filter(|f| f.enabled)
    }

    /// Whether any enabled receiver needs the server of this kind
    pub fn needs_server(&self, kind: ServerKind) -> bool {
        self.enabled_receivers().any(|r| r.kind.server() == kind)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use satellite_protocol::EventType;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert!(config.receivers.is_empty());
        assert!(config.server.grpc.is_none());
        assert_eq!(config.pipeline.buffer_capacity, 5000);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[global]
shutdown_timeout = "5s"

[log]
level = "debug"
format = "json"

[metrics]
interval = "10s"

[server.grpc]
address = "127.0.0.1:11800"

[server.http]
address = ":12800"
uri = "/v3/logs"
timeout = 3

[upstream]
address = "oap:11800"
request_timeout = "10s"

[pipeline]
buffer_capacity = 1000
flush_period = "500ms"
limit_count = 100
fallback = "retry_once"

[[receivers]]
name = "tracing"
kind = "grpc_native_tracing"

[[receivers]]
name = "http-log"
kind = "http_native_log"

[[receivers]]
name = "cds"
kind = "grpc_native_cds"

[[forwarders]]
name = "segments"
event_type = "segment"

[[forwarders]]
name = "logs"
kind = "null"
event_type = "log"

[[forwarders]]
name = "cds"
event_type = "configuration_sync"
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.global.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.metrics.interval, Duration::from_secs(10));
        assert_eq!(config.server.http.as_ref().unwrap().uri, "/v3/logs");
        assert_eq!(config.upstream.address, "oap:11800");
        assert_eq!(config.pipeline.fallback, FallbackStrategy::RetryOnce);
        assert_eq!(config.enabled_receivers().count(), 3);
        assert!(config.needs_server(ServerKind::Http));
        assert_eq!(config.forwarders[1].kind, ForwarderKind::Null);
        assert_eq!(config.forwarders[2].event_type, EventType::ConfigurationSync);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("invalid { toml").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\nlimit_count = 7").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.pipeline.limit_count, 7);
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/nonexistent/satellite.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/satellite.toml"));
    }
}
