//! Global settings

use std::time::Duration;

use serde::Deserialize;

/// Settings that apply to the whole process
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Runtime worker threads; `None` uses one per CPU core
    pub worker_threads: Option<usize>,

    /// How long shutdown waits for servers and final flushes
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.worker_threads, None);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config: GlobalConfig =
            toml::from_str("worker_threads = 2\nshutdown_timeout = \"3s\"").unwrap();
        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    }
}
