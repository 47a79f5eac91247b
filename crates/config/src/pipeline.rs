//! Pipeline settings
//!
//! Applied to every forwarder lane: each lane gets its own buffer of
//! `buffer_capacity` envelopes and its own limiter.

use std::time::Duration;

use serde::Deserialize;

/// What happens to a batch the forwarder failed to deliver
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Log and discard
    #[default]
    Drop,
    /// Retry once after `retry_backoff`, then discard
    RetryOnce,
}

/// `[pipeline]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Envelopes held per lane before appends overflow
    pub buffer_capacity: usize,

    /// Time trigger
    #[serde(with = "humantime_serde")]
    pub flush_period: Duration,

    /// Size trigger, 0 disables it
    pub limit_count: usize,

    pub fallback: FallbackStrategy,

    /// Pause before the single retry
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
}

/// Longest accepted `retry_backoff`
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 5000,
            flush_period: Duration::from_secs(1),
            limit_count: 500,
            fallback: FallbackStrategy::Drop,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config.buffer_capacity, 5000);
        assert_eq!(config.flush_period, Duration::from_secs(1));
        assert_eq!(config.limit_count, 500);
        assert_eq!(config.fallback, FallbackStrategy::Drop);
    }

    #[test]
    fn test_retry_once() {
        let toml = r#"
fallback = "retry_once"
retry_backoff = "2s"
limit_count = 0
"#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.fallback, FallbackStrategy::RetryOnce);
        assert_eq!(config.retry_backoff, Duration::from_secs(2));
        assert_eq!(config.limit_count, 0);
    }

    #[test]
    fn test_unknown_fallback_rejected() {
        assert!(toml::from_str::<PipelineConfig>("fallback = \"spool\"").is_err());
    }
}
