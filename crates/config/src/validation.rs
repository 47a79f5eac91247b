//! Configuration validation
//!
//! Checks wiring consistency before anything is started:
//! - receiver and forwarder names are unique
//! - every enabled receiver has its server section
//! - every event type an enabled receiver emits has exactly one forwarder
//! - sync event types are not served by forwarders that cannot answer
//! - durations and capacities are usable

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use satellite_protocol::EventType;

use crate::error::{ConfigError, Result};
use crate::pipeline::MAX_RETRY_BACKOFF;
use crate::Config;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_pipeline(config)?;
    validate_servers(config)?;
    validate_receivers(config)?;
    validate_forwarders(config)?;
    validate_wiring(config)?;
    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<()> {
    let pipeline = &config.pipeline;
    if pipeline.buffer_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "pipeline",
            "buffer_capacity",
            "must be greater than 0",
        ));
    }
    if pipeline.flush_period == Duration::ZERO {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "pipeline",
            "flush_period",
            "must be greater than 0",
        ));
    }
    if pipeline.retry_backoff > MAX_RETRY_BACKOFF {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "pipeline",
            "retry_backoff",
            format!("must be at most {}s", MAX_RETRY_BACKOFF.as_secs()),
        ));
    }
    Ok(())
}

fn validate_servers(config: &Config) -> Result<()> {
    if let Some(ref grpc) = config.server.grpc {
        grpc.socket_addr()?;
        if grpc.max_message_size == 0 {
            return Err(ConfigError::invalid_value(
                "server",
                "grpc",
                "max_message_size",
                "must be greater than 0",
            ));
        }
    }
    if let Some(ref http) = config.server.http {
        http.socket_addr()?;
        if !http.uri.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "server",
                "http",
                "uri",
                "must start with '/'",
            ));
        }
        if http.timeout == 0 {
            return Err(ConfigError::invalid_value(
                "server",
                "http",
                "timeout",
                "must be at least 1 second",
            ));
        }
    }
    Ok(())
}

fn validate_receivers(config: &Config) -> Result<()> {
    let mut names = HashSet::new();
    for receiver in &config.receivers {
        if !names.insert(receiver.name.as_str()) {
            return Err(ConfigError::duplicate_name("receiver", &receiver.name));
        }
        if !receiver.enabled {
            continue;
        }

        let server = receiver.kind.server();
        if !config.server.has(server) {
            return Err(ConfigError::missing_server(&receiver.name, server.as_str()));
        }

        if receiver.kind.edge_batches() {
            if receiver.batch_limit_count == 0 {
                return Err(ConfigError::invalid_value(
                    "receiver",
                    &receiver.name,
                    "batch_limit_count",
                    "must be greater than 0",
                ));
            }
            if receiver.batch_flush_period == Duration::ZERO {
                return Err(ConfigError::invalid_value(
                    "receiver",
                    &receiver.name,
                    "batch_flush_period",
                    "must be greater than 0",
                ));
            }
        }

        if receiver.max_list_items == 0 {
            return Err(ConfigError::invalid_value(
                "receiver",
                &receiver.name,
                "max_list_items",
                "must be greater than 0",
            ));
        }
    }
    Ok(())
}

fn validate_forwarders(config: &Config) -> Result<()> {
    let mut names = HashSet::new();
    let mut by_type: HashMap<EventType, &str> = HashMap::new();

    for forwarder in &config.forwarders {
        if !names.insert(forwarder.name.as_str()) {
            return Err(ConfigError::duplicate_name("forwarder", &forwarder.name));
        }
        if !forwarder.enabled {
            continue;
        }
        if let Some(first) = by_type.insert(forwarder.event_type, &forwarder.name) {
            return Err(ConfigError::duplicate_forwarder(
                forwarder.event_type,
                first,
                &forwarder.name,
            ));
        }
        if forwarder.event_type.is_sync() && !forwarder.kind.supports_sync() {
            return Err(ConfigError::invalid_value(
                "forwarder",
                &forwarder.name,
                "kind",
                format!(
                    "'{}' cannot answer synchronous '{}' calls",
                    forwarder.kind, forwarder.event_type
                ),
            ));
        }
    }
    Ok(())
}

fn validate_wiring(config: &Config) -> Result<()> {
    let served: HashSet<EventType> = config
        .enabled_forwarders()
        .map(|forwarder| forwarder.event_type)
        .collect();

    for receiver in config.enabled_receivers() {
        for event_type in receiver.kind.event_types() {
            if !served.contains(event_type) {
                return Err(ConfigError::no_forwarder(&receiver.name, *event_type));
            }
        }
    }
    Ok(())
}
