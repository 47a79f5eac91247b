//! Wiring report for `satellite check`

use std::collections::HashSet;
use std::fmt::Write;

use anyhow::{Context, Result};
use satellite_config::Config;
use satellite_forwarders::ForwarderPlugin;
use satellite_protocol::EventType;

/// Describe which server, receiver and forwarder every event type passes
///
/// The config is expected to be validated already. Forwarders are also
/// constructed so kinds that cannot carry their event type are caught.
pub fn wiring_report(config: &Config) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "servers:")?;
    if let Some(grpc) = &config.server.grpc {
        writeln!(out, "  grpc  {} -> {}", grpc.address, grpc.socket_addr()?)?;
    }
    if let Some(http) = &config.server.http {
        writeln!(
            out,
            "  http  {} -> {}{} (timeout {}s)",
            http.address,
            http.socket_addr()?,
            http.uri,
            http.timeout
        )?;
    }
    writeln!(out, "upstream: {}", config.upstream.address)?;

    writeln!(out, "receivers:")?;
    let mut emitted = HashSet::new();
    for receiver in &config.receivers {
        if !receiver.enabled {
            writeln!(out, "  {} ({}) disabled", receiver.name, receiver.kind)?;
            continue;
        }
        writeln!(
            out,
            "  {} ({}, {} server)",
            receiver.name,
            receiver.kind,
            receiver.kind.server()
        )?;
        for &event_type in receiver.kind.event_types() {
            emitted.insert(event_type);
            writeln!(out, "    {}", route(config, event_type))?;
        }
    }

    writeln!(out, "forwarders:")?;
    for forwarder in config.enabled_forwarders() {
        ForwarderPlugin::from_config(forwarder)
            .with_context(|| format!("forwarder '{}' cannot be created", forwarder.name))?;
        let note = if emitted.contains(&forwarder.event_type) {
            ""
        } else {
            " (no receiver emits this type)"
        };
        writeln!(
            out,
            "  {} ({}) <- {}{}",
            forwarder.name, forwarder.kind, forwarder.event_type, note
        )?;
    }

    Ok(out)
}

fn route(config: &Config, event_type: EventType) -> String {
    let sync = if event_type.is_sync() { " [sync]" } else { "" };
    match config
        .enabled_forwarders()
        .find(|forwarder| forwarder.event_type == event_type)
    {
        Some(forwarder) => format!("{event_type} -> {} ({}){sync}", forwarder.name, forwarder.kind),
        None => format!("{event_type} -> no forwarder{sync}"),
    }
}
