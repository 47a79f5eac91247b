//! Human-readable metrics formatter
//!
//! # Example Output
//!
//! ```text
//! [metrics] pipeline: in 1.2K/s | out 1.2K/s | flushes 4/s | overflow 0 | dropped 0
//! [metrics] servers: grpc (12 conn, 340 calls) | http (0 conn, 2 calls)
//! [metrics] receivers: grpc-log (3 streams, 800/s, 1.1 MB/s) | envoy-als (2 streams, 400/s, 90.0 KB/s)
//! [metrics] forwarders: log (800/s, 1.1 MB/s, ok) | envoy_als_v3 (400/s, 90.0 KB/s, 2 err)
//! ```

use std::fmt::Write;

use super::{MetricsFormatter, format_bytes_per_sec, format_rate};
use crate::{CollectedMetrics, MetricsRates};

/// Human-readable metrics formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    pub fn new() -> Self {
        Self
    }

    fn format_pipeline(&self, rates: &MetricsRates) -> Option<String> {
        let p = rates.pipeline.as_ref()?;
        Some(format!(
            "[metrics] pipeline: in {} | out {} | flushes {:.0}/s | overflow {} | dropped {}",
            format_rate(p.received_per_sec),
            format_rate(p.forwarded_per_sec),
            p.flushes_per_sec,
            p.overflows,
            p.dropped,
        ))
    }

    fn format_servers(&self, metrics: &CollectedMetrics) -> Option<String> {
        if metrics.servers.is_empty() {
            return None;
        }
        let mut output = String::from("[metrics] servers:");
        for (i, server) in metrics.servers.iter().enumerate() {
            if i > 0 {
                output.push_str(" |");
            }
            let _ = write!(
                output,
                " {} ({} conn, {} calls",
                server.server_type,
                server.snapshot.connections_active,
                server.snapshot.requests_total,
            );
            if server.snapshot.requests_rejected > 0 {
                let _ = write!(output, ", {} rejected", server.snapshot.requests_rejected);
            }
            output.push(')');
        }
        Some(output)
    }

    fn format_receivers(&self, rates: &MetricsRates) -> Option<String> {
        if rates.receivers.is_empty() {
            return None;
        }
        let mut output = String::from("[metrics] receivers:");
        for (i, r) in rates.receivers.iter().enumerate() {
            if i > 0 {
                output.push_str(" |");
            }
            let _ = write!(
                output,
                " {} ({} streams, {}, {}",
                r.id,
                r.streams_active,
                format_rate(r.frames_per_sec),
                format_bytes_per_sec(r.bytes_per_sec),
            );
            if r.errors > 0 {
                let _ = write!(output, ", {} err", r.errors);
            }
            output.push(')');
        }
        Some(output)
    }

    fn format_forwarders(&self, rates: &MetricsRates) -> Option<String> {
        if rates.forwarders.is_empty() {
            return None;
        }
        let mut output = String::from("[metrics] forwarders:");
        for (i, f) in rates.forwarders.iter().enumerate() {
            if i > 0 {
                output.push_str(" |");
            }
            let _ = write!(
                output,
                " {} ({}, {}",
                f.id,
                format_rate(f.envelopes_per_sec),
                format_bytes_per_sec(f.bytes_per_sec),
            );
            if f.errors > 0 {
                let _ = write!(output, ", {} err", f.errors);
            } else {
                output.push_str(", ok");
            }
            output.push(')');
        }
        Some(output)
    }
}

impl MetricsFormatter for HumanFormatter {
    fn format(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> String {
        let Some(rates) = rates else {
            return "[metrics] collecting baseline...".to_string();
        };

        let lines: Vec<String> = [
            self.format_pipeline(rates),
            self.format_servers(metrics),
            self.format_receivers(rates),
            self.format_forwarders(rates),
        ]
        .into_iter()
        .flatten()
        .collect();

        if lines.is_empty() {
            "[metrics] no activity".to_string()
        } else {
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{ForwarderRates, PipelineRates, ReceiverRates};

    fn rates() -> MetricsRates {
        MetricsRates {
            elapsed: Duration::from_secs(10),
            pipeline: Some(PipelineRates {
                received_per_sec: 1200.0,
                forwarded_per_sec: 1100.0,
                flushes_per_sec: 4.0,
                overflows: 3,
                dropped: 0,
            }),
            receivers: vec![ReceiverRates {
                id: "grpc-log".into(),
                receiver_type: "grpc_native_log".into(),
                frames_per_sec: 800.0,
                bytes_per_sec: 2048.0,
                streams_active: 3,
                errors: 1,
            }],
            forwarders: vec![ForwarderRates {
                id: "log".into(),
                forwarder_type: "log".into(),
                envelopes_per_sec: 800.0,
                bytes_per_sec: 2048.0,
                errors: 0,
            }],
        }
    }

    #[test]
    fn test_baseline_message() {
        let out = HumanFormatter::new().format(&CollectedMetrics::default(), None);
        assert!(out.contains("baseline"));
    }

    #[test]
    fn test_full_report() {
        let out = HumanFormatter::new().format(&CollectedMetrics::default(), Some(&rates()));
        assert!(out.contains("in 1.2K/s"));
        assert!(out.contains("overflow 3"));
        assert!(out.contains("grpc-log (3 streams, 800/s, 2.0 KB/s, 1 err)"));
        assert!(out.contains("log (800/s, 2.0 KB/s, ok)"));
        assert_eq!(out.lines().count(), 3);
    }
}
