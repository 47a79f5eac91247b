//! JSON metrics formatter
//!
//! Formats metrics as one structured JSON object per report.

use serde::Serialize;

use super::MetricsFormatter;
use crate::{
    CollectedMetrics, ForwarderMetricsSnapshot, MetricsRates, PipelineSnapshot,
    ReceiverMetricsSnapshot, ServerMetricsSnapshot,
};

/// JSON metrics formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pipeline: Option<&'a PipelineSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    servers: Vec<ServerJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    receivers: Vec<ReceiverJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    forwarders: Vec<ForwarderJson<'a>>,
}

#[derive(Serialize)]
struct ServerJson<'a> {
    #[serde(rename = "type")]
    server_type: &'a str,
    #[serde(flatten)]
    snapshot: &'a ServerMetricsSnapshot,
}

#[derive(Serialize)]
struct ReceiverJson<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    receiver_type: &'a str,
    #[serde(flatten)]
    snapshot: &'a ReceiverMetricsSnapshot,
}

#[derive(Serialize)]
struct ForwarderJson<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    forwarder_type: &'a str,
    #[serde(flatten)]
    snapshot: &'a ForwarderMetricsSnapshot,
}

impl MetricsFormatter for JsonFormatter {
    fn format(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> String {
        let report = ReportJson {
            report_type: "satellite",
            elapsed_secs: rates.map(|r| r.elapsed.as_secs_f64()),
            pipeline: metrics.pipeline.as_ref(),
            servers: metrics
                .servers
                .iter()
                .map(|s| ServerJson {
                    server_type: &s.server_type,
                    snapshot: &s.snapshot,
                })
                .collect(),
            receivers: metrics
                .receivers
                .iter()
                .map(|r| ReceiverJson {
                    id: &r.id,
                    receiver_type: &r.receiver_type,
                    snapshot: &r.snapshot,
                })
                .collect(),
            forwarders: metrics
                .forwarders
                .iter()
                .map(|f| ForwarderJson {
                    id: &f.id,
                    forwarder_type: &f.forwarder_type,
                    snapshot: &f.snapshot,
                })
                .collect(),
        };

        serde_json::to_string(&report).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}
