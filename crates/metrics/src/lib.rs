//! Satellite - Metrics
//!
//! Internal metrics collection and reporting.
//!
//! # Overview
//!
//! This crate provides:
//! - Atomic counter structs for receivers and forwarders
//! - Provider traits for components to expose metrics
//! - A periodic reporter with human or JSON output
//!
//! # Metrics Handle Pattern
//!
//! Components keep `Arc<Metrics>` internally and provide a `metrics_handle()`
//! method returning a lightweight handle implementing the provider trait.
//! The handle stays valid after `run()` consumes the component.
//!
//! ```text
//! Component (owns Arc<Metrics>)
//!     │
//!     ├──► metrics_handle() → Handle (clones Arc, implements Provider trait)
//!     │
//!     └──► run() [consumes self, Arc keeps metrics alive]
//! ```

mod collected;
pub mod format;
mod reporter;
mod traits;

pub use collected::{
    CollectedForwarder, CollectedMetrics, CollectedReceiver, CollectedServer, ForwarderRates,
    MetricsRates, PipelineRates, PipelineSnapshot, ReceiverRates,
};
pub use format::{HumanFormatter, JsonFormatter, MetricsFormatter};
pub use reporter::{MetricsReporter, MetricsReporterBuilder};
pub use traits::{
    ForwarderMetrics, ForwarderMetricsProvider, ForwarderMetricsSnapshot,
    PipelineMetricsProvider, ReceiverMetrics, ReceiverMetricsProvider, ReceiverMetricsSnapshot,
    ServerMetricsProvider, ServerMetricsSnapshot,
};
