//! Satellite - telemetry ingestion sidecar
//!
//! Process-level assembly shared by the `satellite` binary and the
//! end-to-end tests:
//! - `Satellite` - builds servers, receivers, forwarders and the pipeline
//!   from one `Config` and runs them until shutdown
//! - `init_logging` - installs the `tracing` subscriber
//! - `wiring_report` - human-readable view of what a config connects

mod app;
mod logging;
mod report;

pub use app::Satellite;
pub use logging::{init_logging, resolve_filter};
pub use report::wiring_report;
