//! Satellite Pipeline
//!
//! Binds receivers to forwarders: fan-in readers, per-forwarder batch
//! buffers, dual-trigger limiters, the fallback policy and the
//! forwarder-backed `SyncInvoker`.
//!
//! # Architecture
//!
//! ```text
//! receiver channels ──→ fan-in reader ──→ Lane(event_type)
//!                                          ├─ BatchBuffer  (offsets from 1, bounded)
//!                                          └─ Limiter      (time or size trigger)
//!                                                 └─ flush: take() → forward() → fallback
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut builder = PipelineBuilder::new(LaneConfig::from_config(&config.pipeline));
//! builder.add_forwarder(log_forwarder)?;
//! let mut pipeline = builder.build()?;
//!
//! pipeline.attach("grpc-native-log", receiver.channel()?);
//! receiver.register_sync_invoker(pipeline.sync_invoker());
//! // ...
//! pipeline.shutdown(Duration::from_secs(10)).await?;
//! ```

mod buffer;
mod error;
mod forwarder;
mod invoker;
mod lane;
mod limiter;
mod metrics;
mod pipeline;

pub use buffer::{AppendOutcome, BatchBuffer, BatchSnapshot};
pub use error::{PipelineError, Result};
pub use forwarder::{FallbackPolicy, ForwardError, Forwarder};
pub use invoker::ForwarderSyncInvoker;
pub use limiter::{FlushTarget, Limiter, LimiterConfig};
pub use metrics::{OverflowTracker, PipelineMetrics};
pub use pipeline::{LaneConfig, Pipeline, PipelineBuilder, PipelineMetricsHandle};
