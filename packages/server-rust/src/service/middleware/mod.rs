//! Tower middleware layers for the dispatch pipeline.
//!
//! - [`metrics`]: Call timing, counting, and tracing spans
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod metrics;
pub mod pipeline;

pub use metrics::{MetricsLayer, MetricsService};
pub use pipeline::{build_dispatch_pipeline, DispatchPipeline};
