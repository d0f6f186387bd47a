//! Pipeline composition: wraps the dispatch service in its middleware.

use std::sync::Arc;

use switchboard_core::Registry;
use tower::ServiceBuilder;

use super::metrics::{MetricsLayer, MetricsService};
use crate::service::dispatch::DispatchService;

/// The composed service type produced by [`build_dispatch_pipeline`].
pub type DispatchPipeline = MetricsService<DispatchService>;

/// Builds the dispatch pipeline around a shared registry.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- span, call counter, latency histogram
/// 2. `DispatchService` -- `Registry::reply` on the blocking pool
///
/// The returned service implements `tower::Service<CallRequest>` and is
/// cheap to clone.
#[must_use]
pub fn build_dispatch_pipeline(registry: Arc<Registry>) -> DispatchPipeline {
    ServiceBuilder::new()
        .layer(MetricsLayer)
        .service(DispatchService::new(registry))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
