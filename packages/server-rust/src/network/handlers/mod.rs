//! HTTP handler definitions for the gateway.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for building the router.

pub mod dispatch;
pub mod health;

pub use dispatch::dispatch_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use switchboard_core::Registry;

use super::{Lifecycle, NetworkConfig};
use crate::service::DispatchPipeline;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references and a cloneable pipeline so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Resources and operations being served.
    pub registry: Arc<Registry>,
    /// Tower pipeline every dispatch request goes through.
    pub pipeline: DispatchPipeline,
    /// Serving state and in-flight tracking.
    pub lifecycle: Arc<Lifecycle>,
    pub config: Arc<NetworkConfig>,
    /// Server start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(registry: Arc<Registry>, lifecycle: Arc<Lifecycle>, config: NetworkConfig) -> Self {
        Self {
            pipeline: crate::service::build_dispatch_pipeline(Arc::clone(&registry)),
            registry,
            lifecycle,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
