//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates shared state,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. Resources can still be registered between `new()` and
//! `serve()`; `serve()` freezes the registry before the first call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use switchboard_core::Registry;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    dispatch_handler, health_handler, liveness_handler, readiness_handler, AppState,
};
use super::lifecycle::Lifecycle;
use super::middleware::build_http_layers;

/// How long `serve()` waits for in-flight calls after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages the HTTP server lifecycle around a shared [`Registry`].
///
/// 1. `new()` -- allocates shared state (lifecycle)
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- freezes the registry and accepts connections until
///    shutdown is signalled, then drains in-flight calls
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    registry: Arc<Registry>,
    lifecycle: Arc<Lifecycle>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, registry: Arc<Registry>) -> Self {
        Self {
            config,
            listener: None,
            registry,
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Returns a shared handle to the serving state and in-flight count.
    #[must_use]
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET|POST {api_prefix}/{*path}` -- dispatch
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    pub fn build_router(&self) -> Router {
        let state = AppState::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.lifecycle),
            self.config.clone(),
        );

        Router::new()
            .route(
                &self.config.dispatch_route(),
                get(dispatch_handler).post(dispatch_handler),
            )
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which differs from the configured
    /// port when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves calls until the shutdown future resolves.
    ///
    /// Freezes the registry and moves to `Serving` before accepting
    /// connections. After shutdown, moves to `Draining` and waits up to 30
    /// seconds for in-flight calls before moving to `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server
    /// hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;

        self.registry.freeze();
        let router = self.build_router();
        self.lifecycle.set_serving();
        info!(resources = self.registry.len(), "serving calls");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        drain(&self.lifecycle).await;
        Ok(())
    }
}

/// Moves to `Draining` and waits for in-flight calls to finish.
async fn drain(lifecycle: &Lifecycle) {
    lifecycle.begin_drain();

    let in_flight = lifecycle.in_flight_count();
    if in_flight > 0 {
        info!("Draining {} in-flight calls", in_flight);
    }

    if lifecycle.wait_for_drain(DRAIN_TIMEOUT).await {
        info!("All in-flight calls drained");
    } else {
        warn!("Drain timeout expired with in-flight calls remaining");
    }
}
