//! Serving state and in-flight call tracking.
//!
//! The state lives in an `ArcSwap` so health probes read it without
//! locking; in-flight calls are counted with RAII guards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

/// Where the gateway is in its lifecycle.
///
/// State machine: Registering -> Serving -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingState {
    /// Resources are still being registered; no calls are served yet.
    Registering,
    /// The registry is frozen and calls are accepted.
    Serving,
    /// Shutdown was requested; in-flight calls are finishing.
    Draining,
    /// All in-flight calls completed.
    Stopped,
}

impl ServingState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registering => "registering",
            Self::Serving => "serving",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Shared lifecycle handle: serving state plus in-flight call count.
#[derive(Debug)]
pub struct Lifecycle {
    state: ArcSwap<ServingState>,
    in_flight: Arc<AtomicU64>,
}

impl Lifecycle {
    /// Creates a lifecycle in the `Registering` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(ServingState::Registering),
            in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn state(&self) -> ServingState {
        **self.state.load()
    }

    pub fn set_serving(&self) {
        self.state.store(Arc::new(ServingState::Serving));
    }

    pub fn begin_drain(&self) {
        self.state.store(Arc::new(ServingState::Draining));
    }

    /// Creates an RAII guard that counts one in-flight call.
    ///
    /// The count is decremented when the guard drops, including during
    /// unwinding.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits until no calls are in flight, up to `timeout`.
    ///
    /// Returns `true` and moves to `Stopped` once drained. Returns `false`
    /// and leaves the state unchanged if the timeout expires first.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                self.state.store(Arc::new(ServingState::Stopped));
                return true;
            }

            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
