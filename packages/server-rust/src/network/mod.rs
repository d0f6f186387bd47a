//! HTTP boundary: configuration, middleware, handlers, and lifecycle.

pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod module;

pub use config::NetworkConfig;
pub use handlers::AppState;
pub use lifecycle::{InFlightGuard, Lifecycle, ServingState};
pub use module::NetworkModule;
