//! Switchboard Server — HTTP gateway, Tower dispatch pipeline, demo
//! backends, and an outbound client for the path-addressed registry.

pub mod backends;
pub mod client;
pub mod network;
pub mod service;

pub use client::{ClientError, GatewayClient};
pub use network::{NetworkConfig, NetworkModule};
pub use service::{build_dispatch_pipeline, CallRequest};
