//! Dispatch pipeline between the HTTP boundary and the registry.
//!
//! 1. **Requests** (`operation`): `CallRequest` in, `Reply` out
//! 2. **Middleware** (`middleware`): Tower layers (metrics)
//! 3. **Dispatch** (`dispatch`): `Registry::reply` on the blocking pool

pub mod dispatch;
pub mod middleware;
pub mod operation;

pub use dispatch::DispatchService;
pub use middleware::{build_dispatch_pipeline, DispatchPipeline};
pub use operation::{CallRequest, ServiceError};
