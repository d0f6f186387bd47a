//! Switchboard Core: path-addressed dispatch of calls to registered
//! resource operations.
//!
//! A [`Resource`] declares its operations once; the [`Registry`] then
//! resolves paths of the form `resource/operation/arg0/arg1/...`, decodes
//! positional arguments and an optional JSON payload, invokes the
//! operation, and hands back either its value or its error.

pub mod context;
pub mod decode;
pub mod descriptor;
pub mod error;
pub mod handler;
pub mod invoke;
pub mod output;
pub mod registry;
pub mod resolve;
pub mod resource;

pub use context::CallContext;
pub use descriptor::{normalize_name, OperationDescriptor};
pub use error::{DispatchError, RegistrationError};
pub use handler::{Handler, Positional, WithPayload};
pub use output::{IntoOutputs, Json, Output, OutputTag, ReturnValue};
pub use registry::{Registry, Reply};
pub use resolve::RequestPath;
pub use resource::{BoundOperation, OperationSet, Resource, ResourceDescriptor};
