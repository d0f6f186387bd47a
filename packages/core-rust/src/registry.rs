//! The registry facade: resource registration and path-addressed calls.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::context::CallContext;
use crate::decode::{decode_payload, decode_positional};
use crate::descriptor::normalize_name;
use crate::error::{DispatchError, RegistrationError};
use crate::invoke::invoke;
use crate::output::ReturnValue;
use crate::resolve::{resolve, Resolved};
use crate::resource::{OperationSet, Resource, ResourceDescriptor};

type ResourceMap = HashMap<String, Arc<ResourceDescriptor>>;

/// Maps resource names to their operations and dispatches calls by path.
///
/// Reads take a lock-free snapshot of the resource map, so `call` never
/// blocks on `register`. Registration replaces the map copy-on-write; it is
/// meant for startup, after which [`Registry::freeze`] makes the map
/// read-only. Writers (`register`, `freeze`) are serialized, so no
/// registration lands once `freeze` has returned.
pub struct Registry {
    resources: ArcSwap<ResourceMap>,
    writer: Mutex<()>,
    frozen: AtomicBool,
    next_call_id: AtomicU64,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
            frozen: AtomicBool::new(false),
            next_call_id: AtomicU64::new(0),
        }
    }

    /// Registers `instance` under `name`, replacing every operation
    /// previously registered under the same name.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] if the registry is frozen, the name is
    /// empty after normalization, or the resource's declaration fails.
    pub fn register<R: Resource>(&self, name: &str, instance: R) -> Result<(), RegistrationError> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(RegistrationError::EmptyResourceName {
                name: name.to_owned(),
            });
        }
        if self.is_frozen() {
            return Err(RegistrationError::Frozen { resource: key });
        }

        let mut ops = OperationSet::new(key.clone(), Arc::new(instance));
        R::declare(&mut ops)?;
        let descriptor = Arc::new(ops.finish());
        let operations = descriptor.len();

        let _writer = self.writer.lock();
        if self.is_frozen() {
            return Err(RegistrationError::Frozen { resource: key });
        }
        let mut next = ResourceMap::clone(&self.resources.load());
        let replaced = next.insert(key.clone(), descriptor).is_some();
        self.resources.store(Arc::new(next));

        info!(resource = %key, operations, replaced, "registered resource");
        Ok(())
    }

    /// Registers `instance` under its [`Resource::resource_name`].
    ///
    /// # Errors
    ///
    /// See [`Registry::register`].
    pub fn register_resource<R: Resource>(&self, instance: R) -> Result<(), RegistrationError> {
        let name = instance.resource_name();
        self.register(&name, instance)
    }

    /// Rejects all further registration.
    pub fn freeze(&self) {
        let _writer = self.writer.lock();
        self.frozen.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Resolves a path to its bound operation and positional segments.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NotFound`] if the path does not name a
    /// registered operation.
    pub fn resolve<'a>(&self, path: &'a str) -> Result<Resolved<'a>, DispatchError> {
        resolve(&self.resources.load(), path)
    }

    /// Calls the operation addressed by `path` with an optional JSON body.
    ///
    /// Returns `Ok(None)` when the operation has no value output.
    ///
    /// # Errors
    ///
    /// Returns a resolution or decoding error without invoking anything, or
    /// [`DispatchError::Operation`] with the operation's own error.
    pub fn call(&self, path: &str, body: Option<&[u8]>) -> Result<Option<ReturnValue>, DispatchError> {
        let resolved = self.resolve(path)?;
        let descriptor = resolved.operation.descriptor();
        let positional = decode_positional(path, descriptor, &resolved.arguments)?;
        let payload = decode_payload(path, descriptor, body)?;

        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let ctx = CallContext::new(call_id, resolved.resource, descriptor.name());
        invoke(&resolved.operation, ctx, positional, payload)
    }

    /// [`Registry::call`] with a JSON text payload.
    ///
    /// # Errors
    ///
    /// See [`Registry::call`].
    pub fn call_str(&self, path: &str, payload: &str) -> Result<Option<ReturnValue>, DispatchError> {
        self.call(path, Some(payload.as_bytes()))
    }

    /// Transport-facing call: takes a raw body and returns encoded output.
    ///
    /// An empty or all-whitespace body counts as no body. On success the
    /// reply body is the JSON encoding of the value, or empty when the
    /// operation returns none; on failure it is the error text.
    #[must_use]
    pub fn reply(&self, path: &str, body: &[u8]) -> Reply {
        let body = if body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(body)
        };

        match self.call(path, body) {
            Ok(Some(value)) => match value.to_json_vec() {
                Ok(bytes) => Reply::success(bytes),
                Err(err) => Reply::failure(
                    "result_encode",
                    format!("path \"{path}\" returned a value that cannot be encoded: {err}"),
                ),
            },
            Ok(None) => Reply::success(Vec::new()),
            Err(err) => {
                debug!(path, kind = err.kind(), error = %err, "call failed");
                Reply::failure(err.kind(), err.to_string())
            }
        }
    }

    /// Looks up a registered resource by name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<Arc<ResourceDescriptor>> {
        self.resources.load().get(&normalize_name(name)).cloned()
    }

    /// Registered resource names in sorted order.
    #[must_use]
    pub fn resource_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.resources.load().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.load().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("resources", &self.resource_names())
            .field("frozen", &self.is_frozen())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resources = self.resources.load();
        for (i, name) in self.resource_names().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(resource) = resources.get(name) {
                write!(f, "{resource}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Encoded outcome of [`Registry::reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub success: bool,
    /// JSON value on success (possibly empty), error text on failure.
    pub body: Vec<u8>,
    /// [`DispatchError::kind`] of the failure, if any.
    pub error_kind: Option<&'static str>,
}

impl Reply {
    #[must_use]
    pub fn success(body: Vec<u8>) -> Self {
        Self {
            success: true,
            body,
            error_kind: None,
        }
    }

    #[must_use]
    pub fn failure(kind: &'static str, message: String) -> Self {
        Self {
            success: false,
            body: message.into_bytes(),
            error_kind: Some(kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
