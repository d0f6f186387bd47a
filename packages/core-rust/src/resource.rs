//! Resources and their declared operations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::{normalize_name, Argument, OperationDescriptor};
use crate::error::{DispatchError, RegistrationError};
use crate::handler::{Handler, Positional, WithPayload};
use crate::output::Outputs;

/// A type whose operations can be exposed through a [`Registry`](crate::Registry).
///
/// `declare` is called once per registration and lists every operation the
/// resource exposes.
///
/// ```
/// use switchboard_core::{CallContext, OperationSet, RegistrationError, Registry, Resource};
///
/// struct Greeter;
///
/// impl Greeter {
///     fn hello(&self, _ctx: &CallContext, name: String) -> String {
///         format!("hello {name}")
///     }
/// }
///
/// impl Resource for Greeter {
///     fn declare(ops: &mut OperationSet<Self>) -> Result<(), RegistrationError> {
///         ops.operation("Hello", Greeter::hello)?;
///         Ok(())
///     }
/// }
///
/// let registry = Registry::new();
/// registry.register_resource(Greeter).unwrap();
/// let value = registry.call("greeter/hello/world", None).unwrap().unwrap();
/// assert_eq!(value.downcast::<String>().unwrap(), "hello world");
/// ```
pub trait Resource: Send + Sync + Sized + 'static {
    /// Declares the resource's operations.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistrationError`] raised by the builder.
    fn declare(ops: &mut OperationSet<Self>) -> Result<(), RegistrationError>;

    /// Name used by [`Registry::register_resource`](crate::Registry::register_resource).
    /// Defaults to the type name.
    fn resource_name(&self) -> String {
        short_type_name::<Self>().to_owned()
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ---------------------------------------------------------------------------
// BoundOperation
// ---------------------------------------------------------------------------

type InvokeFn = Box<dyn Fn(Vec<Argument>) -> Result<Outputs, DispatchError> + Send + Sync>;

/// An operation's descriptor together with the closure that calls it on its
/// resource instance.
pub struct BoundOperation {
    descriptor: OperationDescriptor,
    arity: usize,
    invoke: InvokeFn,
}

impl BoundOperation {
    #[must_use]
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// Parameter count the bound callable expects, including the context.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Calls the bound operation with a fully assembled argument list.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ArityMismatch`] or
    /// [`DispatchError::ArgumentType`] when the list does not fit.
    pub fn call(&self, args: Vec<Argument>) -> Result<Outputs, DispatchError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for BoundOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundOperation")
            .field("descriptor", &self.descriptor)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// OperationSet (builder)
// ---------------------------------------------------------------------------

/// Builder handed to [`Resource::declare`].
pub struct OperationSet<R> {
    resource: String,
    instance: Arc<R>,
    operations: HashMap<String, Arc<BoundOperation>>,
}

impl<R: Resource> OperationSet<R> {
    pub(crate) fn new(resource: String, instance: Arc<R>) -> Self {
        Self {
            resource,
            instance,
            operations: HashMap::new(),
        }
    }

    /// Normalized name of the resource being declared.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Declares an operation whose parameters after the context are all
    /// positional path arguments. Any request body is ignored.
    ///
    /// # Errors
    ///
    /// Fails on an empty or duplicate name, or on an ambiguous output list.
    pub fn operation<T, H>(&mut self, name: &str, handler: H) -> Result<&mut Self, RegistrationError>
    where
        H: Handler<R, Positional<T>>,
        T: 'static,
    {
        self.bind::<Positional<T>, H>(name, handler)?;
        Ok(self)
    }

    /// Declares an operation whose last parameter is decoded from the
    /// request body; the parameters between the context and the payload are
    /// positional path arguments.
    ///
    /// # Errors
    ///
    /// Fails on an empty or duplicate name, or on an ambiguous output list.
    pub fn operation_with_payload<T, P, H>(
        &mut self,
        name: &str,
        handler: H,
    ) -> Result<&mut Self, RegistrationError>
    where
        H: Handler<R, WithPayload<T, P>>,
        T: 'static,
        P: 'static,
    {
        self.bind::<WithPayload<T, P>, H>(name, handler)?;
        Ok(self)
    }

    fn bind<M, H>(&mut self, name: &str, handler: H) -> Result<(), RegistrationError>
    where
        H: Handler<R, M>,
        M: 'static,
    {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(RegistrationError::EmptyOperationName {
                resource: self.resource.clone(),
                name: name.to_owned(),
            });
        }
        if self.operations.contains_key(&key) {
            return Err(RegistrationError::DuplicateOperation {
                resource: self.resource.clone(),
                operation: key,
            });
        }

        let signature = H::signature();
        let arity = signature.arity();
        let descriptor = OperationDescriptor::build(&self.resource, &key, signature)?;
        debug!(resource = %self.resource, operation = %descriptor, "declared operation");

        let instance = Arc::clone(&self.instance);
        let invoke: InvokeFn = Box::new(move |args| Handler::<R, M>::invoke(&handler, &instance, args));

        self.operations.insert(
            key,
            Arc::new(BoundOperation {
                descriptor,
                arity,
                invoke,
            }),
        );
        Ok(())
    }

    pub(crate) fn finish(self) -> ResourceDescriptor {
        ResourceDescriptor {
            name: self.resource,
            operations: self.operations,
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceDescriptor
// ---------------------------------------------------------------------------

/// All operations of one registered resource.
#[derive(Debug)]
pub struct ResourceDescriptor {
    name: String,
    operations: HashMap<String, Arc<BoundOperation>>,
}

impl ResourceDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up an operation by its normalized name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&Arc<BoundOperation>> {
        self.operations.get(name)
    }

    /// Operation names in sorted order.
    #[must_use]
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.name)?;
        for (i, name) in self.operation_names().into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}: {}", self.operations[name].descriptor())?;
        }
        Ok(())
    }
}
