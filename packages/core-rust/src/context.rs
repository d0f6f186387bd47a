/// Context handed to every operation as its first parameter.
///
/// The context is built by the registry for each call. It is a fixed value:
/// it carries no cancellation scope and nothing derived from the inbound
/// transport request, so operations run to completion once invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Monotonic identifier assigned by the registry, unique per registry.
    pub call_id: u64,
    /// Normalized resource name the call was resolved to.
    pub resource: String,
    /// Normalized operation name the call was resolved to.
    pub operation: String,
}

impl CallContext {
    /// Creates a context for a resolved call.
    #[must_use]
    pub fn new(call_id: u64, resource: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            call_id,
            resource: resource.into(),
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_populates_fields() {
        let ctx = CallContext::new(7, "users", "read");
        assert_eq!(ctx.call_id, 7);
        assert_eq!(ctx.resource, "users");
        assert_eq!(ctx.operation, "read");
    }
}
