//! Error types for registration and dispatch.

/// Errors returned while resolving, decoding, or invoking a call.
///
/// Every variant except [`DispatchError::Operation`] is produced before the
/// operation runs, so a failed call of those kinds has no side effects.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("path \"{path}\" not found")]
    NotFound { path: String },

    #[error("path \"{path}\" not enough args, expecting {expected}, got {supplied}")]
    InsufficientArguments {
        path: String,
        expected: usize,
        supplied: usize,
    },

    #[error("path \"{path}\" argument {index} ({segment:?}) is not a valid {expected}: {source}")]
    ArgumentDecode {
        path: String,
        index: usize,
        segment: String,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("path \"{path}\" got invalid json for {expected}: {source}")]
    PayloadDecode {
        path: String,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected {expected} inputs, got {supplied}")]
    ArityMismatch { expected: usize, supplied: usize },

    #[error("input {index} does not hold a {expected}")]
    ArgumentType { index: usize, expected: &'static str },

    /// Failure reported by the operation itself through its error output.
    #[error(transparent)]
    Operation(anyhow::Error),
}

impl DispatchError {
    /// Stable, low-cardinality label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InsufficientArguments { .. } => "insufficient_arguments",
            Self::ArgumentDecode { .. } => "argument_decode",
            Self::PayloadDecode { .. } => "payload_decode",
            Self::ArityMismatch { .. } => "arity_mismatch",
            Self::ArgumentType { .. } => "argument_type",
            Self::Operation(_) => "operation",
        }
    }

    /// Returns `true` when the failure happened before the operation ran.
    #[must_use]
    pub fn is_pre_invocation(&self) -> bool {
        !matches!(self, Self::Operation(_))
    }
}

/// Errors from declaring or registering a resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("resource name {name:?} is empty after normalization")]
    EmptyResourceName { name: String },

    #[error("resource {resource}: operation name {name:?} is empty after normalization")]
    EmptyOperationName { resource: String, name: String },

    #[error("resource {resource}: operation {operation} is declared more than once")]
    DuplicateOperation { resource: String, operation: String },

    #[error("resource {resource}: operation {operation} declares {count} error outputs, at most one is allowed")]
    AmbiguousError {
        resource: String,
        operation: String,
        count: usize,
    },

    #[error("resource {resource}: operation {operation} declares {count} value outputs, at most one is allowed")]
    AmbiguousValue {
        resource: String,
        operation: String,
        count: usize,
    },

    #[error("registry is frozen, cannot register resource {resource}")]
    Frozen { resource: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_error_displays_transparently() {
        let err = DispatchError::Operation(anyhow::anyhow!("user 4 is locked"));
        assert_eq!(err.to_string(), "user 4 is locked");
        assert_eq!(err.kind(), "operation");
        assert!(!err.is_pre_invocation());
    }

    #[test]
    fn not_found_message_names_path() {
        let err = DispatchError::NotFound {
            path: "boop/adder".to_string(),
        };
        assert_eq!(err.to_string(), "path \"boop/adder\" not found");
        assert!(err.is_pre_invocation());
    }

    #[test]
    fn insufficient_arguments_message() {
        let err = DispatchError::InsufficientArguments {
            path: "test/pathadder/1".to_string(),
            expected: 3,
            supplied: 1,
        };
        assert_eq!(
            err.to_string(),
            "path \"test/pathadder/1\" not enough args, expecting 3, got 1"
        );
        assert_eq!(err.kind(), "insufficient_arguments");
    }

    #[test]
    fn registration_error_messages() {
        let err = RegistrationError::AmbiguousError {
            resource: "users".to_string(),
            operation: "create".to_string(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "resource users: operation create declares 2 error outputs, at most one is allowed"
        );
    }
}
