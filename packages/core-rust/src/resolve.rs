//! Request path resolution: `resource/operation/arg0/arg1/...`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::normalize_name;
use crate::error::DispatchError;
use crate::resource::{BoundOperation, ResourceDescriptor};

/// A request path split into its parts. Empty segments are dropped, so
/// leading, trailing, and doubled slashes are tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath<'a> {
    /// Normalized resource id.
    pub resource: String,
    /// Normalized operation id.
    pub operation: String,
    /// Raw positional segments, in path order.
    pub arguments: Vec<&'a str>,
}

impl<'a> RequestPath<'a> {
    /// Splits a path into resource id, operation id, and positional segments.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NotFound`] when fewer than two segments are
    /// present.
    pub fn parse(path: &'a str) -> Result<Self, DispatchError> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let (Some(resource), Some(operation)) = (segments.next(), segments.next()) else {
            return Err(DispatchError::NotFound {
                path: path.to_owned(),
            });
        };
        Ok(Self {
            resource: normalize_name(resource),
            operation: normalize_name(operation),
            arguments: segments.collect(),
        })
    }
}

/// A path matched against the registry.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub resource: String,
    pub operation: Arc<BoundOperation>,
    pub arguments: Vec<&'a str>,
}

/// Resolves a path against a snapshot of the registry's resources.
///
/// # Errors
///
/// Returns [`DispatchError::NotFound`] when the path is too short or names
/// an unknown resource or operation.
pub fn resolve<'a>(
    resources: &HashMap<String, Arc<ResourceDescriptor>>,
    path: &'a str,
) -> Result<Resolved<'a>, DispatchError> {
    let request = RequestPath::parse(path)?;
    let operation = resources
        .get(&request.resource)
        .and_then(|resource| resource.operation(&request.operation))
        .cloned()
        .ok_or_else(|| DispatchError::NotFound {
            path: path.to_owned(),
        })?;
    Ok(Resolved {
        resource: request.resource,
        operation,
        arguments: request.arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_resource_operation_and_arguments() {
        let request = RequestPath::parse("test/pathadder/1/2/3").unwrap();
        assert_eq!(request.resource, "test");
        assert_eq!(request.operation, "pathadder");
        assert_eq!(request.arguments, vec!["1", "2", "3"]);
    }

    #[test]
    fn parse_ignores_empty_segments() {
        let request = RequestPath::parse("/users//read/0/").unwrap();
        assert_eq!(request.resource, "users");
        assert_eq!(request.operation, "read");
        assert_eq!(request.arguments, vec!["0"]);
    }

    #[test]
    fn parse_normalizes_ids_but_not_arguments() {
        let request = RequestPath::parse("Users/get-user/Daniel").unwrap();
        assert_eq!(request.resource, "users");
        assert_eq!(request.operation, "getuser");
        assert_eq!(request.arguments, vec!["Daniel"]);
    }

    #[test]
    fn parse_requires_two_segments() {
        for path in ["", "/", "users", "users/"] {
            let err = RequestPath::parse(path).unwrap_err();
            assert!(matches!(err, DispatchError::NotFound { .. }), "{path}");
        }
    }

    #[test]
    fn resolve_unknown_resource_is_not_found() {
        let resources = HashMap::new();
        let err = resolve(&resources, "boop/adder").unwrap_err();
        assert_eq!(err.to_string(), "path \"boop/adder\" not found");
    }
}
