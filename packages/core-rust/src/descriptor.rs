//! Operation descriptors: the call shape of one operation, computed once at
//! registration and reused on every call.

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::RegistrationError;
use crate::output::OutputTag;

/// A decoded call argument, erased until the bound operation takes it back.
pub type Argument = Box<dyn Any + Send>;

// ---------------------------------------------------------------------------
// Decoders
// ---------------------------------------------------------------------------

/// Typed decoder for one positional path segment.
#[derive(Clone, Copy)]
pub struct ArgDecoder {
    type_name: &'static str,
    decode: fn(&str) -> serde_json::Result<Argument>,
}

impl ArgDecoder {
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            decode: decode_segment::<T>,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Decodes a raw path segment.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the segment is neither a JSON literal of
    /// the target type nor a string the target type accepts.
    pub fn decode(&self, segment: &str) -> serde_json::Result<Argument> {
        (self.decode)(segment)
    }
}

impl fmt::Debug for ArgDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArgDecoder").field(&self.type_name).finish()
    }
}

/// Segments are JSON literals first; a token that is not a valid literal of
/// the target type is retried as a JSON string, so `users/read/7` yields a
/// number and `users/find/daniel` a string. An already-quoted segment such
/// as `"daniel"` is a string literal and decodes to `daniel`, the same
/// value as the bare token.
fn decode_segment<T>(segment: &str) -> serde_json::Result<Argument>
where
    T: DeserializeOwned + Send + 'static,
{
    match serde_json::from_str::<T>(segment) {
        Ok(value) => Ok(Box::new(value)),
        Err(literal_err) => {
            serde_json::from_value::<T>(serde_json::Value::String(segment.to_owned()))
                .map(|value| Box::new(value) as Argument)
                .map_err(|_| literal_err)
        }
    }
}

/// Typed decoder for the request body.
#[derive(Clone, Copy)]
pub struct PayloadDecoder {
    type_name: &'static str,
    decode: fn(Option<&[u8]>) -> serde_json::Result<Argument>,
}

impl PayloadDecoder {
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            decode: decode_body::<T>,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Decodes a body into a fresh payload value; `None` yields the default.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the body is not valid JSON for the type.
    pub fn decode(&self, body: Option<&[u8]>) -> serde_json::Result<Argument> {
        (self.decode)(body)
    }
}

impl fmt::Debug for PayloadDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PayloadDecoder").field(&self.type_name).finish()
    }
}

fn decode_body<T>(body: Option<&[u8]>) -> serde_json::Result<Argument>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    let value = match body {
        Some(bytes) => serde_json::from_slice::<T>(bytes)?,
        None => T::default(),
    };
    Ok(Box::new(value))
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Parameter and output shape reported by a handler at registration.
#[derive(Debug, Clone)]
pub struct Signature {
    pub positional: Vec<ArgDecoder>,
    pub payload: Option<PayloadDecoder>,
    pub outputs: Vec<OutputTag>,
}

impl Signature {
    /// Parameter count including the leading context.
    #[must_use]
    pub fn arity(&self) -> usize {
        1 + self.positional.len() + usize::from(self.payload.is_some())
    }
}

// ---------------------------------------------------------------------------
// OperationDescriptor
// ---------------------------------------------------------------------------

/// Immutable call shape of one operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    name: String,
    positional: Vec<ArgDecoder>,
    payload: Option<PayloadDecoder>,
    error_position: Option<usize>,
    value_position: Option<usize>,
    output_count: usize,
}

impl OperationDescriptor {
    /// Classifies a handler signature into a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::AmbiguousError`] or
    /// [`RegistrationError::AmbiguousValue`] when the output list declares
    /// more than one slot of either kind.
    pub fn build(
        resource: &str,
        name: &str,
        signature: Signature,
    ) -> Result<Self, RegistrationError> {
        let (error_position, value_position) = classify_outputs(resource, name, &signature.outputs)?;
        Ok(Self {
            name: name.to_owned(),
            positional: signature.positional,
            payload: signature.payload,
            error_position,
            value_position,
            output_count: signature.outputs.len(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn positional(&self) -> &[ArgDecoder] {
        &self.positional
    }

    pub fn positional_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.positional.iter().map(ArgDecoder::type_name)
    }

    #[must_use]
    pub fn payload(&self) -> Option<&PayloadDecoder> {
        self.payload.as_ref()
    }

    #[must_use]
    pub fn payload_type(&self) -> Option<&'static str> {
        self.payload.as_ref().map(PayloadDecoder::type_name)
    }

    #[must_use]
    pub fn error_position(&self) -> Option<usize> {
        self.error_position
    }

    #[must_use]
    pub fn value_position(&self) -> Option<usize> {
        self.value_position
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Parameter count including the leading context.
    #[must_use]
    pub fn param_count(&self) -> usize {
        1 + self.positional.len() + usize::from(self.payload.is_some())
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{err:{}, val:{}, dst:{}, pth:{}}}",
            self.name,
            self.error_position.is_some(),
            self.value_position.is_some(),
            self.payload_type().unwrap_or("-"),
            self.positional.len()
        )
    }
}

/// Finds the single error slot and the single value slot of an output list.
fn classify_outputs(
    resource: &str,
    operation: &str,
    outputs: &[OutputTag],
) -> Result<(Option<usize>, Option<usize>), RegistrationError> {
    let positions = |tag: OutputTag| {
        outputs
            .iter()
            .enumerate()
            .filter(move |(_, t)| **t == tag)
            .map(|(i, _)| i)
    };

    let errors: Vec<usize> = positions(OutputTag::Error).collect();
    if errors.len() > 1 {
        return Err(RegistrationError::AmbiguousError {
            resource: resource.to_owned(),
            operation: operation.to_owned(),
            count: errors.len(),
        });
    }

    let values: Vec<usize> = positions(OutputTag::Value).collect();
    if values.len() > 1 {
        return Err(RegistrationError::AmbiguousValue {
            resource: resource.to_owned(),
            operation: operation.to_owned(),
            count: values.len(),
        });
    }

    Ok((errors.first().copied(), values.first().copied()))
}

/// Normalizes resource and operation identifiers: lower-cased, with `-` and
/// `_` dropped, so `get-user`, `get_user` and `GetUser` coincide.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(outputs: Vec<OutputTag>) -> Signature {
        Signature {
            positional: vec![ArgDecoder::of::<i64>(), ArgDecoder::of::<String>()],
            payload: Some(PayloadDecoder::of::<Vec<i64>>()),
            outputs,
        }
    }

    #[test]
    fn build_records_positions() {
        let desc = OperationDescriptor::build(
            "test",
            "adder",
            signature(vec![OutputTag::Value, OutputTag::Error]),
        )
        .unwrap();

        assert_eq!(desc.name(), "adder");
        assert_eq!(desc.value_position(), Some(0));
        assert_eq!(desc.error_position(), Some(1));
        assert_eq!(desc.output_count(), 2);
        assert_eq!(desc.param_count(), 4);
        assert_eq!(
            desc.positional_types().collect::<Vec<_>>(),
            vec!["i64", "alloc::string::String"]
        );
        assert!(desc.payload_type().unwrap().contains("Vec<i64>"));
    }

    #[test]
    fn build_without_outputs_has_no_positions() {
        let desc = OperationDescriptor::build("users", "delete", signature(Vec::new())).unwrap();
        assert_eq!(desc.value_position(), None);
        assert_eq!(desc.error_position(), None);
    }

    #[test]
    fn two_error_outputs_are_rejected() {
        let err = OperationDescriptor::build(
            "users",
            "create",
            signature(vec![OutputTag::Error, OutputTag::Value, OutputTag::Error]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::AmbiguousError {
                resource: "users".to_string(),
                operation: "create".to_string(),
                count: 2,
            }
        );
    }

    #[test]
    fn two_value_outputs_are_rejected() {
        let err = OperationDescriptor::build(
            "users",
            "create",
            signature(vec![OutputTag::Value, OutputTag::Value]),
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::AmbiguousValue { count: 2, .. }));
    }

    #[test]
    fn segment_decodes_number_literal() {
        let arg = ArgDecoder::of::<i64>().decode("42").unwrap();
        assert_eq!(*arg.downcast::<i64>().unwrap(), 42);
    }

    #[test]
    fn segment_decodes_bare_word_as_string() {
        let arg = ArgDecoder::of::<String>().decode("daniel").unwrap();
        assert_eq!(*arg.downcast::<String>().unwrap(), "daniel");
    }

    #[test]
    fn quoted_segment_decodes_to_inner_string() {
        let quoted = ArgDecoder::of::<String>().decode("\"daniel\"").unwrap();
        assert_eq!(*quoted.downcast::<String>().unwrap(), "daniel");
        let bare = ArgDecoder::of::<String>().decode("daniel").unwrap();
        assert_eq!(*bare.downcast::<String>().unwrap(), "daniel");
    }

    #[test]
    fn numeric_segment_into_string_keeps_text() {
        let arg = ArgDecoder::of::<String>().decode("0").unwrap();
        assert_eq!(*arg.downcast::<String>().unwrap(), "0");
    }

    #[test]
    fn segment_type_mismatch_fails() {
        assert!(ArgDecoder::of::<i64>().decode("abc").is_err());
        assert!(ArgDecoder::of::<u8>().decode("1.5").is_err());
    }

    #[test]
    fn bool_segment_decodes() {
        let arg = ArgDecoder::of::<bool>().decode("true").unwrap();
        assert!(*arg.downcast::<bool>().unwrap());
    }

    #[test]
    fn payload_absent_yields_default() {
        let arg = PayloadDecoder::of::<Vec<i64>>().decode(None).unwrap();
        assert!(arg.downcast::<Vec<i64>>().unwrap().is_empty());
    }

    #[test]
    fn payload_malformed_fails() {
        assert!(PayloadDecoder::of::<String>().decode(Some(b"{broken")).is_err());
    }

    #[test]
    fn display_summarizes_shape() {
        let desc = OperationDescriptor::build(
            "test",
            "pathadder",
            Signature {
                positional: vec![ArgDecoder::of::<i64>(); 3],
                payload: None,
                outputs: vec![OutputTag::Value],
            },
        )
        .unwrap();
        assert_eq!(desc.to_string(), "pathadder{err:false, val:true, dst:-, pth:3}");
    }

    #[test]
    fn normalize_name_folds_case_and_separators() {
        assert_eq!(normalize_name("GetUser"), "getuser");
        assert_eq!(normalize_name("get-user"), "getuser");
        assert_eq!(normalize_name("get_user"), "getuser");
        assert_eq!(normalize_name("--"), "");
    }
}
