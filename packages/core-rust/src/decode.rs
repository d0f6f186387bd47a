//! Positional argument and payload decoding against a descriptor.

use tracing::debug;

use crate::descriptor::{Argument, OperationDescriptor};
use crate::error::DispatchError;

/// Decodes path segments into the descriptor's positional types.
///
/// Segments beyond the declared positional count are ignored.
///
/// # Errors
///
/// Returns [`DispatchError::InsufficientArguments`] when too few segments
/// are supplied and [`DispatchError::ArgumentDecode`] when a segment does
/// not fit its type.
pub fn decode_positional(
    path: &str,
    descriptor: &OperationDescriptor,
    segments: &[&str],
) -> Result<Vec<Argument>, DispatchError> {
    let decoders = descriptor.positional();
    if segments.len() < decoders.len() {
        return Err(DispatchError::InsufficientArguments {
            path: path.to_owned(),
            expected: decoders.len(),
            supplied: segments.len(),
        });
    }

    decoders
        .iter()
        .zip(segments)
        .enumerate()
        .map(|(index, (decoder, segment))| {
            decoder.decode(segment).map_err(|source| {
                debug!(path, index, segment, expected = decoder.type_name(), "argument decode failed");
                DispatchError::ArgumentDecode {
                    path: path.to_owned(),
                    index,
                    segment: (*segment).to_owned(),
                    expected: decoder.type_name(),
                    source,
                }
            })
        })
        .collect()
}

/// Decodes the request body into the descriptor's payload type.
///
/// Returns `Ok(None)` when the operation declares no payload; the body is
/// not looked at in that case.
///
/// # Errors
///
/// Returns [`DispatchError::PayloadDecode`] when the body is not valid JSON
/// for the payload type.
pub fn decode_payload(
    path: &str,
    descriptor: &OperationDescriptor,
    body: Option<&[u8]>,
) -> Result<Option<Argument>, DispatchError> {
    let Some(decoder) = descriptor.payload() else {
        return Ok(None);
    };
    decoder.decode(body).map(Some).map_err(|source| {
        debug!(path, expected = decoder.type_name(), "payload decode failed");
        DispatchError::PayloadDecode {
            path: path.to_owned(),
            expected: decoder.type_name(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ArgDecoder, PayloadDecoder, Signature};
    use crate::output::OutputTag;

    fn descriptor(positional: Vec<ArgDecoder>, payload: Option<PayloadDecoder>) -> OperationDescriptor {
        OperationDescriptor::build(
            "test",
            "op",
            Signature {
                positional,
                payload,
                outputs: vec![OutputTag::Value],
            },
        )
        .unwrap()
    }

    #[test]
    fn positional_decodes_in_order() {
        let desc = descriptor(
            vec![ArgDecoder::of::<i64>(), ArgDecoder::of::<String>()],
            None,
        );
        let mut args = decode_positional("test/op/7/daniel", &desc, &["7", "daniel"]).unwrap().into_iter();
        assert_eq!(*args.next().unwrap().downcast::<i64>().unwrap(), 7);
        assert_eq!(*args.next().unwrap().downcast::<String>().unwrap(), "daniel");
    }

    #[test]
    fn surplus_segments_are_ignored() {
        let desc = descriptor(vec![ArgDecoder::of::<i64>()], None);
        let args = decode_positional("test/op/1/2", &desc, &["1", "2"]).unwrap();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn too_few_segments_is_insufficient() {
        let desc = descriptor(vec![ArgDecoder::of::<i64>(); 3], None);
        let err = decode_positional("test/op/1", &desc, &["1"]).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InsufficientArguments {
                expected: 3,
                supplied: 1,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_segment_reports_index() {
        let desc = descriptor(vec![ArgDecoder::of::<i64>(), ArgDecoder::of::<i64>()], None);
        let err = decode_positional("test/op/1/x", &desc, &["1", "x"]).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ArgumentDecode { index: 1, ref segment, .. } if segment == "x"
        ));
    }

    #[test]
    fn body_is_ignored_without_payload() {
        let desc = descriptor(Vec::new(), None);
        assert!(decode_payload("test/op", &desc, Some(b"{broken")).unwrap().is_none());
    }

    #[test]
    fn missing_body_yields_default_payload() {
        let desc = descriptor(Vec::new(), Some(PayloadDecoder::of::<String>()));
        let arg = decode_payload("test/op", &desc, None).unwrap().unwrap();
        assert_eq!(*arg.downcast::<String>().unwrap(), "");
    }

    #[test]
    fn malformed_body_is_payload_decode_error() {
        let desc = descriptor(Vec::new(), Some(PayloadDecoder::of::<String>()));
        let err = decode_payload("test/echo", &desc, Some(b"{broken")).unwrap_err();
        assert_eq!(err.kind(), "payload_decode");
        assert!(err.to_string().starts_with("path \"test/echo\" got invalid json"));
    }
}
