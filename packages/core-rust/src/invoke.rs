//! Invocation: argument assembly, the call itself, and error-or-value
//! extraction by cached output position.

use tracing::debug;

use crate::context::CallContext;
use crate::descriptor::{Argument, OperationDescriptor};
use crate::error::DispatchError;
use crate::output::{Output, Outputs, ReturnValue};
use crate::resource::BoundOperation;

/// Assembles `[context, positional.., payload?]` and calls the operation.
///
/// # Errors
///
/// Returns [`DispatchError::ArityMismatch`] if the assembled list does not
/// match the bound operation's parameter count, and
/// [`DispatchError::Operation`] if the operation reports an error.
pub fn invoke(
    operation: &BoundOperation,
    ctx: CallContext,
    positional: Vec<Argument>,
    payload: Option<Argument>,
) -> Result<Option<ReturnValue>, DispatchError> {
    let call_id = ctx.call_id;
    let mut args: Vec<Argument> = Vec::with_capacity(operation.arity());
    args.push(Box::new(ctx));
    args.extend(positional);
    args.extend(payload);

    if args.len() != operation.arity() {
        return Err(DispatchError::ArityMismatch {
            expected: operation.arity(),
            supplied: args.len(),
        });
    }

    let descriptor = operation.descriptor();
    debug!(call_id, operation = %descriptor, inputs = args.len(), "invoking operation");
    let outputs = operation.call(args)?;
    extract(descriptor, outputs)
}

/// Picks the error or the value out of an output list.
///
/// An error in the error slot always wins over a value.
///
/// # Errors
///
/// Returns [`DispatchError::Operation`] carrying the operation's own error.
pub fn extract(
    descriptor: &OperationDescriptor,
    outputs: Outputs,
) -> Result<Option<ReturnValue>, DispatchError> {
    let mut slots: Vec<Option<Output>> = outputs.into_iter().map(Some).collect();

    if let Some(Output::Error(Some(err))) = take_slot(&mut slots, descriptor.error_position()) {
        return Err(DispatchError::Operation(err));
    }

    match take_slot(&mut slots, descriptor.value_position()) {
        Some(Output::Value(value)) => Ok(Some(value)),
        _ => Ok(None),
    }
}

fn take_slot(slots: &mut [Option<Output>], position: Option<usize>) -> Option<Output> {
    slots.get_mut(position?)?.take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Signature;
    use crate::output::OutputTag;

    fn descriptor(outputs: Vec<OutputTag>) -> OperationDescriptor {
        OperationDescriptor::build(
            "test",
            "op",
            Signature {
                positional: Vec::new(),
                payload: None,
                outputs,
            },
        )
        .unwrap()
    }

    #[test]
    fn value_is_returned_when_error_slot_is_empty() {
        let desc = descriptor(vec![OutputTag::Value, OutputTag::Error]);
        let outputs = vec![Output::Value(ReturnValue::new(3_i64)), Output::Error(None)];
        let value = extract(&desc, outputs).unwrap().unwrap();
        assert_eq!(value.downcast::<i64>().unwrap(), 3);
    }

    #[test]
    fn error_wins_over_value() {
        let desc = descriptor(vec![OutputTag::Value, OutputTag::Error]);
        let outputs = vec![
            Output::Value(ReturnValue::new(3_i64)),
            Output::Error(Some(anyhow::anyhow!("quota exceeded"))),
        ];
        let err = extract(&desc, outputs).unwrap_err();
        assert!(matches!(err, DispatchError::Operation(_)));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn no_value_slot_yields_none() {
        let desc = descriptor(vec![OutputTag::Error]);
        assert!(extract(&desc, vec![Output::Error(None)]).unwrap().is_none());

        let desc = descriptor(Vec::new());
        assert!(extract(&desc, Vec::new()).unwrap().is_none());
    }

    #[test]
    fn vacant_value_slot_yields_none() {
        let desc = descriptor(vec![OutputTag::Value]);
        assert!(extract(&desc, vec![Output::Vacant]).unwrap().is_none());
    }
}
