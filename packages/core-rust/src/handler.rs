//! Typed handlers: functions and methods that can be bound as operations.
//!
//! A handler is any `Fn(&R, &CallContext, A1, .., An) -> Out` (positional
//! only) or `Fn(&R, &CallContext, A1, .., An, P) -> Out` (with payload).
//! The marker types [`Positional`] and [`WithPayload`] select which of the
//! two conventions a handler is bound under, so the same function shape can
//! be declared either way.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::context::CallContext;
use crate::descriptor::{ArgDecoder, Argument, PayloadDecoder, Signature};
use crate::error::DispatchError;
use crate::output::{IntoOutputs, Outputs};

/// Marker: all parameters after the context are positional.
pub struct Positional<T>(PhantomData<fn() -> T>);

/// Marker: the last parameter is decoded from the request body.
pub struct WithPayload<T, P>(PhantomData<fn() -> (T, P)>);

/// A callable that can be bound as an operation of resource `R`.
pub trait Handler<R, M>: Send + Sync + 'static {
    /// Parameter and output shape, read once at registration.
    fn signature() -> Signature;

    /// Calls the handler with an assembled argument list whose first entry
    /// is the [`CallContext`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ArityMismatch`] or
    /// [`DispatchError::ArgumentType`] when the list does not match the
    /// handler's parameters.
    fn invoke(&self, instance: &R, args: Vec<Argument>) -> Result<Outputs, DispatchError>;
}

/// Takes the next assembled argument back as a `T`.
fn take<T: 'static>(
    args: &mut std::vec::IntoIter<Argument>,
    index: usize,
    arity: usize,
) -> Result<T, DispatchError> {
    let arg = args.next().ok_or(DispatchError::ArityMismatch {
        expected: arity,
        supplied: index,
    })?;
    arg.downcast::<T>()
        .map(|value| *value)
        .map_err(|_| DispatchError::ArgumentType {
            index,
            expected: std::any::type_name::<T>(),
        })
}

fn check_arity(args: &[Argument], arity: usize) -> Result<(), DispatchError> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(DispatchError::ArityMismatch {
            expected: arity,
            supplied: args.len(),
        })
    }
}

macro_rules! count {
    () => (0usize);
    ($head:ident $($tail:ident)*) => (1usize + count!($($tail)*));
}

macro_rules! impl_positional_handler {
    ($($ty:ident $var:ident),*) => {
        impl<R, F, Out, $($ty,)*> Handler<R, Positional<($($ty,)*)>> for F
        where
            R: Send + Sync + 'static,
            F: Fn(&R, &CallContext, $($ty,)*) -> Out + Send + Sync + 'static,
            Out: IntoOutputs,
            $($ty: DeserializeOwned + Send + 'static,)*
        {
            fn signature() -> Signature {
                Signature {
                    positional: vec![$(ArgDecoder::of::<$ty>(),)*],
                    payload: None,
                    outputs: Out::layout(),
                }
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn invoke(&self, instance: &R, args: Vec<Argument>) -> Result<Outputs, DispatchError> {
                let arity = 1 + count!($($ty)*);
                check_arity(&args, arity)?;
                let mut args = args.into_iter();
                let mut index = 0;
                let ctx: CallContext = take(&mut args, index, arity)?;
                $(
                    index += 1;
                    let $var: $ty = take(&mut args, index, arity)?;
                )*
                Ok((self)(instance, &ctx, $($var,)*).into_outputs())
            }
        }
    };
}

macro_rules! impl_payload_handler {
    ($($ty:ident $var:ident),*) => {
        impl<R, F, Out, $($ty,)* P> Handler<R, WithPayload<($($ty,)*), P>> for F
        where
            R: Send + Sync + 'static,
            F: Fn(&R, &CallContext, $($ty,)* P) -> Out + Send + Sync + 'static,
            Out: IntoOutputs,
            $($ty: DeserializeOwned + Send + 'static,)*
            P: DeserializeOwned + Default + Send + 'static,
        {
            fn signature() -> Signature {
                Signature {
                    positional: vec![$(ArgDecoder::of::<$ty>(),)*],
                    payload: Some(PayloadDecoder::of::<P>()),
                    outputs: Out::layout(),
                }
            }

            #[allow(unused_mut)]
            fn invoke(&self, instance: &R, args: Vec<Argument>) -> Result<Outputs, DispatchError> {
                let arity = 2 + count!($($ty)*);
                check_arity(&args, arity)?;
                let mut args = args.into_iter();
                let mut index = 0;
                let ctx: CallContext = take(&mut args, index, arity)?;
                $(
                    index += 1;
                    let $var: $ty = take(&mut args, index, arity)?;
                )*
                index += 1;
                let payload: P = take(&mut args, index, arity)?;
                Ok((self)(instance, &ctx, $($var,)* payload).into_outputs())
            }
        }
    };
}

impl_positional_handler!();
impl_positional_handler!(A1 a1);
impl_positional_handler!(A1 a1, A2 a2);
impl_positional_handler!(A1 a1, A2 a2, A3 a3);
impl_positional_handler!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_positional_handler!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_positional_handler!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);

impl_payload_handler!();
impl_payload_handler!(A1 a1);
impl_payload_handler!(A1 a1, A2 a2);
impl_payload_handler!(A1 a1, A2 a2, A3 a3);
impl_payload_handler!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_payload_handler!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;

    struct Calculator;

    impl Calculator {
        fn add(&self, _ctx: &CallContext, a: i64, b: i64) -> i64 {
            a + b
        }

        fn sum(&self, _ctx: &CallContext, values: Vec<i64>) -> i64 {
            values.iter().sum()
        }
    }

    fn ctx() -> CallContext {
        CallContext::new(1, "calculator", "add")
    }

    fn value_of(outputs: Outputs) -> i64 {
        match outputs.into_iter().next() {
            Some(Output::Value(v)) => v.downcast::<i64>().unwrap(),
            other => panic!("expected value output, got {other:?}"),
        }
    }

    #[test]
    fn positional_signature_lists_all_parameters() {
        let sig = <fn(&Calculator, &CallContext, i64, i64) -> i64 as Handler<
            Calculator,
            Positional<(i64, i64)>,
        >>::signature();
        assert_eq!(sig.positional.len(), 2);
        assert!(sig.payload.is_none());
        assert_eq!(sig.arity(), 3);
    }

    #[test]
    fn positional_invoke_passes_arguments_in_order() {
        let handler = Calculator::add;
        let args: Vec<Argument> = vec![Box::new(ctx()), Box::new(2_i64), Box::new(40_i64)];
        let outputs = Handler::<Calculator, Positional<(i64, i64)>>::invoke(&handler, &Calculator, args)
            .unwrap();
        assert_eq!(value_of(outputs), 42);
    }

    #[test]
    fn payload_signature_moves_last_parameter_to_body() {
        let sig = <fn(&Calculator, &CallContext, Vec<i64>) -> i64 as Handler<
            Calculator,
            WithPayload<(), Vec<i64>>,
        >>::signature();
        assert!(sig.positional.is_empty());
        assert!(sig.payload.is_some());
        assert_eq!(sig.arity(), 2);
    }

    #[test]
    fn payload_invoke_receives_body_value() {
        let handler = Calculator::sum;
        let args: Vec<Argument> = vec![Box::new(ctx()), Box::new(vec![1_i64, 2, 3, 4])];
        let outputs =
            Handler::<Calculator, WithPayload<(), Vec<i64>>>::invoke(&handler, &Calculator, args)
                .unwrap();
        assert_eq!(value_of(outputs), 10);
    }

    #[test]
    fn wrong_argument_count_is_arity_mismatch() {
        let handler = Calculator::add;
        let args: Vec<Argument> = vec![Box::new(ctx()), Box::new(2_i64)];
        let err = Handler::<Calculator, Positional<(i64, i64)>>::invoke(&handler, &Calculator, args)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ArityMismatch {
                expected: 3,
                supplied: 2
            }
        ));
    }

    #[test]
    fn wrong_argument_type_is_reported() {
        let handler = Calculator::add;
        let args: Vec<Argument> = vec![
            Box::new(ctx()),
            Box::new("two".to_string()),
            Box::new(40_i64),
        ];
        let err = Handler::<Calculator, Positional<(i64, i64)>>::invoke(&handler, &Calculator, args)
            .unwrap_err();
        assert!(matches!(err, DispatchError::ArgumentType { index: 1, .. }));
    }
}
