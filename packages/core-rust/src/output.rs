//! Operation outputs: declared layouts, produced values, and the erased
//! return value handed back to callers.
//!
//! An operation's return type declares its output list through
//! [`IntoOutputs::layout`]. The layout is read once at registration to
//! compute the error and value positions; at call time the same type turns
//! the returned value into a list of [`Output`] slots matching that layout.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

/// Classification of a single output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTag {
    /// The slot carries the operation's returned value.
    Value,
    /// The slot carries an optional error.
    Error,
}

/// One slot of an operation's output list.
#[derive(Debug)]
pub enum Output {
    Value(ReturnValue),
    /// `None` means the operation succeeded.
    Error(Option<anyhow::Error>),
    /// Placeholder for a value slot that was not produced because the
    /// operation failed.
    Vacant,
}

/// The outputs of one invocation, in declaration order.
pub type Outputs = Vec<Output>;

// ---------------------------------------------------------------------------
// ReturnValue
// ---------------------------------------------------------------------------

type JsonFn = fn(&(dyn Any + Send)) -> serde_json::Result<serde_json::Value>;

/// Serializes `value` as a `T`; the pairing with `T` is fixed in
/// [`ReturnValue::new`].
fn json_of<T>(value: &(dyn Any + Send)) -> serde_json::Result<serde_json::Value>
where
    T: Serialize + 'static,
{
    match value.downcast_ref::<T>() {
        Some(value) => serde_json::to_value(value),
        None => Err(serde::ser::Error::custom(format!(
            "return value is not a {}",
            std::any::type_name::<T>()
        ))),
    }
}

/// Value returned by a successful call.
///
/// Keeps the concrete value so in-process callers can take it back with
/// [`ReturnValue::downcast`], and serializes it on demand for transports.
pub struct ReturnValue {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
    to_json: JsonFn,
}

impl ReturnValue {
    #[must_use]
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + 'static,
    {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
            to_json: json_of::<T>,
        }
    }

    /// Name of the concrete Rust type held.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrows the value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Takes the value out if it is a `T`, otherwise hands `self` back.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged when the held value is not a `T`.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        let Self {
            value,
            type_name,
            to_json,
        } = self;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                value,
                type_name,
                to_json,
            }),
        }
    }

    /// Serializes the value into a JSON tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the value's `Serialize` impl fails, e.g. a map
    /// with non-string keys.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        (self.to_json)(&*self.value)
    }

    /// Serializes the value into JSON text.
    ///
    /// # Errors
    ///
    /// See [`ReturnValue::to_json`].
    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.to_json()?)
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("ReturnValue");
        out.field("type", &self.type_name());
        match self.to_json() {
            Ok(json) => out.field("json", &json),
            Err(_) => out.field("json", &"<unserializable>"),
        };
        out.finish()
    }
}

// ---------------------------------------------------------------------------
// IntoOutputs
// ---------------------------------------------------------------------------

/// Return types an operation may have.
///
/// `layout` must describe exactly the slots `into_outputs` produces.
pub trait IntoOutputs {
    fn layout() -> Vec<OutputTag>;

    fn into_outputs(self) -> Outputs;
}

/// Marks a serializable return value that has no built-in [`IntoOutputs`]
/// impl, typically a user-defined struct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl IntoOutputs for () {
    fn layout() -> Vec<OutputTag> {
        Vec::new()
    }

    fn into_outputs(self) -> Outputs {
        Vec::new()
    }
}

fn single_value<T>(value: T) -> Outputs
where
    T: Serialize + Send + 'static,
{
    vec![Output::Value(ReturnValue::new(value))]
}

macro_rules! value_outputs {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoOutputs for $ty {
                fn layout() -> Vec<OutputTag> {
                    vec![OutputTag::Value]
                }

                fn into_outputs(self) -> Outputs {
                    single_value(self)
                }
            }
        )*
    };
}

value_outputs!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    serde_json::Value,
);

impl<T> IntoOutputs for Json<T>
where
    T: Serialize + Send + 'static,
{
    fn layout() -> Vec<OutputTag> {
        vec![OutputTag::Value]
    }

    fn into_outputs(self) -> Outputs {
        single_value(self.0)
    }
}

impl<T> IntoOutputs for Vec<T>
where
    T: Serialize + Send + 'static,
{
    fn layout() -> Vec<OutputTag> {
        vec![OutputTag::Value]
    }

    fn into_outputs(self) -> Outputs {
        single_value(self)
    }
}

impl<T> IntoOutputs for Option<T>
where
    T: Serialize + Send + 'static,
{
    fn layout() -> Vec<OutputTag> {
        vec![OutputTag::Value]
    }

    fn into_outputs(self) -> Outputs {
        single_value(self)
    }
}

impl<V> IntoOutputs for BTreeMap<String, V>
where
    V: Serialize + Send + 'static,
{
    fn layout() -> Vec<OutputTag> {
        vec![OutputTag::Value]
    }

    fn into_outputs(self) -> Outputs {
        single_value(self)
    }
}

impl<V> IntoOutputs for HashMap<String, V>
where
    V: Serialize + Send + 'static,
{
    fn layout() -> Vec<OutputTag> {
        vec![OutputTag::Value]
    }

    fn into_outputs(self) -> Outputs {
        single_value(self)
    }
}

/// `Ok` outputs followed by one error slot.
impl<T, E> IntoOutputs for Result<T, E>
where
    T: IntoOutputs,
    E: Into<anyhow::Error>,
{
    fn layout() -> Vec<OutputTag> {
        let mut layout = T::layout();
        layout.push(OutputTag::Error);
        layout
    }

    fn into_outputs(self) -> Outputs {
        match self {
            Ok(value) => {
                let mut outputs = value.into_outputs();
                outputs.push(Output::Error(None));
                outputs
            }
            Err(err) => {
                let mut outputs: Outputs = T::layout().iter().map(|_| Output::Vacant).collect();
                outputs.push(Output::Error(Some(err.into())));
                outputs
            }
        }
    }
}

macro_rules! tuple_outputs {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty),+> IntoOutputs for ($($ty,)+)
        where
            $($ty: IntoOutputs,)+
        {
            fn layout() -> Vec<OutputTag> {
                let mut layout = Vec::new();
                $(layout.extend($ty::layout());)+
                layout
            }

            fn into_outputs(self) -> Outputs {
                let ($($var,)+) = self;
                let mut outputs = Vec::new();
                $(outputs.extend($var.into_outputs());)+
                outputs
            }
        }
    };
}

tuple_outputs!(A a, B b);
tuple_outputs!(A a, B b, C c);
tuple_outputs!(A a, B b, C c, D d);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, PartialEq)]
    struct Profile {
        name: String,
    }

    #[test]
    fn unit_declares_no_outputs() {
        assert!(<()>::layout().is_empty());
        assert!(().into_outputs().is_empty());
    }

    #[test]
    fn result_appends_error_slot() {
        assert_eq!(
            <Result<i64, std::io::Error>>::layout(),
            vec![OutputTag::Value, OutputTag::Error]
        );
        assert_eq!(
            <Result<(), std::io::Error>>::layout(),
            vec![OutputTag::Error]
        );
    }

    #[test]
    fn failed_result_leaves_value_slot_vacant() {
        let failed: Result<i64, anyhow::Error> = Err(anyhow::anyhow!("boom"));
        let outputs = failed.into_outputs();
        assert_eq!(outputs.len(), 2);
        assert!(matches!(outputs[0], Output::Vacant));
        assert!(matches!(&outputs[1], Output::Error(Some(e)) if e.to_string() == "boom"));
    }

    #[test]
    fn tuples_concatenate_layouts() {
        assert_eq!(
            <(String, Result<(), anyhow::Error>)>::layout(),
            vec![OutputTag::Value, OutputTag::Error]
        );
        assert_eq!(
            <(i64, String)>::layout(),
            vec![OutputTag::Value, OutputTag::Value]
        );
    }

    #[test]
    fn return_value_downcasts_to_original_type() {
        let value = ReturnValue::new(42_i64);
        assert_eq!(value.downcast_ref::<i64>(), Some(&42));
        let value = value.downcast::<String>().unwrap_err();
        assert_eq!(value.downcast::<i64>().unwrap(), 42);
    }

    #[test]
    fn failed_downcast_returns_usable_value() {
        let value = ReturnValue::new(vec![1_u8, 2]);
        let value = value.downcast::<i64>().unwrap_err();
        assert_eq!(value.type_name(), std::any::type_name::<Vec<u8>>());
        assert_eq!(value.to_json().unwrap(), serde_json::json!([1, 2]));
        assert_eq!(value.downcast::<Vec<u8>>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn json_wrapper_holds_inner_type() {
        let outputs = Json(Profile {
            name: "daniel".to_string(),
        })
        .into_outputs();
        let Some(Output::Value(value)) = outputs.into_iter().next() else {
            panic!("expected a value slot");
        };
        assert_eq!(
            value.to_json().unwrap(),
            serde_json::json!({ "name": "daniel" })
        );
        assert_eq!(
            value.downcast::<Profile>().unwrap(),
            Profile {
                name: "daniel".to_string()
            }
        );
    }

    #[test]
    fn to_json_vec_encodes_text() {
        let value = ReturnValue::new("galvez".to_string());
        assert_eq!(value.to_json_vec().unwrap(), b"\"galvez\"".to_vec());
    }
}
