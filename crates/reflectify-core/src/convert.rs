//! Conversion traits between Rust types and [`Value`]s.
//!
//! - [`Reflect`]: the static [`Type`] of a Rust type
//! - [`FromValue`]: extract a Rust value from a [`Value`]
//! - [`IntoValue`]: convert a Rust value into a [`Value`]
//! - [`IntoResults`]: spread a return value over result slots
//!
//! ## Supported Types
//!
//! - Integers: `i8`..`i64`, `isize`, `u8`..`u64`, `usize` (bounds checked)
//! - Floats: `f32`, `f64`
//! - `bool`, `String`, `()`
//! - `Vec<T>`, `HashMap<String, T>`
//! - [`Value`] itself (declared as `Type::Any`), [`ErrorValue`]
//! - [`Ptr<T>`] for derived structs
//!
//! A `Result<T, E>` return occupies two slots: the value and an error.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::hash::BuildHasher;

use crate::{ConversionError, ErrorValue, IntWidth, Ptr, StaticStruct, Type, Value, ValueMap};

/// The static reflected type of a Rust type.
pub trait Reflect {
    fn reflect_type() -> Type;
}

/// Extract a value from a [`Value`].
pub trait FromValue: Sized {
    /// Returns a `ConversionError` if the value has an incompatible kind or
    /// does not fit.
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

/// Convert a value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// A return type spread over zero or more result slots.
pub trait IntoResults {
    /// Declared result types, one per slot.
    fn result_types() -> Vec<Type>;

    fn into_results(self) -> Vec<Value>;
}

/// Extract a derived struct held by value.
///
/// Used by generated [`FromValue`] impls.
pub fn struct_from_value<T: StaticStruct>(value: &Value) -> Result<T, ConversionError> {
    match value {
        Value::Struct(object) => object
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ConversionError::mismatch(T::static_info().name, object.struct_info().name)),
        other => Err(ConversionError::mismatch(
            T::static_info().name,
            other.type_name(),
        )),
    }
}

// ============================================================================
// Integer implementations
// ============================================================================

macro_rules! impl_int {
    ($($ty:ty => $variant:ident($width:ident)),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn reflect_type() -> Type {
                    Type::$variant(IntWidth::$width)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    let wide: i128 = match value {
                        Value::Int(v) => *v as i128,
                        Value::Uint(v) => *v as i128,
                        other => {
                            return Err(ConversionError::mismatch(
                                stringify!($ty),
                                other.type_name(),
                            ));
                        }
                    };
                    // Check bounds for narrowing conversions
                    <$ty>::try_from(wide).map_err(|_| ConversionError::IntegerOverflow {
                        value: wide,
                        target_type: stringify!($ty),
                    })
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self as _)
                }
            }
        )*
    };
}

impl_int!(
    i8 => Int(W8),
    i16 => Int(W16),
    i32 => Int(W32),
    i64 => Int(W64),
    isize => Int(Size),
    u8 => Uint(W8),
    u16 => Uint(W16),
    u32 => Uint(W32),
    u64 => Uint(W64),
    usize => Uint(Size),
);

// ============================================================================
// Float implementations
// ============================================================================

impl Reflect for f64 {
    fn reflect_type() -> Type {
        Type::Float
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            Value::Uint(v) => Ok(*v as f64),
            other => Err(ConversionError::mismatch("f64", other.type_name())),
        }
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl Reflect for f32 {
    fn reflect_type() -> Type {
        Type::Float
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self as f64)
    }
}

// ============================================================================
// Bool, String and unit
// ============================================================================

impl Reflect for bool {
    fn reflect_type() -> Type {
        Type::Bool
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => Err(ConversionError::mismatch("bool", other.type_name())),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl Reflect for String {
    fn reflect_type() -> Type {
        Type::String
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(ConversionError::mismatch("String", other.type_name())),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl Reflect for () {
    fn reflect_type() -> Type {
        Type::Unit
    }
}

impl FromValue for () {
    fn from_value(_value: &Value) -> Result<Self, ConversionError> {
        Ok(())
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Nil
    }
}

// ============================================================================
// Pass-through values
// ============================================================================

impl Reflect for Value {
    fn reflect_type() -> Type {
        Type::Any
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl Reflect for ErrorValue {
    fn reflect_type() -> Type {
        Type::Error
    }
}

impl FromValue for ErrorValue {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Error(error) => Ok(error.clone()),
            other => Err(ConversionError::mismatch("Error", other.type_name())),
        }
    }
}

impl IntoValue for ErrorValue {
    fn into_value(self) -> Value {
        Value::Error(self)
    }
}

// ============================================================================
// Collections
// ============================================================================

impl<T: Reflect> Reflect for Vec<T> {
    fn reflect_type() -> Type {
        Type::List(Box::new(T::reflect_type()))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(ConversionError::mismatch("Vec", other.type_name())),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: Reflect, S> Reflect for HashMap<String, T, S> {
    fn reflect_type() -> Type {
        Type::Map(Box::new(T::reflect_type()))
    }
}

impl<T: FromValue, S: BuildHasher + Default> FromValue for HashMap<String, T, S> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(key, item)| Ok((key.clone(), T::from_value(item)?)))
                .collect(),
            other => Err(ConversionError::mismatch("Map", other.type_name())),
        }
    }
}

impl<T: IntoValue, S> IntoValue for HashMap<String, T, S> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(key, item)| (key, item.into_value()))
                .collect::<ValueMap>(),
        )
    }
}

// ============================================================================
// Shared structs
// ============================================================================

impl<T: StaticStruct> Reflect for Ptr<T> {
    fn reflect_type() -> Type {
        Type::Pointer(T::static_info())
    }
}

impl<T: StaticStruct> FromValue for Ptr<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        let expected = || format!("Ptr<{}>", T::static_info().name);
        match value {
            Value::Pointer(pointer) => pointer.downcast::<T>().ok_or_else(|| {
                ConversionError::mismatch(expected(), pointer.struct_info().name)
            }),
            other => Err(ConversionError::mismatch(expected(), other.type_name())),
        }
    }
}

impl<T: StaticStruct> IntoValue for Ptr<T> {
    fn into_value(self) -> Value {
        Value::Pointer(self.to_object_ref())
    }
}

// ============================================================================
// Result slots
// ============================================================================

impl IntoResults for () {
    fn result_types() -> Vec<Type> {
        Vec::new()
    }

    fn into_results(self) -> Vec<Value> {
        Vec::new()
    }
}

macro_rules! impl_single_result {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoResults for $ty {
                fn result_types() -> Vec<Type> {
                    vec![<$ty as Reflect>::reflect_type()]
                }

                fn into_results(self) -> Vec<Value> {
                    vec![self.into_value()]
                }
            }
        )*
    };
}

impl_single_result!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String, Value, ErrorValue,
);

impl<T: Reflect + IntoValue> IntoResults for Vec<T> {
    fn result_types() -> Vec<Type> {
        vec![Self::reflect_type()]
    }

    fn into_results(self) -> Vec<Value> {
        vec![self.into_value()]
    }
}

impl<T: StaticStruct> IntoResults for Ptr<T> {
    fn result_types() -> Vec<Type> {
        vec![Self::reflect_type()]
    }

    fn into_results(self) -> Vec<Value> {
        vec![self.into_value()]
    }
}

/// `Ok(v)` yields `[v, Nil]`, `Err(e)` yields `[zero, Error(e)]`.
impl<T, E> IntoResults for Result<T, E>
where
    T: Reflect + IntoValue,
    E: StdError + 'static,
{
    fn result_types() -> Vec<Type> {
        vec![T::reflect_type(), Type::Error]
    }

    fn into_results(self) -> Vec<Value> {
        match self {
            Ok(value) => vec![value.into_value(), Value::Nil],
            Err(error) => vec![T::reflect_type().zero(), Value::error(error)],
        }
    }
}

macro_rules! impl_tuple_results {
    ($($name:ident),+) => {
        impl<$($name: Reflect + IntoValue),+> IntoResults for ($($name,)+) {
            fn result_types() -> Vec<Type> {
                vec![$($name::reflect_type()),+]
            }

            #[allow(non_snake_case)]
            fn into_results(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.into_value()),+]
            }
        }
    };
}

impl_tuple_results!(A, B);
impl_tuple_results!(A, B, C);
impl_tuple_results!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::Point;

    #[test]
    fn integer_bounds() {
        assert_eq!(i8::from_value(&Value::Int(127)), Ok(127));
        assert_eq!(
            i8::from_value(&Value::Int(128)),
            Err(ConversionError::IntegerOverflow {
                value: 128,
                target_type: "i8",
            })
        );
        assert!(u32::from_value(&Value::Int(-1)).is_err());
        assert_eq!(u64::from_value(&Value::Int(5)), Ok(5));
        assert_eq!(i64::from_value(&Value::Uint(5)), Ok(5));
        assert!(i64::from_value(&Value::Uint(u64::MAX)).is_err());
    }

    #[test]
    fn integer_kind_mismatch() {
        let err = i32::from_value(&Value::Str("1".into())).unwrap_err();
        assert_eq!(err, ConversionError::mismatch("i32", "string"));
    }

    #[test]
    fn reflected_integer_types() {
        assert_eq!(u8::reflect_type(), Type::Uint(IntWidth::W8));
        assert_eq!(isize::reflect_type(), Type::Int(IntWidth::Size));
        assert_eq!(7u16.into_value(), Value::Uint(7));
        assert_eq!((-7i16).into_value(), Value::Int(-7));
    }

    #[test]
    fn floats_accept_integers() {
        assert_eq!(f64::from_value(&Value::Int(2)), Ok(2.0));
        assert_eq!(f32::from_value(&Value::Float(0.5)), Ok(0.5));
    }

    #[test]
    fn vec_and_map() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(Vec::<i32>::from_value(&list), Ok(vec![1, 2]));
        assert!(Vec::<bool>::from_value(&list).is_err());

        let mut map = ValueMap::default();
        map.insert("a".into(), Value::Bool(true));
        let decoded: HashMap<String, bool> = HashMap::from_value(&Value::Map(map)).unwrap();
        assert_eq!(decoded.get("a"), Some(&true));
    }

    #[test]
    fn struct_by_value() {
        let point = Point {
            x: 2,
            label: "b".into(),
        };
        let value = point.clone().into_value();
        assert_eq!(Point::from_value(&value), Ok(point));
        assert!(Point::from_value(&Value::Int(1)).is_err());
    }

    #[test]
    fn pointer_conversion() {
        let ptr = Ptr::new(Point::default());
        let value = ptr.clone().into_value();
        let back = Ptr::<Point>::from_value(&value).unwrap();
        assert!(back.ptr_eq(&ptr));
        assert!(Ptr::<Point>::from_value(&Value::Nil).is_err());
        assert!(Ptr::<Point>::reflect_type().is_pointer());
    }

    #[test]
    fn result_slots() {
        assert!(<()>::result_types().is_empty());
        assert_eq!(
            <Result<String, std::fmt::Error>>::result_types(),
            vec![Type::String, Type::Error]
        );

        let ok: Result<String, std::fmt::Error> = Ok("done".into());
        assert_eq!(ok.into_results(), vec![Value::Str("done".into()), Value::Nil]);

        let err: Result<i32, std::fmt::Error> = Err(std::fmt::Error);
        let slots = err.into_results();
        assert_eq!(slots[0], Value::Int(0));
        assert!(slots[1].is_error());
    }

    #[test]
    fn tuple_slots() {
        assert_eq!(
            (1i64, true).into_results(),
            vec![Value::Int(1), Value::Bool(true)]
        );
        assert_eq!(<(i64, bool)>::result_types().len(), 2);
    }
}
