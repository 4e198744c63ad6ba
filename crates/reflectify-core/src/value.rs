//! Dynamic runtime values.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::{ConversionError, FromValue, Function, Object, ObjectRef, Ptr, StaticStruct};

/// String-keyed map of dynamic values, the source shape for weak decoding.
pub type ValueMap = FxHashMap<String, Value>;

/// A dynamic value.
///
/// Integers of every signed width are stored as `Int(i64)`, unsigned ones as
/// `Uint(u64)`. Structs are held by value; `Pointer` shares one instance.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent / nil. Also the "no raw argument" marker at call boundaries.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(ValueMap),
    Struct(Box<dyn Object>),
    Pointer(ObjectRef),
    Func(Function),
    /// An error carried as a value.
    Error(ErrorValue),
    /// Any other Rust value, passed through opaquely.
    Native(Rc<dyn Any>),
}

impl Value {
    /// Wrap an error as a value.
    pub fn error<E: StdError + 'static>(error: E) -> Self {
        Value::Error(ErrorValue::new(error))
    }

    /// Wrap any Rust value opaquely.
    pub fn native<T: Any>(value: T) -> Self {
        Value::Native(Rc::new(value))
    }

    /// Human-readable kind of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Pointer(_) => "pointer",
            Value::Func(_) => "func",
            Value::Error(_) => "error",
            Value::Native(_) => "native",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed view of an integer value, if it fits.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&dyn Object> {
        match self {
            Value::Struct(object) => Some(object.as_ref()),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&ObjectRef> {
        match self {
            Value::Pointer(pointer) => Some(pointer),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Function> {
        match self {
            Value::Func(function) => Some(function),
            _ => None,
        }
    }

    /// Convert into a Rust type.
    pub fn to<T: FromValue>(&self) -> Result<T, ConversionError> {
        T::from_value(self)
    }

    /// A copy of the struct behind this value, whether held by value or
    /// behind a pointer.
    pub fn struct_copy<T: StaticStruct>(&self) -> Option<T> {
        match self {
            Value::Struct(object) => object.downcast_ref::<T>().cloned(),
            Value::Pointer(pointer) => pointer
                .try_borrow()
                .ok()
                .and_then(|object| object.downcast_ref::<T>().cloned()),
            _ => None,
        }
    }

    /// The typed pointer behind a `Pointer` value.
    pub fn ptr<T: StaticStruct>(&self) -> Option<Ptr<T>> {
        self.as_pointer().and_then(ObjectRef::downcast::<T>)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(v) => write!(f, "Bool({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Uint(v) => write!(f, "Uint({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Struct(object) => write!(f, "Struct({:?})", object),
            Value::Pointer(pointer) => write!(f, "Pointer({:?})", pointer),
            Value::Func(function) => write!(f, "Func({})", function.full_name()),
            Value::Error(error) => write!(f, "Error({})", error),
            Value::Native(_) => write!(f, "Native(...)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => objects_equal(a.as_ref(), b.as_ref()),
            // Pointers compare by identity
            (Value::Pointer(a), Value::Pointer(b)) => a.ptr_eq(b),
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

fn objects_equal(a: &dyn Object, b: &dyn Object) -> bool {
    let info = a.struct_info();
    if !std::ptr::eq(info, b.struct_info()) {
        return false;
    }
    info.fields
        .iter()
        .all(|field| a.field(field.name) == b.field(field.name))
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_value_from!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    f32 => Float,
    f64 => Float,
    String => Str,
    &str => Str,
    Vec<Value> => List,
    ValueMap => Map,
    Function => Func,
    ErrorValue => Error,
    ObjectRef => Pointer,
);

impl<T: Object> From<Ptr<T>> for Value {
    fn from(ptr: Ptr<T>) -> Self {
        Value::Pointer(ptr.to_object_ref())
    }
}

/// An error carried inside a [`Value`].
///
/// Cheap to clone; clones share the same error.
#[derive(Clone)]
pub struct ErrorValue(Rc<dyn StdError + 'static>);

impl ErrorValue {
    pub fn new<E: StdError + 'static>(error: E) -> Self {
        ErrorValue(Rc::new(error))
    }

    /// An error that only carries a message.
    pub fn msg(message: impl Into<String>) -> Self {
        ErrorValue::new(MessageError(message.into()))
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn as_error(&self) -> &(dyn StdError + 'static) {
        self.0.as_ref()
    }

    pub fn ptr_eq(&self, other: &ErrorValue) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorValue({:?})", self.0)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for MessageError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::Point;

    #[test]
    fn type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Int(0).type_name(), "int");
        assert_eq!(Value::Uint(0).type_name(), "uint");
        assert_eq!(Value::Str(String::new()).type_name(), "string");
        assert_eq!(Value::error(std::fmt::Error).type_name(), "error");
    }

    #[test]
    fn default_is_nil() {
        assert!(Value::default().is_nil());
    }

    #[test]
    fn from_primitives() {
        assert_eq!(Value::from(3i32), Value::Int(3));
        assert_eq!(Value::from(3u8), Value::Uint(3));
        assert_eq!(Value::from("x"), Value::Str("x".into()));
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn structs_compare_by_fields() {
        let a = Value::Struct(Box::new(Point {
            x: 1,
            label: "a".into(),
        }));
        let b = a.clone();
        assert_eq!(a, b);

        let c = Value::Struct(Box::new(Point::default()));
        assert_ne!(a, c);
    }

    #[test]
    fn pointers_compare_by_identity() {
        let shared = ObjectRef::new(Point::default());
        let same = Value::Pointer(shared.clone());
        assert_eq!(Value::Pointer(shared), same);

        let other = Value::Pointer(ObjectRef::new(Point::default()));
        assert_ne!(same, other);
    }

    #[test]
    fn struct_copy_through_pointer() {
        let ptr = Ptr::new(Point {
            x: 5,
            label: "p".into(),
        });
        let value = Value::Pointer(ptr.to_object_ref());
        assert_eq!(value.struct_copy::<Point>().map(|p| p.x), Some(5));
        assert!(value.ptr::<Point>().is_some_and(|back| back.ptr_eq(&ptr)));
    }

    #[test]
    fn error_values() {
        let error = ErrorValue::msg("failed");
        assert_eq!(error.to_string(), "failed");

        let value = Value::Error(error.clone());
        assert!(value.is_error());
        assert!(value.as_error().is_some_and(|e| e.ptr_eq(&error)));

        let typed = ErrorValue::new(std::fmt::Error);
        assert!(typed.downcast_ref::<std::fmt::Error>().is_some());
    }

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", Value::Int(42)), "Int(42)");
        assert_eq!(format!("{:?}", Value::Str("t".into())), "Str(\"t\")");
        assert_eq!(format!("{:?}", Value::native(1u8)), "Native(...)");
    }
}
