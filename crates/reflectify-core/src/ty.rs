//! Structural type descriptors.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::{StructInfo, TypeHash, Value, ValueMap};

/// Storage width of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    /// Pointer-sized (`isize` / `usize`).
    Size,
}

impl IntWidth {
    /// Whether `value` fits a signed integer of this width.
    pub fn fits_signed(self, value: i128) -> bool {
        let (min, max) = match self {
            IntWidth::W8 => (i8::MIN as i128, i8::MAX as i128),
            IntWidth::W16 => (i16::MIN as i128, i16::MAX as i128),
            IntWidth::W32 => (i32::MIN as i128, i32::MAX as i128),
            IntWidth::W64 => (i64::MIN as i128, i64::MAX as i128),
            IntWidth::Size => (isize::MIN as i128, isize::MAX as i128),
        };
        (min..=max).contains(&value)
    }

    /// Whether `value` fits an unsigned integer of this width.
    pub fn fits_unsigned(self, value: i128) -> bool {
        let max = match self {
            IntWidth::W8 => u8::MAX as i128,
            IntWidth::W16 => u16::MAX as i128,
            IntWidth::W32 => u32::MAX as i128,
            IntWidth::W64 => u64::MAX as i128,
            IntWidth::Size => usize::MAX as i128,
        };
        (0..=max).contains(&value)
    }
}

bitflags! {
    /// Classification bits derived from a [`Type`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u16 {
        /// Integer, text or boolean.
        const SCALAR = 1 << 0;
        const INTEGER = 1 << 1;
        const TEXT = 1 << 2;
        const BOOLEAN = 1 << 3;
        const FLOAT = 1 << 4;
        /// A struct, or a pointer to one.
        const STRUCT = 1 << 5;
        const POINTER = 1 << 6;
        const CALLABLE = 1 << 7;
        const COLLECTION = 1 << 8;
        const ERROR = 1 << 9;
    }
}

/// Parameter and result types of a callable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    params: Vec<Type>,
    results: Vec<Type>,
}

impl Signature {
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        Self { params, results }
    }

    /// Declared parameters in order.
    pub fn params(&self) -> &[Type] {
        &self.params
    }

    /// Declared results in order.
    pub fn results(&self) -> &[Type] {
        &self.results
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The same signature without its first parameter.
    pub fn without_first_param(&self) -> Signature {
        Signature {
            params: self.params.iter().skip(1).cloned().collect(),
            results: self.results.clone(),
        }
    }
}

/// The structural type of a reflected value.
///
/// Pointers always point at structs; the metadata of both is the same static
/// [`StructInfo`] table.
#[derive(Clone)]
pub enum Type {
    /// `()`, also the type of `Value::Nil`
    Unit,
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float,
    String,
    List(Box<Type>),
    /// String-keyed map
    Map(Box<Type>),
    Struct(&'static StructInfo),
    Pointer(&'static StructInfo),
    Func(Rc<Signature>),
    Error,
    /// Any value; conversions pass it through untouched
    Any,
}

impl Type {
    /// Infer the type of a dynamic value.
    ///
    /// Integer widths are not recoverable from a [`Value`], so integers report
    /// their widest form. Collections report `Any` elements.
    pub fn of_value(value: &Value) -> Type {
        match value {
            Value::Nil => Type::Unit,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int(IntWidth::W64),
            Value::Uint(_) => Type::Uint(IntWidth::W64),
            Value::Float(_) => Type::Float,
            Value::Str(_) => Type::String,
            Value::List(_) => Type::List(Box::new(Type::Any)),
            Value::Map(_) => Type::Map(Box::new(Type::Any)),
            Value::Struct(object) => Type::Struct(object.struct_info()),
            Value::Pointer(object) => Type::Pointer(object.struct_info()),
            Value::Func(function) => Type::Func(function.signature_rc()),
            Value::Error(_) => Type::Error,
            Value::Native(_) => Type::Any,
        }
    }

    /// Classification bits for this type.
    pub fn flags(&self) -> TypeFlags {
        match self {
            Type::Bool => TypeFlags::SCALAR | TypeFlags::BOOLEAN,
            Type::Int(_) | Type::Uint(_) => TypeFlags::SCALAR | TypeFlags::INTEGER,
            Type::String => TypeFlags::SCALAR | TypeFlags::TEXT,
            Type::Float => TypeFlags::FLOAT,
            Type::Struct(_) => TypeFlags::STRUCT,
            Type::Pointer(_) => TypeFlags::STRUCT | TypeFlags::POINTER,
            Type::Func(_) => TypeFlags::CALLABLE,
            Type::List(_) | Type::Map(_) => TypeFlags::COLLECTION,
            Type::Error => TypeFlags::ERROR,
            Type::Unit | Type::Any => TypeFlags::empty(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.flags().contains(TypeFlags::SCALAR)
    }

    /// True for structs and pointers to structs.
    pub fn is_struct(&self) -> bool {
        self.flags().contains(TypeFlags::STRUCT)
    }

    pub fn is_pointer(&self) -> bool {
        self.flags().contains(TypeFlags::POINTER)
    }

    pub fn is_callable(&self) -> bool {
        self.flags().contains(TypeFlags::CALLABLE)
    }

    /// Short kind label, e.g. `"int"` or `"pointer"`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::Unit => "unit",
            Type::Bool => "bool",
            Type::Int(_) => "int",
            Type::Uint(_) => "uint",
            Type::Float => "float",
            Type::String => "string",
            Type::List(_) => "list",
            Type::Map(_) => "map",
            Type::Struct(_) => "struct",
            Type::Pointer(_) => "pointer",
            Type::Func(_) => "func",
            Type::Error => "error",
            Type::Any => "any",
        }
    }

    /// Unqualified type name. Pointers report the name of their struct.
    pub fn name(&self) -> String {
        match self {
            Type::Unit => "()".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Int(width) => int_name("i", *width),
            Type::Uint(width) => int_name("u", *width),
            Type::Float => "f64".to_string(),
            Type::String => "String".to_string(),
            Type::List(elem) => format!("Vec<{}>", elem.name()),
            Type::Map(elem) => format!("Map<String, {}>", elem.name()),
            Type::Struct(info) | Type::Pointer(info) => info.name.to_string(),
            Type::Func(signature) => {
                let params: Vec<String> = signature.params().iter().map(Type::name).collect();
                format!("fn({})", params.join(", "))
            }
            Type::Error => "Error".to_string(),
            Type::Any => "Value".to_string(),
        }
    }

    /// Fully qualified name; only structs carry a module path.
    pub fn full_name(&self) -> String {
        match self {
            Type::Struct(info) | Type::Pointer(info) => info.full_name(),
            other => other.name(),
        }
    }

    /// Identity hash, pointer-sensitive.
    pub fn type_hash(&self) -> TypeHash {
        match self {
            Type::Struct(info) => info.type_hash(),
            Type::Pointer(info) => info.type_hash().pointer_to(),
            other => TypeHash::from_name(&other.name()),
        }
    }

    /// Struct metadata of a struct or pointer type.
    pub fn struct_info(&self) -> Option<&'static StructInfo> {
        match self {
            Type::Struct(info) | Type::Pointer(info) => Some(*info),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Type::Func(signature) => Some(signature.as_ref()),
            _ => None,
        }
    }

    /// A fresh zero value of this type.
    ///
    /// Pointer types yield a new, valid pointer to a zero struct.
    pub fn zero(&self) -> Value {
        match self {
            Type::Unit | Type::Func(_) | Type::Error | Type::Any => Value::Nil,
            Type::Bool => Value::Bool(false),
            Type::Int(_) => Value::Int(0),
            Type::Uint(_) => Value::Uint(0),
            Type::Float => Value::Float(0.0),
            Type::String => Value::Str(String::new()),
            Type::List(_) => Value::List(Vec::new()),
            Type::Map(_) => Value::Map(ValueMap::default()),
            Type::Struct(info) => Value::Struct((info.zero)()),
            Type::Pointer(info) => Value::Pointer((info.zero_ref)()),
        }
    }
}

fn int_name(prefix: &str, width: IntWidth) -> String {
    match width {
        IntWidth::W8 => format!("{prefix}8"),
        IntWidth::W16 => format!("{prefix}16"),
        IntWidth::W32 => format!("{prefix}32"),
        IntWidth::W64 => format!("{prefix}64"),
        IntWidth::Size => format!("{prefix}size"),
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Struct(a), Type::Struct(b)) | (Type::Pointer(a), Type::Pointer(b)) => {
                std::ptr::eq(*a, *b) || a.type_hash() == b.type_hash()
            }
            (Type::Int(a), Type::Int(b)) | (Type::Uint(a), Type::Uint(b)) => a == b,
            (Type::List(a), Type::List(b)) | (Type::Map(a), Type::Map(b)) => a == b,
            (Type::Func(a), Type::Func(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Pointer(info) => write!(f, "Pointer({})", info.name),
            Type::Struct(info) => write!(f, "Struct({})", info.name),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Pointer(info) => write!(f, "Ptr<{}>", info.name),
            other => write!(f, "{}", other.name()),
        }
    }
}
