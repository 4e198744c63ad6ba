//! Total coercion between the primitive kinds.
//!
//! A [`Mapper`] classifies one value as a [`Primitive`] and converts it to text,
//! integer or boolean. None of the conversions fail; values that cannot be
//! read fall back to the zero of the target kind.
//!
//! Integers are held as `i128` so every `Int` and `Uint` value survives
//! classification unchanged.

use crate::Value;

/// The primitive view of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive<'a> {
    Integer(i128),
    Text(&'a str),
    Boolean(bool),
    /// Anything that is not a primitive.
    Other,
}

impl<'a> Primitive<'a> {
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Int(v) => Primitive::Integer(i128::from(*v)),
            Value::Uint(v) => Primitive::Integer(i128::from(*v)),
            Value::Str(s) => Primitive::Text(s),
            Value::Bool(b) => Primitive::Boolean(*b),
            _ => Primitive::Other,
        }
    }
}

/// Coerces one value between text, integer and boolean.
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'a> {
    primitive: Primitive<'a>,
}

impl<'a> Mapper<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self {
            primitive: Primitive::of(value),
        }
    }

    pub fn primitive(&self) -> Primitive<'a> {
        self.primitive
    }

    /// Base-10 digits for integers, `"true"`/`"false"` for booleans.
    pub fn as_text(&self) -> String {
        match self.primitive {
            Primitive::Integer(v) => v.to_string(),
            Primitive::Text(s) => s.to_string(),
            Primitive::Boolean(b) => b.to_string(),
            Primitive::Other => String::new(),
        }
    }

    /// Unparsable text maps to 0. Unsigned values above `i64::MAX` saturate;
    /// see [`Mapper::as_wide_integer`] for the exact value.
    pub fn as_integer(&self) -> i64 {
        match self.primitive {
            Primitive::Integer(v) => i64::try_from(v).unwrap_or(i64::MAX),
            Primitive::Text(s) => s.parse::<i64>().unwrap_or(0),
            Primitive::Boolean(b) => i64::from(b),
            Primitive::Other => 0,
        }
    }

    /// Like [`Mapper::as_integer`] but wide enough for every `i64` and `u64`.
    pub fn as_wide_integer(&self) -> i128 {
        match self.primitive {
            Primitive::Integer(v) => v,
            Primitive::Text(s) => s.parse::<i128>().unwrap_or(0),
            Primitive::Boolean(b) => i128::from(b),
            Primitive::Other => 0,
        }
    }

    /// Integers are true when strictly positive. Text is read as a boolean
    /// literal when it is one, otherwise it is true when non-empty.
    pub fn as_boolean(&self) -> bool {
        match self.primitive {
            Primitive::Integer(v) => v > 0,
            Primitive::Text(s) => parse_bool(s).unwrap_or(!s.is_empty()),
            Primitive::Boolean(b) => b,
            Primitive::Other => false,
        }
    }
}

/// The boolean literals accepted in text.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
