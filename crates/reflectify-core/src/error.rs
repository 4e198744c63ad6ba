//! Error types for reflection, conversion and decoding.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ReflectError        - invocation and lookup failures the host cannot perform
//! └── ConversionError - a Value could not become the requested Rust type
//! DecodeErrors        - every field failure collected during a weak decode
//! └── DecodeError
//! ```
//!
//! Resolver-signaled errors are not part of this hierarchy. They travel as
//! ordinary values (`Value::Error`) and surface as a rejected invocation.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Conversion Errors
// ============================================================================

/// A dynamic value could not be converted into the requested Rust type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The value has a different kind than the target.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: String,
        /// The actual value kind.
        actual: String,
    },

    /// An integer does not fit in the target width.
    #[error("integer overflow: {value} doesn't fit in {target_type}")]
    IntegerOverflow {
        /// The value that overflowed.
        value: i128,
        /// The target type.
        target_type: &'static str,
    },

    /// A string could not be parsed as the target kind.
    #[error("cannot parse '{value}' as {target_type}")]
    Unparsable {
        /// The offending text.
        value: String,
        /// The target type.
        target_type: &'static str,
    },

    /// A struct has no field with the given name.
    #[error("unknown field '{field}' on type '{type_name}'")]
    UnknownField {
        /// The struct name.
        type_name: &'static str,
        /// The requested field.
        field: String,
    },

    /// A shared struct is already borrowed and cannot act as a receiver.
    #[error("value of type '{type_name}' is already borrowed")]
    AlreadyBorrowed {
        /// The struct name.
        type_name: &'static str,
    },
}

impl ConversionError {
    /// Shorthand for a [`ConversionError::TypeMismatch`].
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

// ============================================================================
// Reflection Errors
// ============================================================================

/// Failures of a lookup or invocation that cannot be carried out at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReflectError {
    /// The descriptor does not wrap a callable.
    #[error("'{name}' is a {kind}, not a callable")]
    NotCallable {
        /// Name of the descriptor.
        name: String,
        /// Kind that was found instead.
        kind: &'static str,
    },

    /// No method with the given name exists on the type.
    #[error("unknown method '{method}' on type '{type_name}'")]
    MethodNotFound {
        /// The type that was searched.
        type_name: String,
        /// The requested method.
        method: String,
    },

    /// A resolved argument does not fit the declared parameter.
    #[error("argument {index} of '{function}': {source}")]
    Argument {
        /// Position of the parameter.
        index: usize,
        /// Full name of the callable.
        function: String,
        /// The underlying conversion failure.
        #[source]
        source: ConversionError,
    },

    /// An argument slot was requested beyond the argument list.
    #[error("argument index {index} out of bounds ({count} arguments)")]
    ArgumentIndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of arguments available.
        count: usize,
    },

    /// A conversion failed outside of argument extraction.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

// ============================================================================
// Decode Errors
// ============================================================================

/// A single field that could not be populated during a weak decode.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("'{path}': {source}")]
pub struct DecodeError {
    /// Dotted path of the field, e.g. `profile.age`.
    pub path: String,
    /// Why the value was rejected.
    #[source]
    pub source: ConversionError,
}

/// All field failures of one weak decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeErrors {
    errors: Vec<DecodeError>,
}

impl DecodeErrors {
    /// Create an empty error list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure.
    pub fn push(&mut self, error: DecodeError) {
        self.errors.push(error);
    }

    /// Move every failure of `other` into this list.
    pub fn extend(&mut self, other: DecodeErrors) {
        self.errors.extend(other.errors);
    }

    /// Whether no failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the failures in field order.
    pub fn iter(&self) -> impl Iterator<Item = &DecodeError> {
        self.errors.iter()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), DecodeErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s) decoding:", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n* {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeErrors {}

impl IntoIterator for DecodeErrors {
    type Item = DecodeError;
    type IntoIter = std::vec::IntoIter<DecodeError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_error_display() {
        let err = ConversionError::mismatch("int", "string");
        assert_eq!(err.to_string(), "type mismatch: expected int, got string");

        let err = ConversionError::IntegerOverflow {
            value: 300,
            target_type: "u8",
        };
        assert_eq!(err.to_string(), "integer overflow: 300 doesn't fit in u8");
    }

    #[test]
    fn reflect_error_wraps_conversion() {
        let err: ReflectError = ConversionError::mismatch("bool", "int").into();
        assert!(matches!(err, ReflectError::Conversion(_)));
        // transparent keeps the inner message
        assert_eq!(err.to_string(), "type mismatch: expected bool, got int");
    }

    #[test]
    fn argument_error_display() {
        let err = ReflectError::Argument {
            index: 1,
            function: "app::greet".into(),
            source: ConversionError::mismatch("string", "int"),
        };
        assert_eq!(
            err.to_string(),
            "argument 1 of 'app::greet': type mismatch: expected string, got int"
        );
    }

    #[test]
    fn decode_errors_collect() {
        let mut errors = DecodeErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.push(DecodeError {
            path: "age".into(),
            source: ConversionError::Unparsable {
                value: "abc".into(),
                target_type: "int",
            },
        });
        assert_eq!(errors.len(), 1);

        let message = errors.to_string();
        assert!(message.starts_with("1 error(s) decoding:"));
        assert!(message.contains("'age': cannot parse 'abc' as int"));
        assert!(errors.into_result().is_err());
    }
}
