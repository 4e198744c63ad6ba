//! Parameter resolvers.
//!
//! A resolver sees the descriptor of one declared parameter (a zero instance
//! of the parameter type) together with the next unconsumed raw argument,
//! and either declines or supplies the value. The first resolver that does
//! not decline wins.

use std::fmt;
use std::rc::Rc;

use reflectify_core::{Mapper, Type, Value};
use tracing::trace;

use crate::Reflection;

/// A resolver callback: `(parameter, raw argument) -> resolution`.
pub type ParamResolver = Rc<dyn Fn(&mut Reflection, Option<&Value>) -> Resolution>;

/// Outcome of consulting one resolver.
#[derive(Clone, PartialEq)]
pub enum Resolution {
    /// This resolver does not handle the parameter.
    Declined,
    /// The parameter takes `value`. With `consumed` set the raw argument that
    /// was offered is used up, otherwise the next parameter sees it again.
    Resolved { value: Value, consumed: bool },
}

impl Resolution {
    /// Supply `value` and consume the raw argument.
    pub fn take(value: impl Into<Value>) -> Self {
        Resolution::Resolved {
            value: value.into(),
            consumed: true,
        }
    }

    /// Supply `value` and leave the raw argument for the next parameter.
    pub fn provide(value: impl Into<Value>) -> Self {
        Resolution::Resolved {
            value: value.into(),
            consumed: false,
        }
    }

    /// Reject the invocation with `error`; the callable will not run.
    pub fn reject<E: std::error::Error + 'static>(error: E) -> Self {
        Resolution::Resolved {
            value: Value::error(error),
            consumed: true,
        }
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, Resolution::Declined)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Declined => write!(f, "Declined"),
            Resolution::Resolved { value, consumed } => f
                .debug_struct("Resolved")
                .field("value", value)
                .field("consumed", consumed)
                .finish(),
        }
    }
}

/// The resolver consulted after every user resolver.
///
/// Starts from a zero instance of the parameter. A present raw argument is
/// coerced through [`Mapper`] when the parameter is scalar and passed through
/// otherwise. Always consumes.
pub fn fallback() -> ParamResolver {
    Rc::new(|param: &mut Reflection, raw: Option<&Value>| {
        let zero = param.new_instance();
        let value = match raw {
            None | Some(Value::Nil) => zero,
            Some(raw) => coerce(param.ty(), raw),
        };
        trace!(param = %param.ty(), from = raw.map_or("none", |v| v.type_name()), "fallback resolved parameter");
        Resolution::take(value)
    })
}

/// Coerce a raw argument toward a scalar parameter type.
///
/// Integers outside the parameter's width read as 0, like unparsable text.
fn coerce(ty: &Type, raw: &Value) -> Value {
    let mapper = Mapper::new(raw);
    match ty {
        Type::Int(width) => {
            let wide = mapper.as_wide_integer();
            let value = Some(wide)
                .filter(|v| width.fits_signed(*v))
                .and_then(|v| i64::try_from(v).ok());
            Value::Int(value.unwrap_or(0))
        }
        Type::Uint(width) => {
            let wide = mapper.as_wide_integer();
            let value = Some(wide)
                .filter(|v| width.fits_unsigned(*v))
                .and_then(|v| u64::try_from(v).ok());
            Value::Uint(value.unwrap_or(0))
        }
        Type::String => Value::Str(mapper.as_text()),
        Type::Bool => Value::Bool(mapper.as_boolean()),
        _ => raw.clone(),
    }
}
