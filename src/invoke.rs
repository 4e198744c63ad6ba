//! Invocation through the resolver chain.

use tracing::{debug, trace};

use reflectify_core::{ErrorValue, Function, ReflectError, Value};

use crate::Reflection;
use crate::resolver::Resolution;

/// Outcome of an invocation that could be carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// The callable ran and produced these results.
    Returned(Vec<Value>),
    /// A resolver supplied an error for a parameter; the callable did not run.
    Rejected(ErrorValue),
}

impl Invocation {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Invocation::Rejected(_))
    }

    /// The results, if the callable ran.
    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Invocation::Returned(values) => Some(values),
            Invocation::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorValue> {
        match self {
            Invocation::Rejected(error) => Some(error),
            Invocation::Returned(_) => None,
        }
    }

    /// Flatten into result slots. A rejection reads `[Nil, Error]`.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Invocation::Returned(values) => values,
            Invocation::Rejected(error) => vec![Value::Nil, Value::Error(error)],
        }
    }
}

/// Parameters produced by the resolver chain.
enum Resolved {
    Params(Vec<Value>),
    Rejected(ErrorValue),
}

impl Reflection {
    /// Invoke the described callable with `args` as raw arguments.
    ///
    /// Every declared parameter is resolved through the chain, so fewer raw
    /// arguments than parameters is fine. A resolver that supplies an error
    /// value rejects the invocation before the callable runs.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call(&self, args: &[Value]) -> Result<Invocation, ReflectError> {
        let Value::Func(function) = &self.value else {
            return Err(ReflectError::NotCallable {
                name: self.name(),
                kind: self.kind_name(),
            });
        };

        match self.resolve_params(function, args) {
            Resolved::Rejected(error) => {
                debug!(function = function.full_name(), %error, "invocation rejected by resolver");
                Ok(Invocation::Rejected(error))
            }
            Resolved::Params(params) => {
                trace!(function = function.full_name(), params = params.len(), "invoking");
                function.call(&params).map(Invocation::Returned)
            }
        }
    }

    /// Invoke the named method of the element.
    ///
    /// A callable is invoked directly whatever the name. The method inherits
    /// this descriptor's resolver chain and fallback.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Invocation, ReflectError> {
        if self.is_callable() {
            return self.call(args);
        }

        let mut method = self
            .method_by_name(name)
            .ok_or_else(|| ReflectError::MethodNotFound {
                type_name: self.full_name(),
                method: name.to_string(),
            })?;
        method.resolvers = self.resolvers.clone();
        method.fallback = self.fallback.clone();
        method.call(args)
    }

    fn resolve_params(&self, function: &Function, args: &[Value]) -> Resolved {
        let has_receiver = self.has_receiver();
        let mut cursor = 0;
        let mut params = Vec::with_capacity(function.params().len());

        for (index, ty) in function.params().iter().enumerate() {
            let mut param = Reflection::of_type(ty.clone());
            param.is_receiver = index == 0 && has_receiver;

            let raw = args.get(cursor);
            let resolution = self
                .chain()
                .map(|resolver| resolver(&mut param, raw))
                .find(|resolution| !resolution.is_declined());

            let value = match resolution {
                Some(Resolution::Resolved { value, consumed }) => {
                    trace!(index, consumed, "parameter resolved");
                    if consumed && raw.is_some() {
                        cursor += 1;
                    }
                    value
                }
                // Nobody resolved it: the peeked argument stays at the head
                _ => match raw {
                    Some(raw) => {
                        trace!(index, "parameter passed through");
                        raw.clone()
                    }
                    None => param.element,
                },
            };
            params.push(value);
        }

        match params.iter().find_map(Value::as_error) {
            Some(error) => Resolved::Rejected(error.clone()),
            None => Resolved::Params(params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect_fn;

    #[test]
    fn rejected_flattens_to_two_slots() {
        let error = ErrorValue::msg("failed");
        let slots = Invocation::Rejected(error.clone()).into_values();
        assert_eq!(slots.len(), 2);
        assert!(slots[0].is_nil());
        assert_eq!(slots[1], Value::Error(error));
    }

    #[test]
    fn returned_keeps_results() {
        let invocation = Invocation::Returned(vec![Value::Int(1)]);
        assert!(!invocation.is_rejected());
        assert_eq!(invocation.values(), Some(&[Value::Int(1)][..]));
        assert!(invocation.error().is_none());
    }

    #[test]
    fn calling_a_non_callable_fails() {
        let refl = crate::reflect(3i64);
        assert!(matches!(
            refl.call(&[]),
            Err(ReflectError::NotCallable { kind: "int", .. })
        ));
    }

    #[test]
    fn missing_arguments_become_zero() {
        let refl = reflect_fn(|a: i64, b: String, c: bool| format!("{a}{b}{c}"));
        let out = refl.call(&[]).unwrap();
        assert_eq!(out.into_values(), vec![Value::from("0false")]);
    }

    #[test]
    fn passthrough_without_fallback() {
        let mut refl = reflect_fn(|a: String| a);
        refl.set_fallback(None);
        let out = refl.call(&[Value::from("x")]).unwrap();
        assert_eq!(out.into_values(), vec![Value::from("x")]);
    }

    #[test]
    fn passthrough_does_not_pop_the_argument() {
        let mut refl = reflect_fn(|a: String, b: String| format!("{a}-{b}"));
        refl.set_fallback(None);
        let out = refl.call(&[Value::from("x"), Value::from("y")]).unwrap();
        assert_eq!(out.into_values(), vec![Value::from("x-x")]);
    }

    #[test]
    fn consumed_argument_advances_past_passthrough() {
        let mut refl = reflect_fn(|a: i64, b: String, c: String| format!("{a}:{b}:{c}"));
        refl.set_fallback(None);
        refl.add_resolver(|param, raw| match (param.ty().kind_name(), raw) {
            ("int", Some(raw)) => Resolution::take(raw.clone()),
            _ => Resolution::Declined,
        });
        let out = refl.call(&[Value::Int(1), Value::from("s")]).unwrap();
        assert_eq!(out.into_values(), vec![Value::from("1:s:s")]);
    }

    #[test]
    fn passthrough_does_not_coerce() {
        let mut refl = reflect_fn(|a: i64| a);
        refl.set_fallback(None);
        let err = refl.call(&[Value::from("1")]).unwrap_err();
        assert!(matches!(err, ReflectError::Argument { index: 0, .. }));
    }

    #[test]
    fn unconsumed_argument_moves_to_next_parameter() {
        let mut refl = reflect_fn(|a: String, b: i64| format!("{a}:{b}"));
        refl.add_resolver(|param, _raw| {
            if param.is_scalar() && param.ty().kind_name() == "string" {
                Resolution::provide("fixed")
            } else {
                Resolution::Declined
            }
        });
        let out = refl.call(&[Value::Int(9)]).unwrap();
        assert_eq!(out.into_values(), vec![Value::from("fixed:9")]);
    }
}
