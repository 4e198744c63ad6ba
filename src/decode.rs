//! Weak decoding of string-keyed maps into reflected structs.
//!
//! Keys are matched against each field's decode key, exactly first and then
//! case-insensitively. Values are coerced loosely toward the field type:
//!
//! | field        | accepts                                                   |
//! |--------------|-----------------------------------------------------------|
//! | bool         | bool, numbers (non-zero is true), boolean literals, `""`  |
//! | int / uint   | numbers (floats truncate), bool as 1/0, base-10 text      |
//! | float        | numbers, bool as 1/0, decimal text                        |
//! | string       | text, bool as `"1"`/`"0"`, numbers                        |
//! | list         | lists element-wise, any other value as a single element   |
//! | map          | maps value-wise                                           |
//! | struct / ptr | maps (decoded recursively), values of the same struct     |
//!
//! Unknown keys are ignored and unmatched fields keep their value. Decoding
//! carries on past failures and reports all of them at the end.

use reflectify_core::mapper::parse_bool;
use reflectify_core::{
    ConversionError, DecodeError, DecodeErrors, Object, StructInfo, Type, Value, ValueMap,
};

/// Populate `target` from `source`.
///
/// Fields are written as they decode, so on `Err` the target holds every
/// field that succeeded.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn weak_decode(source: &ValueMap, target: &mut dyn Object) -> Result<(), DecodeErrors> {
    let mut errors = DecodeErrors::new();
    decode_object(source, target, "", &mut errors);
    errors.into_result()
}

fn decode_object(source: &ValueMap, target: &mut dyn Object, prefix: &str, errors: &mut DecodeErrors) {
    let info = target.struct_info();
    for field in info.fields {
        let Some(raw) = lookup(source, field.key) else {
            continue;
        };
        if raw.is_nil() {
            continue;
        }

        let path = join_path(prefix, field.key);
        let Some(value) = coerce(raw, &field.ty(), &path, errors) else {
            continue;
        };
        if let Err(source) = target.set_field(field.name, &value) {
            errors.push(DecodeError { path, source });
        }
    }
}

/// Exact key first. Among keys that only match case-insensitively the
/// smallest one wins, so the choice does not depend on map order.
fn lookup<'a>(source: &'a ValueMap, key: &str) -> Option<&'a Value> {
    source.get(key).or_else(|| {
        let folded = key.to_lowercase();
        source
            .iter()
            .filter(|(candidate, _)| candidate.to_lowercase() == folded)
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, value)| value)
    })
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Coerce `raw` toward `ty`, recording failures under `path`.
fn coerce(raw: &Value, ty: &Type, path: &str, errors: &mut DecodeErrors) -> Option<Value> {
    let result = match ty {
        Type::Bool => to_bool(raw),
        Type::Int(_) | Type::Uint(_) => to_integer(raw),
        Type::Float => to_float(raw),
        Type::String => to_text(raw),
        Type::List(elem) => return Some(to_list(raw, elem, path, errors)),
        Type::Map(elem) => match raw {
            Value::Map(map) => {
                let mut out = ValueMap::default();
                for (key, item) in map {
                    if let Some(value) = coerce(item, elem, &join_path(path, key), errors) {
                        out.insert(key.clone(), value);
                    }
                }
                return Some(Value::Map(out));
            }
            other => Err(ConversionError::mismatch("map", other.type_name())),
        },
        Type::Struct(info) | Type::Pointer(info) => {
            return to_struct(raw, ty, info, path, errors);
        }
        Type::Any | Type::Unit => Ok(raw.clone()),
        Type::Func(_) | Type::Error => {
            if ty.kind_name() == Type::of_value(raw).kind_name() {
                Ok(raw.clone())
            } else {
                Err(ConversionError::mismatch(ty.kind_name(), raw.type_name()))
            }
        }
    };

    match result {
        Ok(value) => Some(value),
        Err(source) => {
            errors.push(DecodeError {
                path: path.to_string(),
                source,
            });
            None
        }
    }
}

fn to_bool(raw: &Value) -> Result<Value, ConversionError> {
    let value = match raw {
        Value::Bool(b) => *b,
        Value::Int(v) => *v != 0,
        Value::Uint(v) => *v != 0,
        Value::Float(v) => *v != 0.0,
        Value::Str(s) if s.is_empty() => false,
        Value::Str(s) => parse_bool(s).ok_or_else(|| ConversionError::Unparsable {
            value: s.clone(),
            target_type: "bool",
        })?,
        other => return Err(ConversionError::mismatch("bool", other.type_name())),
    };
    Ok(Value::Bool(value))
}

fn to_integer(raw: &Value) -> Result<Value, ConversionError> {
    match raw {
        Value::Int(_) | Value::Uint(_) => Ok(raw.clone()),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(v) => Ok(Value::Int(v.trunc() as i64)),
        Value::Str(s) if s.is_empty() => Ok(Value::Int(0)),
        Value::Str(s) => {
            let parsed = s.parse::<i128>().map_err(|_| ConversionError::Unparsable {
                value: s.clone(),
                target_type: "int",
            })?;
            if let Ok(v) = i64::try_from(parsed) {
                Ok(Value::Int(v))
            } else if let Ok(v) = u64::try_from(parsed) {
                Ok(Value::Uint(v))
            } else {
                Err(ConversionError::IntegerOverflow {
                    value: parsed,
                    target_type: "int",
                })
            }
        }
        other => Err(ConversionError::mismatch("int", other.type_name())),
    }
}

fn to_float(raw: &Value) -> Result<Value, ConversionError> {
    let value = match raw {
        Value::Float(v) => *v,
        Value::Int(v) => *v as f64,
        Value::Uint(v) => *v as f64,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Str(s) if s.is_empty() => 0.0,
        Value::Str(s) => s.parse::<f64>().map_err(|_| ConversionError::Unparsable {
            value: s.clone(),
            target_type: "float",
        })?,
        other => return Err(ConversionError::mismatch("float", other.type_name())),
    };
    Ok(Value::Float(value))
}

fn to_text(raw: &Value) -> Result<Value, ConversionError> {
    let text = match raw {
        Value::Str(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Int(v) => v.to_string(),
        Value::Uint(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        other => return Err(ConversionError::mismatch("string", other.type_name())),
    };
    Ok(Value::Str(text))
}

fn to_list(raw: &Value, elem: &Type, path: &str, errors: &mut DecodeErrors) -> Value {
    let items: Vec<Value> = match raw {
        Value::List(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| coerce(item, elem, &format!("{path}[{index}]"), errors))
            .collect(),
        // A lone value becomes a one-element list
        single => coerce(single, elem, &format!("{path}[0]"), errors)
            .into_iter()
            .collect(),
    };
    Value::List(items)
}

fn to_struct(
    raw: &Value,
    ty: &Type,
    info: &'static StructInfo,
    path: &str,
    errors: &mut DecodeErrors,
) -> Option<Value> {
    let same_struct = |other: &StructInfo| std::ptr::eq(other, info) || other.type_hash() == info.type_hash();

    match (raw, ty) {
        (Value::Map(map), _) => match ty.zero() {
            Value::Struct(mut object) => {
                decode_object(map, &mut *object, path, errors);
                Some(Value::Struct(object))
            }
            Value::Pointer(pointer) => {
                // Fresh pointer, so the borrow cannot fail
                if let Ok(mut object) = pointer.try_borrow_mut() {
                    decode_object(map, &mut *object, path, errors);
                }
                Some(Value::Pointer(pointer))
            }
            _ => None,
        },
        (Value::Struct(object), Type::Struct(_)) if same_struct(object.struct_info()) => {
            Some(raw.clone())
        }
        (Value::Struct(object), Type::Pointer(_)) if same_struct(object.struct_info()) => {
            Some(Value::Pointer(object.clone().into_shared()))
        }
        (Value::Pointer(pointer), Type::Pointer(_)) if same_struct(pointer.struct_info()) => {
            Some(raw.clone())
        }
        (Value::Pointer(pointer), Type::Struct(_)) if same_struct(pointer.struct_info()) => {
            Some(Value::Struct(pointer.snapshot()))
        }
        (other, _) => {
            errors.push(DecodeError {
                path: path.to_string(),
                source: ConversionError::mismatch(info.name, other.type_name()),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    #[test]
    fn bool_coercion() {
        assert_eq!(to_bool(&text("T")), Ok(Value::Bool(true)));
        assert_eq!(to_bool(&text("False")), Ok(Value::Bool(false)));
        assert_eq!(to_bool(&text("")), Ok(Value::Bool(false)));
        assert_eq!(to_bool(&Value::Int(3)), Ok(Value::Bool(true)));
        assert!(to_bool(&text("maybe")).is_err());
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(to_integer(&text("42")), Ok(Value::Int(42)));
        assert_eq!(to_integer(&text("")), Ok(Value::Int(0)));
        assert_eq!(to_integer(&Value::Bool(true)), Ok(Value::Int(1)));
        assert_eq!(to_integer(&Value::Float(2.9)), Ok(Value::Int(2)));
        assert_eq!(
            to_integer(&text("18446744073709551615")),
            Ok(Value::Uint(u64::MAX))
        );
        assert!(matches!(
            to_integer(&text("4x")),
            Err(ConversionError::Unparsable { .. })
        ));
    }

    #[test]
    fn text_coercion() {
        assert_eq!(to_text(&Value::Bool(true)), Ok(text("1")));
        assert_eq!(to_text(&Value::Int(-5)), Ok(text("-5")));
        assert_eq!(to_text(&Value::Float(1.5)), Ok(text("1.5")));
        assert!(to_text(&Value::List(vec![])).is_err());
    }

    #[test]
    fn float_coercion() {
        assert_eq!(to_float(&text("0.25")), Ok(Value::Float(0.25)));
        assert_eq!(to_float(&Value::Bool(true)), Ok(Value::Float(1.0)));
    }

    #[test]
    fn single_value_becomes_list() {
        let mut errors = DecodeErrors::new();
        let list = to_list(&Value::Int(3), &Type::String, "tags", &mut errors);
        assert_eq!(list, Value::List(vec![text("3")]));
        assert!(errors.is_empty());
    }

    #[test]
    fn list_errors_carry_index() {
        let mut errors = DecodeErrors::new();
        let list = Value::List(vec![text("1"), text("x")]);
        let decoded = to_list(&list, &Type::Bool, "flags", &mut errors);
        assert_eq!(decoded, Value::List(vec![Value::Bool(true)]));
        assert_eq!(errors.iter().next().map(|e| e.path.as_str()), Some("flags[1]"));
    }

    #[test]
    fn lookup_falls_back_to_case_insensitive() {
        let mut source = ValueMap::default();
        source.insert("Field1".into(), text("a"));
        source.insert("field2".into(), text("b"));
        assert_eq!(lookup(&source, "field1"), Some(&text("a")));
        assert_eq!(lookup(&source, "field2"), Some(&text("b")));
        assert!(lookup(&source, "field3").is_none());
    }

    #[test]
    fn lookup_picks_smallest_folded_key() {
        let mut source = ValueMap::default();
        for (key, value) in [("NAME", "upper"), ("Name", "title"), ("nAME", "odd")] {
            source.insert(key.to_string(), text(value));
        }
        // "NAME" < "Name" < "nAME" byte-wise
        assert_eq!(lookup(&source, "name"), Some(&text("upper")));
        assert_eq!(lookup(&source, "Name"), Some(&text("title")));
    }
}
