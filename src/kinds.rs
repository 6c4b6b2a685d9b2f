//! Primitive value kinds ↔ wrapped values.
//!
//! 32-bit sources widen into 64-bit targets; 64-bit sources never narrow into
//! 32-bit targets, whether or not a pointer is involved. Compatibility is
//! checked on the declared types before any payload is read, so a nil pointer
//! of the wrong width is rejected just like a present one.

use crate::error::FlexError;
use autoflex_types::{FieldDirectives, Payload, Type, Value, WrappedType, WrappedValue};
use std::collections::BTreeMap;

// ============================================================================
// Compatibility matrix
// ============================================================================

/// Whether a service-model scalar type can flatten into a wrapped scalar type.
fn check_flatten(source: &Type, target: &WrappedType) -> Result<(), FlexError> {
    let wrapped = || Type::Wrapped(target.clone());
    match (source, target) {
        (Type::Bool, WrappedType::Bool)
        | (Type::Int32, WrappedType::Int32 | WrappedType::Int64)
        | (Type::Int64, WrappedType::Int64)
        | (Type::Float32, WrappedType::Float32 | WrappedType::Float64)
        | (Type::Float64, WrappedType::Float64)
        | (Type::String, WrappedType::String | WrappedType::StringEnum(_) | WrappedType::Json)
        | (Type::Enum(_), WrappedType::String)
        | (Type::Bytes, WrappedType::String)
        | (Type::Document, WrappedType::Json) => Ok(()),
        (Type::Enum(from), WrappedType::StringEnum(to)) if from.name == to.name => Ok(()),
        (Type::Int64, WrappedType::Int32) | (Type::Float64, WrappedType::Float32) => {
            Err(FlexError::narrowing(source, wrapped()))
        }
        _ => Err(FlexError::incompatible(source, wrapped())),
    }
}

/// Whether a wrapped scalar type can expand into a service-model scalar type.
fn check_expand(source: &WrappedType, target: &Type) -> Result<(), FlexError> {
    let wrapped = || Type::Wrapped(source.clone());
    match (source, target) {
        (WrappedType::Bool, Type::Bool)
        | (WrappedType::Int32, Type::Int32 | Type::Int64)
        | (WrappedType::Int64, Type::Int64)
        | (WrappedType::Float32, Type::Float32 | Type::Float64)
        | (WrappedType::Float64, Type::Float64)
        | (WrappedType::String, Type::String | Type::Enum(_) | Type::Bytes)
        | (WrappedType::StringEnum(_), Type::String)
        | (WrappedType::Json, Type::String | Type::Document) => Ok(()),
        (WrappedType::StringEnum(from), Type::Enum(to)) if from.name == to.name => Ok(()),
        (WrappedType::Int64, Type::Int32) | (WrappedType::Float64, Type::Float32) => {
            Err(FlexError::narrowing(wrapped(), target))
        }
        _ => Err(FlexError::incompatible(wrapped(), target)),
    }
}

// ============================================================================
// Scalars
// ============================================================================

/// Flatten a primitive (or pointer to primitive) into a wrapped scalar.
pub(crate) fn flatten_scalar(
    source: &Value,
    target: &WrappedType,
    directives: &FieldDirectives,
) -> Result<WrappedValue, FlexError> {
    let declared = source.ty();
    check_flatten(declared.deref(), target)?;

    let inner = match source {
        Value::Pointer { value: None, .. } => return Ok(null_or_legacy(target, directives)),
        Value::Pointer {
            value: Some(inner), ..
        } => &**inner,
        other => {
            if directives.omit_empty && other.is_zero() {
                return Ok(WrappedValue::null(target.clone()));
            }
            other
        }
    };

    let wrapped = match (inner, target) {
        (Value::Bool(b), WrappedType::Bool) => WrappedValue::bool(*b),
        (Value::Int32(i), WrappedType::Int32) => WrappedValue::int32(*i),
        (Value::Int32(i), WrappedType::Int64) => WrappedValue::int64(i64::from(*i)),
        (Value::Int64(i), WrappedType::Int64) => WrappedValue::int64(*i),
        (Value::Float32(f), WrappedType::Float32) => WrappedValue::float32(*f),
        (Value::Float32(f), WrappedType::Float64) => WrappedValue::float64(f64::from(*f)),
        (Value::Float64(f), WrappedType::Float64) => WrappedValue::float64(*f),
        (Value::String(s), WrappedType::String) => WrappedValue::string(s.as_str()),
        (Value::String(s), WrappedType::StringEnum(et)) => {
            if s.is_empty() {
                WrappedValue::null(target.clone())
            } else {
                WrappedValue::string_enum(et, s.as_str())
            }
        }
        (Value::String(s), WrappedType::Json) => {
            if s.is_empty() {
                WrappedValue::null(target.clone())
            } else {
                WrappedValue::json(s.as_str())
            }
        }
        (Value::Enum(e), WrappedType::String) => WrappedValue::string(e.value.as_str()),
        (Value::Enum(e), WrappedType::StringEnum(et)) => {
            if e.value.is_empty() {
                WrappedValue::null(target.clone())
            } else {
                WrappedValue::string_enum(et, e.value.as_str())
            }
        }
        (Value::Bytes(None), _) | (Value::Document(None), _) => {
            null_or_legacy(target, directives)
        }
        (Value::Bytes(Some(bytes)), WrappedType::String) => {
            let s = String::from_utf8(bytes.clone()).map_err(|source| FlexError::InvalidUtf8 {
                type_name: declared.to_string(),
                source,
            })?;
            WrappedValue::string(s)
        }
        (Value::Document(Some(doc)), WrappedType::Json) => {
            let s = serde_json::to_string(doc).map_err(|source| FlexError::DocumentMarshal {
                type_name: declared.to_string(),
                source,
            })?;
            WrappedValue::json(s)
        }
        _ => {
            return Err(FlexError::MalformedValue {
                type_name: declared.to_string(),
                reason: format!("payload is a {}", inner.ty()),
            })
        }
    };
    Ok(wrapped)
}

fn null_or_legacy(target: &WrappedType, directives: &FieldDirectives) -> WrappedValue {
    if directives.legacy {
        WrappedValue::legacy_zero(target)
    } else {
        WrappedValue::null(target.clone())
    }
}

/// Expand a wrapped scalar into a primitive or pointer-to-primitive target type.
pub(crate) fn expand_scalar(
    source: &WrappedValue,
    target: &Type,
    directives: &FieldDirectives,
) -> Result<Value, FlexError> {
    let (pointer, base) = match target {
        Type::Pointer(elem) => (true, elem.as_ref()),
        other => (false, other),
    };
    check_expand(&source.ty, base)?;

    let Some(payload) = source.payload() else {
        return Ok(match (pointer, directives.legacy) {
            (true, true) => Value::pointer(base.zero()),
            (true, false) => Value::nil_pointer(base.clone()),
            (false, _) => base.zero(),
        });
    };

    let value = match (&source.ty, payload, base) {
        (_, Payload::Bool(b), Type::Bool) => Value::Bool(*b),
        (_, Payload::Int32(i), Type::Int32) => Value::Int32(*i),
        (_, Payload::Int32(i), Type::Int64) => Value::Int64(i64::from(*i)),
        (_, Payload::Int64(i), Type::Int64) => Value::Int64(*i),
        (_, Payload::Float32(f), Type::Float32) => Value::Float32(*f),
        (_, Payload::Float32(f), Type::Float64) => Value::Float64(f64::from(*f)),
        (_, Payload::Float64(f), Type::Float64) => Value::Float64(*f),
        (_, Payload::String(s), Type::String) => Value::string(s.as_str()),
        (_, Payload::String(s), Type::Enum(et)) => {
            if s.is_empty() {
                return Ok(if pointer { target.zero() } else { base.zero() });
            }
            Value::enumeration(et, s.as_str())
        }
        (_, Payload::String(s), Type::Bytes) => Value::bytes(s.as_bytes()),
        (WrappedType::Json, Payload::String(s), Type::Document) => {
            if s.is_empty() {
                Value::Document(None)
            } else {
                let doc = serde_json::from_str(s).map_err(|source| FlexError::DocumentUnmarshal {
                    type_name: base.to_string(),
                    source,
                })?;
                Value::document(doc)
            }
        }
        _ => {
            return Err(FlexError::MalformedValue {
                type_name: source.ty.to_string(),
                reason: "known payload does not match the value type".to_string(),
            })
        }
    };

    if !pointer {
        return Ok(value);
    }
    if directives.omit_empty && value.is_zero() {
        return Ok(Value::nil_pointer(base.clone()));
    }
    Ok(Value::pointer(value))
}

// ============================================================================
// Primitive collections
// ============================================================================

/// Flatten a slice or map of primitives into a wrapped list, set or map.
///
/// A nil collection becomes null and an empty one becomes an empty known
/// collection. Nil elements become null elements.
pub(crate) fn flatten_elements(
    source: &Value,
    target: &WrappedType,
    directives: &FieldDirectives,
) -> Result<WrappedValue, FlexError> {
    let incompatible = || FlexError::incompatible(source.ty(), Type::Wrapped(target.clone()));
    let element_directives = FieldDirectives::default();

    match (source, target) {
        (Value::Pointer { value: None, elem }, _)
            if matches!(elem, Type::Slice(_) | Type::Map(_)) =>
        {
            flatten_elements(&elem.zero(), target, directives)
        }
        (Value::Pointer { value: Some(inner), .. }, _)
            if matches!(inner.as_ref(), Value::Slice { .. } | Value::Map { .. }) =>
        {
            flatten_elements(inner, target, directives)
        }
        (Value::Slice { elem, items }, WrappedType::List(we) | WrappedType::Set(we)) => {
            check_flatten(elem.deref(), we)?;
            let Some(items) = items else {
                return Ok(null_or_legacy(target, directives));
            };
            let elements = items
                .iter()
                .map(|item| flatten_scalar(item, we, &element_directives))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(WrappedValue::known(target.clone(), Payload::Elements(elements)))
        }
        (Value::Map { elem, entries }, WrappedType::Map(we)) => {
            check_flatten(elem.deref(), we)?;
            let Some(entries) = entries else {
                return Ok(null_or_legacy(target, directives));
            };
            let entries = entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), flatten_scalar(v, we, &element_directives)?)))
                .collect::<Result<BTreeMap<_, _>, FlexError>>()?;
            Ok(WrappedValue::known(target.clone(), Payload::Entries(entries)))
        }
        _ => Err(incompatible()),
    }
}

/// Expand a wrapped list, set or map of primitives into a slice or map.
pub(crate) fn expand_elements(
    source: &WrappedValue,
    target: &Type,
    directives: &FieldDirectives,
) -> Result<Value, FlexError> {
    let element_directives = FieldDirectives::default();

    match (&source.ty, target) {
        (_, Type::Pointer(inner)) if matches!(inner.as_ref(), Type::Slice(_) | Type::Map(_)) => {
            let value = expand_elements(source, inner, directives)?;
            Ok(if value.is_nil() {
                Value::nil_pointer((**inner).clone())
            } else {
                Value::pointer(value)
            })
        }
        (WrappedType::List(we) | WrappedType::Set(we), Type::Slice(elem)) => {
            check_expand(we, elem.deref())?;
            let Some(items) = source.elements() else {
                return Ok(if directives.legacy {
                    Value::slice((**elem).clone(), Vec::new())
                } else {
                    Value::nil_slice((**elem).clone())
                });
            };
            let items = items
                .iter()
                .map(|item| expand_scalar(item, elem, &element_directives))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::slice((**elem).clone(), items))
        }
        (WrappedType::Map(we), Type::Map(elem)) => {
            check_expand(we, elem.deref())?;
            let Some(entries) = source.entries() else {
                return Ok(if directives.legacy {
                    Value::map((**elem).clone(), BTreeMap::new())
                } else {
                    Value::nil_map((**elem).clone())
                });
            };
            let entries = entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), expand_scalar(v, elem, &element_directives)?)))
                .collect::<Result<BTreeMap<_, _>, FlexError>>()?;
            Ok(Value::map((**elem).clone(), entries))
        }
        _ => Err(FlexError::incompatible(Type::Wrapped(source.ty.clone()), target)),
    }
}
