//! Nested objects and object collections.
//!
//! - struct, pointer-to-struct or interface ↔ `Object<S>` (or a one-element
//!   `List`/`Set` of objects)
//! - slice of structs ↔ `List<Object<S>>` / `Set<Object<S>>`; a nil slice is a
//!   null collection and an empty slice an empty one
//! - map of structs ↔ `List<Object<S>>`, with each key carried in the
//!   element's `MapBlockKey` field
//! - legacy `{Items, Quantity}` wrappers, unwrapped to their items

use crate::context::Context;
use crate::diag::Paths;
use crate::error::FlexError;
use crate::expand::{expand_object, expand_wrapped};
use crate::flatten::{flatten_into_struct, flatten_wrapped};
use autoflex_types::{
    FieldDirectives, Payload, StructType, StructValue, Type, TypedValue, Value, WrappedType,
    WrappedValue,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Element field that receives the key of a flattened map entry.
pub const MAP_BLOCK_KEY: &str = "MapBlockKey";

/// Count field of a legacy XML wrapper struct.
pub const QUANTITY: &str = "Quantity";

fn is_object_like(ty: &Type) -> bool {
    matches!(ty.deref(), Type::Struct(_) | Type::Interface(_))
}

// ============================================================================
// Flatten
// ============================================================================

/// Flatten a struct-shaped value into an object or object collection.
pub(crate) fn flatten_nested(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    target_ty: &WrappedType,
) -> Option<WrappedValue> {
    let hint = Type::Wrapped(target_ty.clone());
    let Some(elem_st) = target_ty.object_element().map(Arc::clone) else {
        cx.error(at, &source.ty(), &hint, FlexError::incompatible(source.ty(), &hint));
        return None;
    };
    let collection = matches!(target_ty, WrappedType::List(_) | WrappedType::Set(_));

    match source {
        Value::Slice { elem, items } if collection && is_object_like(elem) => {
            let Some(items) = items else {
                return Some(WrappedValue::null(target_ty.clone()));
            };
            let mut objects = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                if item.is_nil() {
                    tracing::debug!(
                        source_path = %at.source.index(i),
                        "Skipping nil collection element"
                    );
                    continue;
                }
                let sv = flatten_element(cx, &at.indices(i, objects.len()), item, &elem_st, &hint);
                objects.push(WrappedValue::object(sv));
            }
            Some(WrappedValue::known(target_ty.clone(), Payload::Elements(objects)))
        }
        Value::Map { elem, entries } if collection && is_object_like(elem) => {
            flatten_map_block(cx, at, source, entries.as_ref(), target_ty, &elem_st)
        }
        Value::Struct(_) | Value::Pointer { .. } | Value::Interface { .. }
            if is_object_like(&source.ty()) =>
        {
            if source.is_nil() {
                return Some(WrappedValue::null(target_ty.clone()));
            }
            let object = WrappedValue::object(flatten_element(cx, at, source, &elem_st, &hint));
            if collection {
                Some(WrappedValue::known(
                    target_ty.clone(),
                    Payload::Elements(vec![object]),
                ))
            } else {
                Some(object)
            }
        }
        _ => {
            cx.error(at, &source.ty(), &hint, FlexError::incompatible(source.ty(), &hint));
            None
        }
    }
}

fn flatten_element(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    elem_st: &Arc<StructType>,
    hint: &Type,
) -> StructValue {
    let mut target = elem_st.zero();
    flatten_into_struct(cx, at, source, hint, &mut target);
    target
}

fn flatten_map_block(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    entries: Option<&BTreeMap<String, Value>>,
    target_ty: &WrappedType,
    elem_st: &Arc<StructType>,
) -> Option<WrappedValue> {
    let hint = Type::Wrapped(target_ty.clone());
    let key_enum = match elem_st.field_type(MAP_BLOCK_KEY) {
        Some(Type::Wrapped(WrappedType::String)) => None,
        Some(Type::Wrapped(WrappedType::StringEnum(et))) => Some(Arc::clone(et)),
        Some(other) => {
            let err = FlexError::incompatible(Type::String, other);
            cx.error(at, &source.ty(), &hint, err);
            return None;
        }
        None => {
            let err = FlexError::MissingMapBlockKey {
                type_name: elem_st.name.clone(),
                field: MAP_BLOCK_KEY.to_string(),
            };
            cx.error(at, &source.ty(), &hint, err);
            return None;
        }
    };
    flatten_map_entries(cx, at, entries, target_ty, elem_st, |key| match &key_enum {
        Some(et) => WrappedValue::string_enum(et, key),
        None => WrappedValue::string(key),
    })
}

fn flatten_map_entries(
    cx: &mut Context<'_>,
    at: &Paths,
    entries: Option<&BTreeMap<String, Value>>,
    target_ty: &WrappedType,
    elem_st: &Arc<StructType>,
    make_key: impl Fn(&str) -> WrappedValue,
) -> Option<WrappedValue> {
    let hint = Type::Wrapped(target_ty.clone());
    let Some(entries) = entries else {
        return Some(WrappedValue::null(target_ty.clone()));
    };

    let mut objects = Vec::with_capacity(entries.len());
    for (key, item) in entries {
        let entry_at = at.key_to_index(key, objects.len());
        if item.is_nil() {
            tracing::debug!(source_path = %entry_at.source, "Skipping nil map entry");
            continue;
        }
        let mut sv = flatten_element(cx, &entry_at, item, elem_st, &hint);
        if let Some(slot) = sv.field_mut(MAP_BLOCK_KEY) {
            *slot = Value::Wrapped(make_key(key.as_str()));
        }
        objects.push(WrappedValue::object(sv));
    }
    Some(WrappedValue::known(target_ty.clone(), Payload::Elements(objects)))
}

/// Unwrap a legacy `{Items, Quantity}` struct and flatten its items.
pub(crate) fn flatten_xml_wrapper(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    target_ty: &WrappedType,
    items_field: &str,
) -> Option<WrappedValue> {
    let hint = Type::Wrapped(target_ty.clone());
    if source.is_nil() {
        return Some(WrappedValue::null(target_ty.clone()));
    }
    let Value::Struct(wrapper) = source.deref() else {
        let err = FlexError::MalformedDirective {
            field: at.target.to_string(),
            reason: format!("xmlwrapper source {} is not a struct", source.ty()),
        };
        cx.error(at, &source.ty(), &hint, err);
        return None;
    };
    let Some(items) = wrapper.field(items_field) else {
        let err = FlexError::MalformedDirective {
            field: at.target.to_string(),
            reason: format!("{} has no {items_field} field", wrapper.ty.name),
        };
        cx.error(at, &source.ty(), &hint, err);
        return None;
    };

    let len = items.len().unwrap_or(0);
    let quantity = wrapper.field(QUANTITY).and_then(|q| match q.deref() {
        Value::Int32(i) => Some(i64::from(*i)),
        Value::Int64(i) => Some(*i),
        _ => None,
    });
    if let Some(quantity) = quantity {
        if usize::try_from(quantity).ok() != Some(len) {
            tracing::debug!(
                source_path = %at.source,
                quantity,
                items = len,
                "Wrapper quantity does not match item count"
            );
            cx.warning(
                &at.source_field(QUANTITY),
                &source.ty(),
                &hint,
                format!("{QUANTITY} is {quantity} but {items_field} holds {len} items; using {items_field}"),
            );
        }
    }

    flatten_wrapped(
        cx,
        &at.source_field(items_field),
        items,
        target_ty,
        &FieldDirectives::default(),
    )
}

// ============================================================================
// Expand
// ============================================================================

/// Expand an object or object collection into a struct-shaped target.
pub(crate) fn expand_nested(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &WrappedValue,
    target: &mut Value,
) {
    let source_ty = Type::Wrapped(source.ty.clone());
    let target_ty = target.ty();
    let objects = source.objects();

    match &target_ty {
        Type::Slice(elem) if is_object_like(elem) => {
            let Some(objects) = objects else {
                *target = Value::nil_slice((**elem).clone());
                return;
            };
            let mut items = Vec::with_capacity(objects.len());
            for (i, object) in objects.into_iter().enumerate() {
                let mut item = elem.zero();
                expand_object(cx, &at.index(i), object, &mut item);
                items.push(item);
            }
            *target = Value::slice((**elem).clone(), items);
        }
        Type::Map(elem) if is_object_like(elem) => {
            let has_key = source
                .ty
                .object_element()
                .is_some_and(|st| st.locate(MAP_BLOCK_KEY).is_some());
            if !has_key {
                let type_name = source
                    .ty
                    .object_element()
                    .map_or_else(|| source.ty.to_string(), |st| st.name.clone());
                let err = FlexError::MissingMapBlockKey {
                    type_name,
                    field: MAP_BLOCK_KEY.to_string(),
                };
                cx.error(at, &source_ty, &target_ty, err);
                return;
            }
            let Some(objects) = objects else {
                *target = Value::nil_map((**elem).clone());
                return;
            };
            let mut entries = BTreeMap::new();
            for (i, object) in objects.into_iter().enumerate() {
                let key = object
                    .field(MAP_BLOCK_KEY)
                    .and_then(Value::as_wrapped)
                    .and_then(WrappedValue::as_str);
                let Some(key) = key else {
                    let err = FlexError::MalformedValue {
                        type_name: object.ty.name.clone(),
                        reason: format!("{MAP_BLOCK_KEY} is not a known string"),
                    };
                    cx.error(&at.index(i), &source_ty, &target_ty, err);
                    continue;
                };
                let entry_at = at.index_to_key(i, key);
                if entries.contains_key(key) {
                    cx.warning(
                        &entry_at,
                        &source_ty,
                        &target_ty,
                        format!("duplicate {MAP_BLOCK_KEY} {key:?}; element {i} replaces the earlier one"),
                    );
                }
                let mut item = elem.zero();
                expand_object(cx, &entry_at, object, &mut item);
                entries.insert(key.to_string(), item);
            }
            *target = Value::map((**elem).clone(), entries);
        }
        ty if is_object_like(ty) => match objects.and_then(|o| o.first().copied()) {
            Some(object) => expand_object(cx, at, object, target),
            None => *target = target_ty.zero(),
        },
        _ => cx.error(
            at,
            &source_ty,
            &target_ty,
            FlexError::incompatible(&source_ty, &target_ty),
        ),
    }
}

/// Expand items into a legacy `{Items, Quantity}` struct, recomputing the quantity.
pub(crate) fn expand_xml_wrapper(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &WrappedValue,
    target: &mut Value,
    items_field: &str,
) {
    let source_ty = Type::Wrapped(source.ty.clone());
    let target_ty = target.ty();
    let Some(wrapper_st) = target_ty.as_struct().map(Arc::clone) else {
        let err = FlexError::MalformedDirective {
            field: at.target.to_string(),
            reason: format!("xmlwrapper target {target_ty} is not a struct"),
        };
        cx.error(at, &source_ty, &target_ty, err);
        return;
    };
    if !source.is_known() {
        *target = target_ty.zero();
        return;
    }

    let mut wrapper = wrapper_st.zero();
    let items_at = at.target_field(items_field);
    let Some(items) = wrapper.field_mut(items_field) else {
        let err = FlexError::MalformedDirective {
            field: at.target.to_string(),
            reason: format!("{} has no {items_field} field", wrapper_st.name),
        };
        cx.error(at, &source_ty, &target_ty, err);
        return;
    };
    expand_wrapped(cx, &items_at, source, items, &FieldDirectives::default());

    let len = wrapper
        .field(items_field)
        .and_then(Value::len)
        .unwrap_or(0);
    if let Some(quantity) = wrapper.field_mut(QUANTITY) {
        if let Err(err) = set_quantity(quantity, len) {
            cx.error(&at.target_field(QUANTITY), &source_ty, &target_ty, err);
        }
    }

    *target = match target_ty {
        Type::Pointer(_) => Value::pointer(Value::Struct(wrapper)),
        _ => Value::Struct(wrapper),
    };
}

fn set_quantity(slot: &mut Value, len: usize) -> Result<(), FlexError> {
    let overflow = |to: &Type| FlexError::MalformedValue {
        type_name: to.to_string(),
        reason: format!("{len} items do not fit"),
    };
    let ty = slot.ty();
    let count = match ty.deref() {
        Type::Int32 => Value::Int32(i32::try_from(len).map_err(|_| overflow(&ty))?),
        Type::Int64 => Value::Int64(i64::try_from(len).map_err(|_| overflow(&ty))?),
        other => {
            return Err(FlexError::MalformedDirective {
                field: QUANTITY.to_string(),
                reason: format!("{QUANTITY} must be an integer, got {other}"),
            })
        }
    };
    *slot = match ty {
        Type::Pointer(_) => Value::pointer(count),
        _ => count,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::matcher::Direction;
    use crate::options::Options;
    use autoflex_types::{EnumType, FieldDef};

    fn child() -> Arc<StructType> {
        StructType::new("Child", vec![FieldDef::new("Attr", Type::String)])
    }

    fn child_model(with_key: bool) -> Arc<StructType> {
        let mut fields = vec![FieldDef::new("Attr", Type::Wrapped(WrappedType::String))];
        if with_key {
            fields.push(FieldDef::new(MAP_BLOCK_KEY, Type::Wrapped(WrappedType::String)));
        }
        StructType::new("ChildModel", fields)
    }

    fn child_value(attr: &str) -> Value {
        Value::Struct(child().zero().with("Attr", Value::string(attr)))
    }

    #[test]
    fn test_flatten_slice_of_pointers() {
        let options = Options::new();
        let mut cx = Context::new(Direction::Flatten, &options);
        let model = child_model(false);
        let source = Value::slice(
            Type::pointer(Type::Struct(child())),
            vec![
                Value::pointer(child_value("a")),
                Value::nil_pointer(Type::Struct(child())),
            ],
        );

        let flat = flatten_nested(&mut cx, &Paths::default(), &source, &WrappedType::list_of(&model))
            .unwrap();
        let objects = flat.objects().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(
            objects[0].field("Attr"),
            Some(&Value::Wrapped(WrappedValue::string("a")))
        );
        assert!(!cx.into_diagnostics().has_error());
    }

    #[test]
    fn test_flatten_map_block_key() {
        let options = Options::new();
        let mut cx = Context::new(Direction::Flatten, &options);
        let model = child_model(true);
        let mut entries = BTreeMap::new();
        entries.insert("x".to_string(), child_value("1"));
        let source = Value::map(Type::Struct(child()), entries);

        let flat = flatten_nested(&mut cx, &Paths::default(), &source, &WrappedType::list_of(&model))
            .unwrap();
        let objects = flat.objects().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(
            objects[0].field(MAP_BLOCK_KEY),
            Some(&Value::Wrapped(WrappedValue::string("x")))
        );
    }

    #[test]
    fn test_flatten_map_without_key_field() {
        let options = Options::new();
        let mut cx = Context::new(Direction::Flatten, &options);
        let model = child_model(false);
        let source = Value::map(Type::Struct(child()), BTreeMap::new());

        let flat = flatten_nested(&mut cx, &Paths::default(), &source, &WrappedType::list_of(&model));
        assert!(flat.is_none());
        let diags = cx.into_diagnostics();
        assert_eq!(
            diags.errors().next().and_then(|d| d.kind()),
            Some(ErrorKind::Structural)
        );
    }

    #[test]
    fn test_expand_map_block_key() {
        let options = Options::new();
        let mut cx = Context::new(Direction::Expand, &options);
        let model = child_model(true);
        let source = WrappedValue::list_of(
            &model,
            vec![model
                .zero()
                .with("Attr", WrappedValue::string("1"))
                .with(MAP_BLOCK_KEY, WrappedValue::string("x"))],
        );
        let mut target = Value::nil_map(Type::Struct(child()));

        expand_nested(&mut cx, &Paths::default(), &source, &mut target);
        let mut expected = BTreeMap::new();
        expected.insert("x".to_string(), child_value("1"));
        assert_eq!(target, Value::map(Type::Struct(child()), expected));
    }

    #[test]
    fn test_flatten_map_enum_key() {
        let options = Options::new();
        let mut cx = Context::new(Direction::Flatten, &options);
        let zone = EnumType::new("Zone");
        let model = StructType::new(
            "ChildModel",
            vec![
                FieldDef::new(MAP_BLOCK_KEY, Type::Wrapped(WrappedType::StringEnum(zone.clone()))),
                FieldDef::new("Attr", Type::Wrapped(WrappedType::String)),
            ],
        );
        let mut entries = BTreeMap::new();
        entries.insert("eu-west-1a".to_string(), child_value("1"));
        let source = Value::map(Type::Struct(child()), entries);

        let flat = flatten_nested(&mut cx, &Paths::default(), &source, &WrappedType::list_of(&model))
            .unwrap();
        assert_eq!(
            flat.objects().unwrap()[0].field(MAP_BLOCK_KEY),
            Some(&Value::Wrapped(WrappedValue::string_enum(&zone, "eu-west-1a")))
        );
        assert!(!cx.into_diagnostics().has_error());
    }

    #[test]
    fn test_flatten_map_key_of_wrong_type() {
        let options = Options::new();
        let mut cx = Context::new(Direction::Flatten, &options);
        let model = StructType::new(
            "ChildModel",
            vec![
                FieldDef::new(MAP_BLOCK_KEY, Type::Wrapped(WrappedType::Int64)),
                FieldDef::new("Attr", Type::Wrapped(WrappedType::String)),
            ],
        );
        let mut entries = BTreeMap::new();
        entries.insert("x".to_string(), child_value("1"));
        let source = Value::map(Type::Struct(child()), entries);

        let flat = flatten_nested(&mut cx, &Paths::default(), &source, &WrappedType::list_of(&model));
        assert!(flat.is_none());
        let diags = cx.into_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.errors().next().and_then(|d| d.kind()),
            Some(ErrorKind::TypeIncompatibility)
        );
    }

    #[test]
    fn test_nil_elements_keep_source_indices_in_paths() {
        let options = Options::new();
        let mut cx = Context::new(Direction::Flatten, &options);
        let wide = StructType::new("Wide", vec![FieldDef::new("Attr", Type::Int64)]);
        let narrow = StructType::new(
            "NarrowModel",
            vec![FieldDef::new("Attr", Type::Wrapped(WrappedType::Int32))],
        );
        let source = Value::slice(
            Type::pointer(Type::Struct(wide.clone())),
            vec![
                Value::nil_pointer(Type::Struct(wide.clone())),
                Value::pointer(Value::Struct(wide.zero().with("Attr", Value::Int64(1)))),
            ],
        );
        let at = Paths::default().field("Items", "Items");

        let flat =
            flatten_nested(&mut cx, &at, &source, &WrappedType::list_of(&narrow)).unwrap();
        assert_eq!(flat.objects().map(|o| o.len()), Some(1));

        let diags = cx.into_diagnostics();
        let error = diags.errors().next().unwrap();
        assert_eq!(error.source_path.to_string(), "Items[1].Attr");
        assert_eq!(error.target_path.to_string(), "Items[0].Attr");
    }

    #[test]
    fn test_expand_duplicate_map_key_warns() {
        let options = Options::new();
        let mut cx = Context::new(Direction::Expand, &options);
        let model = child_model(true);
        let element = |attr: &str| {
            model
                .zero()
                .with("Attr", WrappedValue::string(attr))
                .with(MAP_BLOCK_KEY, WrappedValue::string("x"))
        };
        let source = WrappedValue::list_of(&model, vec![element("1"), element("2")]);
        let mut target = Value::nil_map(Type::Struct(child()));

        expand_nested(&mut cx, &Paths::default(), &source, &mut target);
        let mut expected = BTreeMap::new();
        expected.insert("x".to_string(), child_value("2"));
        assert_eq!(target, Value::map(Type::Struct(child()), expected));

        let diags = cx.into_diagnostics();
        assert!(!diags.has_error());
        let warning = diags.warnings().next().unwrap();
        assert!(warning.message.contains("\"x\""));
        assert_eq!(warning.target_path.to_string(), "[\"x\"]");
    }

    #[test]
    fn test_set_quantity() {
        let mut slot = Value::nil_pointer(Type::Int32);
        set_quantity(&mut slot, 2).unwrap();
        assert_eq!(slot, Value::pointer(Value::Int32(2)));

        let mut slot = Value::Int64(9);
        set_quantity(&mut slot, 0).unwrap();
        assert_eq!(slot, Value::Int64(0));

        let mut slot = Value::string("");
        assert!(set_quantity(&mut slot, 1).is_err());
    }
}
