//! Service model → resource model.

use crate::capability::{dispatch_flatten, Dispatch};
use crate::context::Context;
use crate::diag::Paths;
use crate::error::FlexError;
use crate::kinds;
use crate::nested;
use autoflex_types::{FieldDirectives, StructValue, Type, Value, WrappedType, WrappedValue};

/// Flatten `source` into a resource-model struct, trying the struct's
/// capabilities before matching fields.
///
/// `hint` is the declared type of the slot holding `target`.
pub(crate) fn flatten_into_struct(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    hint: &Type,
    target: &mut StructValue,
) {
    if dispatch_flatten(cx, at, source, hint, target) == Dispatch::Handled {
        return;
    }

    match source.deref() {
        Value::Struct(sv) => flatten_struct(cx, at, sv, target),
        Value::Pointer {
            elem: Type::Struct(_),
            value: None,
        } => {}
        Value::Interface { iface, .. } => cx.error(
            at,
            &source.ty(),
            hint,
            FlexError::InterfaceWithoutCapability {
                interface: iface.name.clone(),
                other: target.ty.name.clone(),
            },
        ),
        other => cx.error(
            at,
            &source.ty(),
            hint,
            FlexError::incompatible(other.ty(), &target.ty.name),
        ),
    }
}

fn flatten_struct(cx: &mut Context<'_>, at: &Paths, source: &StructValue, target: &mut StructValue) {
    tracing::info!(
        source_path = %at.source,
        target_path = %at.target,
        source_type = %source.ty.name,
        target_type = %target.ty.name,
        "Flattening struct"
    );

    let plan = cx.plan(&source.ty, &target.ty);
    for c in &plan.correspondences {
        let (Some(value), Some(slot)) = (source.get(c.source.locator), target.get_mut(c.target.locator))
        else {
            continue;
        };
        let field_at = at.field(&c.source.name, &c.target.name);
        flatten_value(cx, &field_at, value, slot, &c.directives);
    }
}

/// Flatten one matched field value into its target slot.
fn flatten_value(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    target: &mut Value,
    directives: &FieldDirectives,
) {
    match target {
        Value::Struct(sv) => {
            let hint = Type::Struct(sv.ty.clone());
            flatten_into_struct(cx, at, source, &hint, sv);
        }
        Value::Wrapped(w) => {
            let ty = w.ty.clone();
            if let Some(value) = flatten_wrapped(cx, at, source, &ty, directives) {
                *w = value;
            }
        }
        other => {
            let err = FlexError::NotTypedValue {
                type_name: other.ty().to_string(),
            };
            cx.error(at, &source.ty(), &other.ty(), err);
        }
    }
}

/// Produce the wrapped value for `target_ty` from a service-model value.
///
/// Returns `None` after recording an error; the caller leaves its target
/// untouched in that case.
pub(crate) fn flatten_wrapped(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    target_ty: &WrappedType,
    directives: &FieldDirectives,
) -> Option<WrappedValue> {
    if let Some(items_field) = &directives.xml_wrapper {
        return nested::flatten_xml_wrapper(cx, at, source, target_ty, items_field);
    }
    if target_ty.object_element().is_some() {
        return nested::flatten_nested(cx, at, source, target_ty);
    }

    let result = match source {
        Value::Wrapped(w) if w.ty == *target_ty => Ok(w.clone()),
        Value::Wrapped(w) => Err(FlexError::incompatible(&w.ty, target_ty)),
        _ if target_ty.is_scalar() => kinds::flatten_scalar(source, target_ty, directives),
        _ => kinds::flatten_elements(source, target_ty, directives),
    };
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            cx.error(at, &source.ty(), &Type::Wrapped(target_ty.clone()), err);
            None
        }
    }
}
