//! Resource model → service model.

use crate::capability::{dispatch_expand, Dispatch};
use crate::context::Context;
use crate::diag::Paths;
use crate::error::FlexError;
use crate::kinds;
use crate::nested;
use autoflex_types::{FieldDirectives, StructValue, Type, Value, WrappedValue};
use std::sync::Arc;

/// Expand a resource-model struct into `target`, trying the struct's
/// capabilities before matching fields.
///
/// `target` may be a struct, a pointer to a struct (allocated as needed) or
/// an interface (only reachable through a capability).
pub(crate) fn expand_object(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &StructValue,
    target: &mut Value,
) {
    if dispatch_expand(cx, at, source, target) == Dispatch::Handled {
        return;
    }

    let source_ty = Type::Struct(Arc::clone(&source.ty));
    match target {
        Value::Struct(sv) => expand_struct(cx, at, source, sv),
        Value::Pointer {
            elem: Type::Struct(st),
            ..
        } => {
            let mut sv = st.zero();
            expand_struct(cx, at, source, &mut sv);
            *target = Value::pointer(Value::Struct(sv));
        }
        Value::Interface { iface, .. } => {
            let err = FlexError::InterfaceWithoutCapability {
                interface: iface.name.clone(),
                other: source.ty.name.clone(),
            };
            cx.error(at, &source_ty, &target.ty(), err);
        }
        other => {
            let target_ty = other.ty();
            cx.error(at, &source_ty, &target_ty, FlexError::incompatible(&source_ty, &target_ty));
        }
    }
}

fn expand_struct(cx: &mut Context<'_>, at: &Paths, source: &StructValue, target: &mut StructValue) {
    tracing::info!(
        source_path = %at.source,
        target_path = %at.target,
        source_type = %source.ty.name,
        target_type = %target.ty.name,
        "Expanding struct"
    );

    let plan = cx.plan(&source.ty, &target.ty);
    for c in &plan.correspondences {
        let (Some(value), Some(slot)) = (source.get(c.source.locator), target.get_mut(c.target.locator))
        else {
            continue;
        };
        let field_at = at.field(&c.source.name, &c.target.name);
        expand_value(cx, &field_at, value, slot, &c.directives);
    }
}

/// Expand one matched resource-model field into its target slot.
fn expand_value(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    target: &mut Value,
    directives: &FieldDirectives,
) {
    match source {
        Value::Struct(sv) => expand_object(cx, at, sv, target),
        Value::Wrapped(w) => expand_wrapped(cx, at, w, target, directives),
        other => {
            let err = FlexError::NotTypedValue {
                type_name: other.ty().to_string(),
            };
            cx.error(at, &other.ty(), &target.ty(), err);
        }
    }
}

/// Write the service-model form of a wrapped value into `target`.
///
/// On error the target is left untouched.
pub(crate) fn expand_wrapped(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &WrappedValue,
    target: &mut Value,
    directives: &FieldDirectives,
) {
    if let Some(items_field) = &directives.xml_wrapper {
        return nested::expand_xml_wrapper(cx, at, source, target, items_field);
    }
    if source.ty.object_element().is_some() {
        return nested::expand_nested(cx, at, source, target);
    }

    let target_ty = target.ty();
    let result = match &target_ty {
        Type::Wrapped(ty) if *ty == source.ty => Ok(Value::Wrapped(source.clone())),
        _ if source.ty.is_scalar() => kinds::expand_scalar(source, &target_ty, directives),
        _ => kinds::expand_elements(source, &target_ty, directives),
    };
    match result {
        Ok(value) => *target = value,
        Err(err) => cx.error(at, &Type::Wrapped(source.ty.clone()), &target_ty, err),
    }
}
