//! Capability dispatch.
//!
//! Before matching fields, the engine asks the resource-side struct type
//! whether it carries its own conversion logic. Typed capabilities are
//! preferred over plain ones. Anything a capability produces is checked
//! for assignability to the slot it is written to.

use crate::context::Context;
use crate::diag::Paths;
use crate::error::FlexError;
use autoflex_types::{CapabilityError, StructType, StructValue, Type, Value};
use std::sync::Arc;

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// A capability ran (successfully or not); skip structural conversion.
    Handled,
    NotApplicable,
}

/// Hand a service-model value to the target struct's flattening capability.
///
/// `hint` is the declared type of the slot holding `target`.
pub(crate) fn dispatch_flatten(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &Value,
    hint: &Type,
    target: &mut StructValue,
) -> Dispatch {
    let ty = Arc::clone(&target.ty);
    let caps = &ty.capabilities;
    if !caps.can_flatten() {
        return Dispatch::NotApplicable;
    }

    let source = match source {
        Value::Interface { iface, value } => match value {
            Some(concrete) => {
                let concrete_ty = concrete.ty();
                if !iface.implemented_by(&concrete_ty) {
                    cx.error(
                        at,
                        &source.ty(),
                        hint,
                        FlexError::InterfaceNotSatisfied {
                            concrete: concrete_ty.to_string(),
                            interface: iface.name.clone(),
                        },
                    );
                    return Dispatch::Handled;
                }
                concrete.as_ref()
            }
            None => source,
        },
        other => other,
    };
    if source.is_nil() {
        tracing::debug!(
            source_path = %at.source,
            target_type = %ty.name,
            "Nil source, leaving target untouched"
        );
        return Dispatch::Handled;
    }

    tracing::debug!(
        source_path = %at.source,
        source_type = %source.ty(),
        target_type = %ty.name,
        "Delegating to flattening capability"
    );
    let result = match (&caps.typed_flattener, &caps.flattener) {
        (Some(typed), _) => typed.flatten_typed(source, hint, target),
        (None, Some(plain)) => plain.flatten(source, target),
        (None, None) => Ok(()),
    };
    if let Err(err) = result {
        cx.error(at, &source.ty(), hint, capability_error(&ty, err));
    }
    Dispatch::Handled
}

/// Ask the source struct's expanding capability to produce the target value.
pub(crate) fn dispatch_expand(
    cx: &mut Context<'_>,
    at: &Paths,
    source: &StructValue,
    target: &mut Value,
) -> Dispatch {
    let ty = Arc::clone(&source.ty);
    let caps = &ty.capabilities;
    if !caps.can_expand() {
        return Dispatch::NotApplicable;
    }

    let source_ty = Type::Struct(Arc::clone(&ty));
    let target_ty = target.ty();
    tracing::debug!(
        source_path = %at.source,
        source_type = %ty.name,
        target_type = %target_ty,
        "Delegating to expanding capability"
    );
    let produced = match (&caps.typed_expander, &caps.expander) {
        (Some(typed), _) => typed.expand_to(source, &target_ty),
        (None, Some(plain)) => plain.expand(source),
        (None, None) => Ok(None),
    };

    match produced {
        Err(err) => cx.error(at, &source_ty, &target_ty, capability_error(&ty, err)),
        Ok(None) if target_ty.is_nilable() => *target = target_ty.zero(),
        Ok(None) => cx.error(
            at,
            &source_ty,
            &target_ty,
            FlexError::NilProduction {
                type_name: ty.name.clone(),
                target: target_ty.to_string(),
            },
        ),
        Ok(Some(value)) => match assign(value, &target_ty) {
            Ok(value) => *target = value,
            Err(err) => cx.error(at, &source_ty, &target_ty, err),
        },
    }
    Dispatch::Handled
}

/// Check a produced value against the slot type, boxing it into the
/// interface when the slot is interface-typed.
fn assign(produced: Value, required: &Type) -> Result<Value, FlexError> {
    let produced_ty = produced.ty();
    match required {
        Type::Interface(iface) => {
            if matches!(&produced, Value::Interface { iface: inner, .. } if inner.name == iface.name)
            {
                Ok(produced)
            } else if iface.implemented_by(&produced_ty) {
                Ok(Value::interface(iface, produced))
            } else {
                Err(FlexError::InterfaceNotSatisfied {
                    concrete: produced_ty.to_string(),
                    interface: iface.name.clone(),
                })
            }
        }
        _ if produced_ty == *required => Ok(produced),
        _ => Err(FlexError::NotAssignable {
            produced: produced_ty.to_string(),
            required: required.to_string(),
        }),
    }
}

fn capability_error(ty: &StructType, source: CapabilityError) -> FlexError {
    FlexError::Capability {
        type_name: ty.name.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::matcher::Direction;
    use crate::options::Options;
    use autoflex_types::{
        Capabilities, Expander, FieldDef, Flattener, InterfaceType, TypedFlattener, WrappedType,
        WrappedValue,
    };

    struct Plain;

    impl Flattener for Plain {
        fn flatten(&self, _: &Value, target: &mut StructValue) -> Result<(), CapabilityError> {
            *target = target.clone().with("Name", WrappedValue::string("plain"));
            Ok(())
        }
    }

    struct Typed;

    impl TypedFlattener for Typed {
        fn flatten_typed(
            &self,
            _: &Value,
            target_type: &Type,
            target: &mut StructValue,
        ) -> Result<(), CapabilityError> {
            *target = target
                .clone()
                .with("Name", WrappedValue::string(target_type.to_string()));
            Ok(())
        }
    }

    struct Failing;

    impl Flattener for Failing {
        fn flatten(&self, source: &Value, _: &mut StructValue) -> Result<(), CapabilityError> {
            Err(CapabilityError::unsupported_source(&source.ty()))
        }
    }

    struct Produces(Option<Value>);

    impl Expander for Produces {
        fn expand(&self, _: &StructValue) -> Result<Option<Value>, CapabilityError> {
            Ok(self.0.clone())
        }
    }

    fn model(caps: Capabilities) -> Arc<StructType> {
        StructType::builder("Model")
            .field(FieldDef::new("Name", Type::Wrapped(WrappedType::String)))
            .capabilities(caps)
            .build()
    }

    fn flatten_with(caps: Capabilities, source: &Value) -> (Dispatch, StructValue, bool) {
        let options = Options::new();
        let mut cx = Context::new(Direction::Flatten, &options);
        let ty = model(caps);
        let mut target = ty.zero();
        let hint = Type::Struct(ty);
        let outcome = dispatch_flatten(&mut cx, &Paths::default(), source, &hint, &mut target);
        (outcome, target, cx.into_diagnostics().has_error())
    }

    #[test]
    fn test_no_capability_is_not_applicable() {
        let (outcome, _, _) = flatten_with(Capabilities::default(), &Value::string("x"));
        assert_eq!(outcome, Dispatch::NotApplicable);
    }

    #[test]
    fn test_typed_flattener_preferred() {
        let caps = Capabilities::default()
            .with_flattener(Plain)
            .with_typed_flattener(Typed);
        let (outcome, target, failed) = flatten_with(caps, &Value::string("x"));
        assert_eq!(outcome, Dispatch::Handled);
        assert!(!failed);
        assert_eq!(
            target.field("Name"),
            Some(&Value::Wrapped(WrappedValue::string("Model")))
        );
    }

    #[test]
    fn test_capability_failure_is_reported() {
        let caps = Capabilities::default().with_flattener(Failing);
        let (outcome, _, failed) = flatten_with(caps, &Value::string("x"));
        assert_eq!(outcome, Dispatch::Handled);
        assert!(failed);
    }

    #[test]
    fn test_interface_source_must_satisfy_interface() {
        let member = StructType::new("Member", vec![]);
        let stranger = StructType::new("Stranger", vec![]);
        let iface = InterfaceType::new("Union", ["Member"]);
        let caps = || Capabilities::default().with_flattener(Plain);

        let good = Value::interface(&iface, Value::Struct(member.zero()));
        let (_, target, failed) = flatten_with(caps(), &good);
        assert!(!failed);
        assert_eq!(
            target.field("Name"),
            Some(&Value::Wrapped(WrappedValue::string("plain")))
        );

        let bad = Value::interface(&iface, Value::Struct(stranger.zero()));
        let (outcome, target, failed) = flatten_with(caps(), &bad);
        assert_eq!(outcome, Dispatch::Handled);
        assert!(failed);
        assert_eq!(
            target.field("Name"),
            Some(&Value::Wrapped(WrappedValue::null(WrappedType::String)))
        );

        let nil = Value::nil_interface(&iface);
        let (outcome, _, failed) = flatten_with(caps(), &nil);
        assert_eq!(outcome, Dispatch::Handled);
        assert!(!failed);
    }

    fn expand_with(produced: Option<Value>, target: &mut Value) -> crate::Diagnostics {
        let options = Options::new();
        let mut cx = Context::new(Direction::Expand, &options);
        let source = model(Capabilities::default().with_expander(Produces(produced))).zero();
        let outcome = dispatch_expand(&mut cx, &Paths::default(), &source, target);
        assert_eq!(outcome, Dispatch::Handled);
        cx.into_diagnostics()
    }

    #[test]
    fn test_expand_boxes_into_interface() {
        let member = StructType::new("Member", vec![]);
        let iface = InterfaceType::new("Union", ["Member"]);
        let mut target = Value::nil_interface(&iface);

        let diags = expand_with(Some(Value::pointer(Value::Struct(member.zero()))), &mut target);
        assert!(!diags.has_error());
        assert_eq!(
            target,
            Value::interface(&iface, Value::pointer(Value::Struct(member.zero())))
        );
    }

    #[test]
    fn test_expand_rejects_unassignable() {
        let iface = InterfaceType::new("Union", ["Member"]);
        let mut target = Value::nil_interface(&iface);
        let diags = expand_with(Some(Value::string("nope")), &mut target);
        assert_eq!(
            diags.errors().next().and_then(|d| d.kind()),
            Some(ErrorKind::InterfaceContract)
        );
        assert!(target.is_nil());

        let mut target = Value::Int64(1);
        let diags = expand_with(Some(Value::Int32(1)), &mut target);
        assert!(matches!(
            diags.errors().next().and_then(|d| d.error.as_ref()),
            Some(FlexError::NotAssignable { .. })
        ));
        assert_eq!(target, Value::Int64(1));
    }

    #[test]
    fn test_expand_nil_production() {
        let mut target = Value::pointer(Value::string("old"));
        let diags = expand_with(None, &mut target);
        assert!(!diags.has_error());
        assert_eq!(target, Value::nil_pointer(Type::String));

        let mut target = Value::string("old");
        let diags = expand_with(None, &mut target);
        assert!(matches!(
            diags.errors().next().and_then(|d| d.error.as_ref()),
            Some(FlexError::NilProduction { .. })
        ));
    }
}
