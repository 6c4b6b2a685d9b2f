//! Autoflex
//!
//! Bidirectional structural conversion between a cloud API's "service" model
//! (plain values, pointers, slices, maps) and a provider's "resource" model
//! (wrapped values with explicit null/unknown/known state).
//!
//! # Features
//!
//! - Field matching: exact, prefix/suffix-trimmed, case-insensitive and
//!   singular/plural name correspondence
//! - Capabilities: per-type conversion logic for union-typed or bespoke fields
//! - Nested objects: structs, slices and maps of structs, legacy
//!   `{Items, Quantity}` wrappers
//! - Diagnostics: every problem is reported with its field path and both
//!   types, and sibling fields keep converting
//!
//! # Example
//!
//! ```rust
//! use autoflex::{flatten, Options};
//! use autoflex_types::{FieldDef, StructType, Type, Value, WrappedType, WrappedValue};
//!
//! let service = StructType::new("Service", vec![FieldDef::new("Name", Type::String)]);
//! let resource = StructType::new(
//!     "Resource",
//!     vec![FieldDef::new("Name", Type::Wrapped(WrappedType::String))],
//! );
//!
//! let source = Value::Struct(service.zero().with("Name", Value::string("a")));
//! let mut target = Value::pointer(Value::Struct(resource.zero()));
//!
//! let diags = flatten(&source, &mut target, &Options::new());
//! assert!(!diags.has_error());
//!
//! let model = target.deref().as_struct().unwrap();
//! assert_eq!(model.field("Name"), Some(&Value::Wrapped(WrappedValue::string("a"))));
//! ```

mod capability;
mod context;
pub mod diag;
pub mod error;
mod expand;
mod flatten;
mod kinds;
pub mod matcher;
mod nested;
pub mod options;
pub mod plural;

pub use diag::{Diagnostic, Diagnostics, Path, PathSegment, Severity};
pub use error::{ErrorKind, FlexError};
pub use matcher::{Correspondence, Direction, FieldRef, MatchReason, StructPlan};
pub use nested::{MAP_BLOCK_KEY, QUANTITY};
pub use options::{Options, OptionsError, DEFAULT_IGNORED_FIELD_NAMES};

use autoflex_types::{StructValue, Type, Value};
use context::Context;
use diag::Paths;

/// Convert a service-model struct into a resource-model struct.
///
/// `source` is a struct or a pointer to one; `target` must be a non-nil
/// pointer to a struct and is updated in place. Check
/// [`Diagnostics::has_error`] before trusting the target.
pub fn flatten(source: &Value, target: &mut Value, options: &Options) -> Diagnostics {
    tracing::info!(
        source_type = %source.ty(),
        target_type = %target.ty(),
        "Flattening"
    );
    let mut cx = Context::new(Direction::Flatten, options);
    let at = Paths::default();

    let source_ty = source.ty();
    let target_ty = target.ty();
    match check_shape(source, target) {
        Ok((source, target)) => {
            let hint = Type::Struct(target.ty.clone());
            flatten::flatten_into_struct(&mut cx, &at, source, &hint, target);
        }
        Err(err) => cx.error(&at, &source_ty, &target_ty, err),
    }
    cx.into_diagnostics()
}

/// Convert a resource-model struct into a service-model struct.
///
/// Same shape rules as [`flatten`], in the opposite direction.
pub fn expand(source: &Value, target: &mut Value, options: &Options) -> Diagnostics {
    tracing::info!(
        source_type = %source.ty(),
        target_type = %target.ty(),
        "Expanding"
    );
    let mut cx = Context::new(Direction::Expand, options);
    let at = Paths::default();

    let source_ty = source.ty();
    let target_ty = target.ty();
    let shape = check_shape(source, target).and_then(|(source, target)| match source.deref() {
        Value::Struct(sv) => Ok((sv, target)),
        other => Err(FlexError::NotStruct {
            role: "source",
            type_name: other.ty().to_string(),
        }),
    });
    match shape {
        Ok((source, target)) => {
            let zero = StructValue::zero(&target.ty);
            let mut slot = Value::Struct(std::mem::replace(target, zero));
            expand::expand_object(&mut cx, &at, source, &mut slot);
            match slot {
                Value::Struct(sv) => *target = sv,
                other => cx.error(
                    &at,
                    &source_ty,
                    &target_ty,
                    FlexError::NotAssignable {
                        produced: other.ty().to_string(),
                        required: target_ty.to_string(),
                    },
                ),
            }
        }
        Err(err) => cx.error(&at, &source_ty, &target_ty, err),
    }
    cx.into_diagnostics()
}

/// Validate the top-level shape before any field is inspected.
///
/// Returns the source value and the struct the target points at.
fn check_shape<'s, 't>(
    source: &'s Value,
    target: &'t mut Value,
) -> Result<(&'s Value, &'t mut StructValue), FlexError> {
    let source = match source {
        Value::Interface { value: None, .. } => return Err(FlexError::NilSource),
        Value::Interface {
            value: Some(inner), ..
        } => inner.as_ref(),
        other => other,
    };
    if source.is_nil() {
        return Err(FlexError::TypedNilSource {
            type_name: source.ty().to_string(),
        });
    }
    if !matches!(source.deref(), Value::Struct(_)) {
        return Err(FlexError::NotStruct {
            role: "source",
            type_name: source.ty().to_string(),
        });
    }

    let target_ty = target.ty();
    match target {
        Value::Pointer { value: None, .. } => Err(FlexError::TypedNilTarget {
            type_name: target_ty.to_string(),
        }),
        Value::Pointer {
            value: Some(inner), ..
        } => match &mut **inner {
            Value::Struct(sv) => Ok((source, sv)),
            other => Err(FlexError::NotStruct {
                role: "target",
                type_name: other.ty().to_string(),
            }),
        },
        _ => Err(FlexError::TargetNotPointer {
            type_name: target_ty.to_string(),
        }),
    }
}
