//! Core types for the autoflex conversion engine.
//!
//! This crate provides the reflection model that both object models are
//! expressed in:
//!
//! - [`Type`] - Static type of any value, service-side or wrapped
//! - [`Value`] - Dynamic value that always knows its type
//! - [`WrappedValue`] - Resource-model value with null/unknown/known state
//! - [`StructType`] - Named struct with field definitions and directives
//! - [`Capabilities`] - Caller-supplied conversion logic attached to a struct
//!
//! # Architecture
//!
//! ```text
//! autoflex-types (this crate)
//!    │
//!    └─── autoflex  (flatten: service → resource, expand: resource → service)
//! ```
//!
//! # Example
//!
//! ```rust
//! use autoflex_types::{FieldDef, StructType, TypedValue, Type, Value, WrappedType, WrappedValue};
//!
//! let service = StructType::new(
//!     "Service",
//!     vec![FieldDef::new("Name", Type::pointer(Type::String))],
//! );
//! let resource = StructType::new(
//!     "Resource",
//!     vec![FieldDef::new("Name", Type::Wrapped(WrappedType::String))],
//! );
//!
//! let source = service.zero().with("Name", Value::pointer(Value::string("a")));
//! assert_eq!(source.field("Name").map(Value::deref), Some(&Value::string("a")));
//!
//! // Resource fields start out null.
//! let target = resource.zero();
//! assert!(target.field("Name").and_then(Value::as_wrapped).is_some_and(|w| w.is_null()));
//!
//! let target = target.with("Name", WrappedValue::string("a"));
//! assert_eq!(
//!     target.field("Name").and_then(Value::as_wrapped).and_then(WrappedValue::as_str),
//!     Some("a")
//! );
//! ```

pub mod capability;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use capability::{
    Capabilities, CapabilityError, Expander, Flattener, TypedExpander, TypedFlattener,
};
pub use types::{
    EnumType, FieldDef, FieldDirectives, FieldLocator, InterfaceType, StructType,
    StructTypeBuilder, Type, VisibleField, WrappedType,
};
pub use values::{EnumValue, Payload, StructValue, TypedValue, Value, ValueState, WrappedValue};
