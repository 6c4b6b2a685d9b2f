//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use autoflex::Diagnostics;
use autoflex_types::{StructValue, Value, WrappedValue};

/// Initialize logging once per test binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("autoflex=debug")
        .with_test_writer()
        .try_init()
        .ok(); // Ignore if already initialized
}

/// A non-nil pointer to a struct value, the shape every target takes.
pub fn ptr_to(sv: StructValue) -> Value {
    Value::pointer(Value::Struct(sv))
}

/// The struct a top-level target points at.
pub fn pointee(target: &Value) -> &StructValue {
    target
        .deref()
        .as_struct()
        .expect("target should point at a struct")
}

/// A wrapped field of a resource-model struct.
pub fn wrapped<'a>(sv: &'a StructValue, name: &str) -> &'a WrappedValue {
    sv.field(name)
        .and_then(Value::as_wrapped)
        .unwrap_or_else(|| panic!("{name} should be a wrapped field"))
}

/// Fail the test with every diagnostic if any of them is an error.
pub fn assert_clean(diags: &Diagnostics) {
    assert!(!diags.has_error(), "unexpected errors:\n{diags}");
}
