//! Capability traits: caller-supplied conversion logic attached to a struct type.
//!
//! When a resource-model struct type carries one of these, the engine hands the
//! value over instead of matching fields. Union-typed (interface) fields and
//! bespoke encodings are the usual reasons.

use crate::types::Type;
use crate::values::{StructValue, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by a capability implementation.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The source value is not one this capability understands.
    #[error("unsupported source type {type_name}")]
    UnsupportedSource { type_name: String },

    /// The requested target type is not one this capability can produce.
    #[error("unsupported target type {type_name}")]
    UnsupportedTarget { type_name: String },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl CapabilityError {
    pub fn unsupported_source(ty: &Type) -> Self {
        Self::UnsupportedSource {
            type_name: ty.to_string(),
        }
    }

    pub fn unsupported_target(ty: &Type) -> Self {
        Self::UnsupportedTarget {
            type_name: ty.to_string(),
        }
    }
}

/// Consumes a service-model value into a resource-model struct.
pub trait Flattener: Send + Sync {
    fn flatten(&self, source: &Value, target: &mut StructValue) -> Result<(), CapabilityError>;
}

/// Consumes a service-model value, given the declared type of the target slot
/// (the struct itself, or the `Object`/`List`/`Set` that holds it).
pub trait TypedFlattener: Send + Sync {
    fn flatten_typed(
        &self,
        source: &Value,
        target_type: &Type,
        target: &mut StructValue,
    ) -> Result<(), CapabilityError>;
}

/// Produces a service-model value from a resource-model struct.
///
/// `Ok(None)` is a nil production.
pub trait Expander: Send + Sync {
    fn expand(&self, source: &StructValue) -> Result<Option<Value>, CapabilityError>;
}

/// Produces a service-model value of the requested target type.
pub trait TypedExpander: Send + Sync {
    fn expand_to(
        &self,
        source: &StructValue,
        target_type: &Type,
    ) -> Result<Option<Value>, CapabilityError>;
}

/// The capabilities a struct type provides.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub typed_flattener: Option<Arc<dyn TypedFlattener>>,
    pub flattener: Option<Arc<dyn Flattener>>,
    pub typed_expander: Option<Arc<dyn TypedExpander>>,
    pub expander: Option<Arc<dyn Expander>>,
}

impl Capabilities {
    pub fn with_flattener(mut self, flattener: impl Flattener + 'static) -> Self {
        self.flattener = Some(Arc::new(flattener));
        self
    }

    pub fn with_typed_flattener(mut self, flattener: impl TypedFlattener + 'static) -> Self {
        self.typed_flattener = Some(Arc::new(flattener));
        self
    }

    pub fn with_expander(mut self, expander: impl Expander + 'static) -> Self {
        self.expander = Some(Arc::new(expander));
        self
    }

    pub fn with_typed_expander(mut self, expander: impl TypedExpander + 'static) -> Self {
        self.typed_expander = Some(Arc::new(expander));
        self
    }

    pub fn can_flatten(&self) -> bool {
        self.typed_flattener.is_some() || self.flattener.is_some()
    }

    pub fn can_expand(&self) -> bool {
        self.typed_expander.is_some() || self.expander.is_some()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("typed_flattener", &self.typed_flattener.is_some())
            .field("flattener", &self.flattener.is_some())
            .field("typed_expander", &self.typed_expander.is_some())
            .field("expander", &self.expander.is_some())
            .finish()
    }
}
