//! Error types for flatten/expand conversions.
//!
//! Every failure the engine can report is a `FlexError`. Errors never abort a
//! conversion on their own: they are attached to the call's diagnostics with
//! the field paths and types involved, and sibling fields keep converting.

use autoflex_types::CapabilityError;
use std::fmt;
use thiserror::Error;

/// Broad category of a `FlexError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Nil or typed-nil source/target, non-pointer target, non-struct top level
    Shape,
    /// A value does not provide a required capability or is not assignable
    InterfaceContract,
    /// Narrowing conversion or no converter for a kind/type pair
    TypeIncompatibility,
    /// Missing map-block key field or malformed directive
    Structural,
    /// A delegate (document codec, capability implementation) failed
    Delegate,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Shape => "shape",
            Self::InterfaceContract => "interface contract",
            Self::TypeIncompatibility => "type incompatibility",
            Self::Structural => "structural",
            Self::Delegate => "delegate",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while flattening or expanding.
#[derive(Debug, Error)]
pub enum FlexError {
    // Shape errors
    #[error("source is nil")]
    NilSource,

    #[error("source is a nil {type_name}")]
    TypedNilSource { type_name: String },

    #[error("target is a nil {type_name}")]
    TypedNilTarget { type_name: String },

    #[error("target must be a pointer, got {type_name}")]
    TargetNotPointer { type_name: String },

    #[error("{role} must be a struct, got {type_name}")]
    NotStruct {
        role: &'static str,
        type_name: String,
    },

    // Interface-contract errors
    #[error("{type_name} does not implement the typed value capability")]
    NotTypedValue { type_name: String },

    #[error("{concrete} does not implement interface {interface}")]
    InterfaceNotSatisfied { concrete: String, interface: String },

    #[error("value of type {produced} is not assignable to {required}")]
    NotAssignable { produced: String, required: String },

    #[error("capability of {type_name} produced nil for {target}, which cannot hold nil")]
    NilProduction { type_name: String, target: String },

    #[error("interface {interface} needs a capability to convert to or from {other}")]
    InterfaceWithoutCapability { interface: String, other: String },

    // Type-incompatibility errors
    #[error("narrowing conversion from {from} to {to} is not allowed")]
    Narrowing { from: String, to: String },

    #[error("incompatible types: {from} to {to}")]
    Incompatible { from: String, to: String },

    // Structural errors
    #[error("element type {type_name} has no {field} field to receive map keys")]
    MissingMapBlockKey { type_name: String, field: String },

    #[error("malformed directive on {field}: {reason}")]
    MalformedDirective { field: String, reason: String },

    #[error("value does not match its declared type {type_name}: {reason}")]
    MalformedValue { type_name: String, reason: String },

    // Delegate errors
    #[error("marshaling document {type_name}: {source}")]
    DocumentMarshal {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unmarshaling document into {type_name}: {source}")]
    DocumentUnmarshal {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid UTF-8 in {type_name}: {source}")]
    InvalidUtf8 {
        type_name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("capability of {type_name} failed: {source}")]
    Capability {
        type_name: String,
        #[source]
        source: CapabilityError,
    },
}

impl FlexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NilSource
            | Self::TypedNilSource { .. }
            | Self::TypedNilTarget { .. }
            | Self::TargetNotPointer { .. }
            | Self::NotStruct { .. } => ErrorKind::Shape,
            Self::NotTypedValue { .. }
            | Self::InterfaceNotSatisfied { .. }
            | Self::NotAssignable { .. }
            | Self::NilProduction { .. }
            | Self::InterfaceWithoutCapability { .. } => ErrorKind::InterfaceContract,
            Self::Narrowing { .. } | Self::Incompatible { .. } => ErrorKind::TypeIncompatibility,
            Self::MissingMapBlockKey { .. }
            | Self::MalformedDirective { .. }
            | Self::MalformedValue { .. } => ErrorKind::Structural,
            Self::DocumentMarshal { .. }
            | Self::DocumentUnmarshal { .. }
            | Self::InvalidUtf8 { .. }
            | Self::Capability { .. } => ErrorKind::Delegate,
        }
    }

    pub(crate) fn incompatible(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self::Incompatible {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub(crate) fn narrowing(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self::Narrowing {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
