//! Type descriptors for both object models.
//!
//! `Type` describes every shape a service-model value can take, plus the
//! `Wrapped` variant holding a `WrappedType` for resource-model values.
//! Struct types carry their ordered field definitions, the per-field
//! directive table, and an optional set of capabilities.

use crate::capability::Capabilities;
use crate::values::StructValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Type
// ============================================================================

/// Static type of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    /// Byte slice
    Bytes,
    /// String-backed enumeration
    Enum(Arc<EnumType>),
    /// Opaque "any JSON" document
    Document,
    Pointer(Box<Type>),
    Slice(Box<Type>),
    /// Map with string keys
    Map(Box<Type>),
    Struct(Arc<StructType>),
    Interface(Arc<InterfaceType>),
    /// Resource-model value with explicit null/unknown/known state
    Wrapped(WrappedType),
}

impl Type {
    /// Create a pointer type.
    pub fn pointer(elem: Type) -> Self {
        Self::Pointer(Box::new(elem))
    }

    /// Create a slice type.
    pub fn slice(elem: Type) -> Self {
        Self::Slice(Box::new(elem))
    }

    /// Create a string-keyed map type.
    pub fn map(elem: Type) -> Self {
        Self::Map(Box::new(elem))
    }

    /// Strip one level of pointer indirection.
    pub fn deref(&self) -> &Type {
        match self {
            Self::Pointer(elem) => elem,
            other => other,
        }
    }

    /// Whether a value of this type can be nil.
    pub fn is_nilable(&self) -> bool {
        matches!(
            self,
            Self::Bytes
                | Self::Document
                | Self::Pointer(_)
                | Self::Slice(_)
                | Self::Map(_)
                | Self::Interface(_)
        )
    }

    /// The struct type behind this type, looking through one pointer.
    pub fn as_struct(&self) -> Option<&Arc<StructType>> {
        match self.deref() {
            Self::Struct(st) => Some(st),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int32 => write!(f, "i32"),
            Self::Int64 => write!(f, "i64"),
            Self::Float32 => write!(f, "f32"),
            Self::Float64 => write!(f, "f64"),
            Self::String => write!(f, "String"),
            Self::Bytes => write!(f, "Vec<u8>"),
            Self::Enum(et) => write!(f, "{}", et.name),
            Self::Document => write!(f, "Document"),
            Self::Pointer(elem) => write!(f, "Option<{elem}>"),
            Self::Slice(elem) => write!(f, "Vec<{elem}>"),
            Self::Map(elem) => write!(f, "Map<String, {elem}>"),
            Self::Struct(st) => write!(f, "{}", st.name),
            Self::Interface(it) => write!(f, "dyn {}", it.name),
            Self::Wrapped(w) => write!(f, "{w}"),
        }
    }
}

// ============================================================================
// WrappedType
// ============================================================================

/// Type of a resource-model wrapped value.
#[derive(Debug, Clone, PartialEq)]
pub enum WrappedType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    /// String constrained to a string-backed enumeration
    StringEnum(Arc<EnumType>),
    /// String holding a JSON document
    Json,
    /// Ordered collection
    List(Box<WrappedType>),
    /// Unordered collection
    Set(Box<WrappedType>),
    /// String-keyed collection
    Map(Box<WrappedType>),
    /// Nested object whose attributes are the fields of a struct
    Object(Arc<StructType>),
}

impl WrappedType {
    /// Create a list type.
    pub fn list(elem: WrappedType) -> Self {
        Self::List(Box::new(elem))
    }

    /// Create a set type.
    pub fn set(elem: WrappedType) -> Self {
        Self::Set(Box::new(elem))
    }

    /// Create a map type.
    pub fn map(elem: WrappedType) -> Self {
        Self::Map(Box::new(elem))
    }

    /// Create a list-of-objects type.
    pub fn list_of(object: &Arc<StructType>) -> Self {
        Self::list(Self::Object(Arc::clone(object)))
    }

    /// Create a set-of-objects type.
    pub fn set_of(object: &Arc<StructType>) -> Self {
        Self::set(Self::Object(Arc::clone(object)))
    }

    /// Whether this is a single-valued primitive type.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Int32
                | Self::Int64
                | Self::Float32
                | Self::Float64
                | Self::String
                | Self::StringEnum(_)
                | Self::Json
        )
    }

    /// Element type of a list, set or map.
    pub fn element(&self) -> Option<&WrappedType> {
        match self {
            Self::List(elem) | Self::Set(elem) | Self::Map(elem) => Some(elem),
            _ => None,
        }
    }

    /// The object struct for `Object<S>`, `List<Object<S>>` and `Set<Object<S>>`.
    pub fn object_element(&self) -> Option<&Arc<StructType>> {
        match self {
            Self::Object(st) => Some(st),
            Self::List(elem) | Self::Set(elem) => match elem.as_ref() {
                Self::Object(st) => Some(st),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for WrappedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "BoolValue"),
            Self::Int32 => write!(f, "Int32Value"),
            Self::Int64 => write!(f, "Int64Value"),
            Self::Float32 => write!(f, "Float32Value"),
            Self::Float64 => write!(f, "Float64Value"),
            Self::String => write!(f, "StringValue"),
            Self::StringEnum(et) => write!(f, "StringEnum<{}>", et.name),
            Self::Json => write!(f, "JsonValue"),
            Self::List(elem) => write!(f, "List<{elem}>"),
            Self::Set(elem) => write!(f, "Set<{elem}>"),
            Self::Map(elem) => write!(f, "MapValue<{elem}>"),
            Self::Object(st) => write!(f, "Object<{}>", st.name),
        }
    }
}

// ============================================================================
// Named types
// ============================================================================

/// A string-backed enumeration type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { name: name.into() })
    }
}

/// An interface type and the struct types that implement it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceType {
    pub name: String,
    /// Names of the struct types satisfying this interface
    pub implementors: Vec<String>,
}

impl InterfaceType {
    pub fn new<I, S>(name: impl Into<String>, implementors: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            name: name.into(),
            implementors: implementors.into_iter().map(Into::into).collect(),
        })
    }

    /// Whether a value of type `ty` satisfies this interface.
    ///
    /// A struct satisfies it directly or through a pointer.
    pub fn implemented_by(&self, ty: &Type) -> bool {
        match ty {
            Type::Interface(other) => other.name == self.name,
            _ => ty
                .as_struct()
                .is_some_and(|st| self.implementors.iter().any(|name| *name == st.name)),
        }
    }
}

// ============================================================================
// Field directives
// ============================================================================

/// Per-field conversion directives, declared on resource-model fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDirectives {
    /// Null coalesces to the zero value on both paths
    pub legacy: bool,
    /// A zero source value flattens to null
    pub omit_empty: bool,
    /// Field is only written by Expand
    pub no_flatten: bool,
    /// Name of the items field of a legacy `{Items, Quantity}` wrapper
    pub xml_wrapper: Option<String>,
}

// ============================================================================
// Struct types
// ============================================================================

/// A single struct field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    /// Anonymous field whose struct fields are promoted one level
    pub embedded: bool,
    /// Unexported fields never take part in matching
    pub exported: bool,
    pub directives: FieldDirectives,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            embedded: false,
            exported: true,
            directives: FieldDirectives::default(),
        }
    }

    /// Create an embedded struct field named after its type.
    pub fn embedded(st: &Arc<StructType>) -> Self {
        Self {
            embedded: true,
            ..Self::new(st.name.clone(), Type::Struct(Arc::clone(st)))
        }
    }

    pub fn unexported(mut self) -> Self {
        self.exported = false;
        self
    }

    pub fn legacy(mut self) -> Self {
        self.directives.legacy = true;
        self
    }

    pub fn omit_empty(mut self) -> Self {
        self.directives.omit_empty = true;
        self
    }

    pub fn no_flatten(mut self) -> Self {
        self.directives.no_flatten = true;
        self
    }

    pub fn xml_wrapper(mut self, items_field: impl Into<String>) -> Self {
        self.directives.xml_wrapper = Some(items_field.into());
        self
    }

    pub fn with_directives(mut self, directives: FieldDirectives) -> Self {
        self.directives = directives;
        self
    }
}

/// Position of a visible field inside a struct value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldLocator {
    /// Index into the struct's own fields
    pub index: usize,
    /// Index into the embedded struct's fields for promoted fields
    pub promoted: Option<usize>,
}

/// A field as seen from outside the struct, after promotion.
#[derive(Debug, Clone, Copy)]
pub struct VisibleField<'a> {
    pub name: &'a str,
    pub ty: &'a Type,
    pub directives: &'a FieldDirectives,
    pub locator: FieldLocator,
}

/// A named struct type.
#[derive(Debug, Clone)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub capabilities: Capabilities,
}

impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl StructType {
    /// Create a struct type without capabilities.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Arc<Self> {
        Self::builder(name).fields(fields).build()
    }

    pub fn builder(name: impl Into<String>) -> StructTypeBuilder {
        StructTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
            capabilities: Capabilities::default(),
        }
    }

    /// The zero value of this struct.
    pub fn zero(self: &Arc<Self>) -> StructValue {
        StructValue::zero(self)
    }

    /// Exported fields in declaration order, with embedded struct fields
    /// promoted one level.
    ///
    /// Outer fields shadow promoted fields of the same name; a name promoted
    /// by more than one embedded struct is ambiguous and omitted.
    pub fn visible_fields(&self) -> Vec<VisibleField<'_>> {
        let mut promoted_counts: HashMap<&str, usize> = HashMap::new();
        for field in self.fields.iter().filter(|f| f.embedded && f.exported) {
            if let Type::Struct(inner) = &field.ty {
                for inner_field in inner.fields.iter().filter(|f| f.exported && !f.embedded) {
                    *promoted_counts.entry(inner_field.name.as_str()).or_default() += 1;
                }
            }
        }

        let own = |name: &str| {
            self.fields
                .iter()
                .any(|f| f.exported && !(f.embedded && matches!(f.ty, Type::Struct(_))) && f.name == name)
        };

        let mut visible = Vec::new();
        for (index, field) in self.fields.iter().enumerate() {
            if !field.exported {
                continue;
            }
            match (&field.ty, field.embedded) {
                (Type::Struct(inner), true) => {
                    for (promoted, inner_field) in inner.fields.iter().enumerate() {
                        if !inner_field.exported || inner_field.embedded {
                            continue;
                        }
                        let name = inner_field.name.as_str();
                        if own(name) || promoted_counts.get(name).copied().unwrap_or(0) > 1 {
                            continue;
                        }
                        visible.push(VisibleField {
                            name,
                            ty: &inner_field.ty,
                            directives: &inner_field.directives,
                            locator: FieldLocator {
                                index,
                                promoted: Some(promoted),
                            },
                        });
                    }
                }
                _ => visible.push(VisibleField {
                    name: &field.name,
                    ty: &field.ty,
                    directives: &field.directives,
                    locator: FieldLocator {
                        index,
                        promoted: None,
                    },
                }),
            }
        }
        visible
    }

    /// Locate a visible field by exact name.
    pub fn locate(&self, name: &str) -> Option<FieldLocator> {
        self.visible_fields()
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.locator)
    }

    /// Type of a visible field by exact name.
    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.visible_fields()
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.ty)
    }
}

/// Builder for `StructType`.
pub struct StructTypeBuilder {
    name: String,
    fields: Vec<FieldDef>,
    capabilities: Capabilities,
}

impl StructTypeBuilder {
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn build(self) -> Arc<StructType> {
        Arc::new(StructType {
            name: self.name,
            fields: self.fields,
            capabilities: self.capabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded_pair() -> Arc<StructType> {
        let inner = StructType::new(
            "Inner",
            vec![
                FieldDef::new("Name", Type::String),
                FieldDef::new("Shadowed", Type::Int64),
                FieldDef::new("secret", Type::String).unexported(),
            ],
        );
        StructType::new(
            "Outer",
            vec![
                FieldDef::new("Id", Type::String),
                FieldDef::embedded(&inner),
                FieldDef::new("Shadowed", Type::String),
            ],
        )
    }

    #[test]
    fn test_visible_fields_promote_embedded() {
        let outer = embedded_pair();
        let names: Vec<&str> = outer.visible_fields().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Id", "Name", "Shadowed"]);

        let name = outer.locate("Name").unwrap();
        assert_eq!(
            name,
            FieldLocator {
                index: 1,
                promoted: Some(0)
            }
        );
        // The outer field wins over the promoted one.
        assert_eq!(outer.field_type("Shadowed"), Some(&Type::String));
    }

    #[test]
    fn test_ambiguous_promotion_is_hidden() {
        let a = StructType::new("A", vec![FieldDef::new("Name", Type::String)]);
        let b = StructType::new("B", vec![FieldDef::new("Name", Type::String)]);
        let both = StructType::new("Both", vec![FieldDef::embedded(&a), FieldDef::embedded(&b)]);
        assert!(both.visible_fields().is_empty());
    }

    #[test]
    fn test_interface_implemented_by() {
        let member = StructType::new("MemberA", vec![]);
        let other = StructType::new("Other", vec![]);
        let iface = InterfaceType::new("Union", ["MemberA"]);

        assert!(iface.implemented_by(&Type::Struct(member.clone())));
        assert!(iface.implemented_by(&Type::pointer(Type::Struct(member))));
        assert!(!iface.implemented_by(&Type::Struct(other)));
        assert!(!iface.implemented_by(&Type::String));
    }

    #[test]
    fn test_type_display() {
        let st = StructType::new("Child", vec![]);
        assert_eq!(Type::pointer(Type::String).to_string(), "Option<String>");
        assert_eq!(
            Type::slice(Type::pointer(Type::Struct(st.clone()))).to_string(),
            "Vec<Option<Child>>"
        );
        assert_eq!(WrappedType::list_of(&st).to_string(), "List<Object<Child>>");
        assert_eq!(
            Type::Wrapped(WrappedType::map(WrappedType::Int64)).to_string(),
            "MapValue<Int64Value>"
        );
    }

    #[test]
    fn test_object_element() {
        let st = StructType::new("Child", vec![]);
        assert!(WrappedType::set_of(&st).object_element().is_some());
        assert!(WrappedType::Object(st).object_element().is_some());
        assert!(WrappedType::list(WrappedType::String).object_element().is_none());
        assert!(WrappedType::String.is_scalar());
    }
}
