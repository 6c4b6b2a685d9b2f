//! Dynamic values for both object models.
//!
//! A `Value` always knows its `Type`: nil pointers, slices, maps and
//! interfaces carry their element type, so a converter can pick a target
//! shape without a live payload. Resource-model values are `Value::Wrapped`.

use crate::types::{EnumType, FieldLocator, InterfaceType, StructType, Type, WrappedType};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Value
// ============================================================================

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    /// Byte slice; `None` is a nil slice
    Bytes(Option<Vec<u8>>),
    Enum(EnumValue),
    /// Opaque JSON document; `None` is nil
    Document(Option<serde_json::Value>),
    Pointer {
        elem: Type,
        value: Option<Box<Value>>,
    },
    Slice {
        elem: Type,
        items: Option<Vec<Value>>,
    },
    Map {
        elem: Type,
        entries: Option<BTreeMap<String, Value>>,
    },
    Struct(StructValue),
    Interface {
        iface: Arc<InterfaceType>,
        value: Option<Box<Value>>,
    },
    Wrapped(WrappedValue),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(Some(b.into()))
    }

    pub fn enumeration(ty: &Arc<EnumType>, value: impl Into<String>) -> Self {
        Self::Enum(EnumValue::new(ty, value))
    }

    pub fn document(doc: serde_json::Value) -> Self {
        Self::Document(Some(doc))
    }

    /// Create a non-nil pointer to `value`.
    pub fn pointer(value: Value) -> Self {
        Self::Pointer {
            elem: value.ty(),
            value: Some(Box::new(value)),
        }
    }

    pub fn nil_pointer(elem: Type) -> Self {
        Self::Pointer { elem, value: None }
    }

    pub fn slice(elem: Type, items: Vec<Value>) -> Self {
        Self::Slice {
            elem,
            items: Some(items),
        }
    }

    pub fn nil_slice(elem: Type) -> Self {
        Self::Slice { elem, items: None }
    }

    pub fn map(elem: Type, entries: BTreeMap<String, Value>) -> Self {
        Self::Map {
            elem,
            entries: Some(entries),
        }
    }

    pub fn nil_map(elem: Type) -> Self {
        Self::Map {
            elem,
            entries: None,
        }
    }

    pub fn interface(iface: &Arc<InterfaceType>, value: Value) -> Self {
        Self::Interface {
            iface: Arc::clone(iface),
            value: Some(Box::new(value)),
        }
    }

    pub fn nil_interface(iface: &Arc<InterfaceType>) -> Self {
        Self::Interface {
            iface: Arc::clone(iface),
            value: None,
        }
    }

    /// The static type of this value.
    pub fn ty(&self) -> Type {
        match self {
            Self::Bool(_) => Type::Bool,
            Self::Int32(_) => Type::Int32,
            Self::Int64(_) => Type::Int64,
            Self::Float32(_) => Type::Float32,
            Self::Float64(_) => Type::Float64,
            Self::String(_) => Type::String,
            Self::Bytes(_) => Type::Bytes,
            Self::Enum(e) => Type::Enum(Arc::clone(&e.ty)),
            Self::Document(_) => Type::Document,
            Self::Pointer { elem, .. } => Type::pointer(elem.clone()),
            Self::Slice { elem, .. } => Type::slice(elem.clone()),
            Self::Map { elem, .. } => Type::map(elem.clone()),
            Self::Struct(sv) => Type::Struct(Arc::clone(&sv.ty)),
            Self::Interface { iface, .. } => Type::Interface(Arc::clone(iface)),
            Self::Wrapped(w) => Type::Wrapped(w.ty.clone()),
        }
    }

    /// Whether this is a nil pointer, slice, map, interface, byte slice or document.
    pub fn is_nil(&self) -> bool {
        match self {
            Self::Bytes(b) => b.is_none(),
            Self::Document(d) => d.is_none(),
            Self::Pointer { value, .. } | Self::Interface { value, .. } => value.is_none(),
            Self::Slice { items, .. } => items.is_none(),
            Self::Map { entries, .. } => entries.is_none(),
            _ => false,
        }
    }

    /// Whether this is the zero value of its type.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Bool(b) => !*b,
            Self::Int32(i) => *i == 0,
            Self::Int64(i) => *i == 0,
            Self::Float32(f) => *f == 0.0,
            Self::Float64(f) => *f == 0.0,
            Self::String(s) => s.is_empty(),
            Self::Enum(e) => e.value.is_empty(),
            Self::Struct(sv) => sv.fields.iter().all(Value::is_zero),
            Self::Wrapped(w) => w.is_null(),
            other => other.is_nil(),
        }
    }

    /// Follow a non-nil pointer; other values are returned as-is.
    pub fn deref(&self) -> &Value {
        match self {
            Self::Pointer {
                value: Some(inner), ..
            } => inner,
            other => other,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Self::Struct(sv) => Some(sv),
            _ => None,
        }
    }

    pub fn as_wrapped(&self) -> Option<&WrappedValue> {
        match self {
            Self::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Enum(e) => Some(&e.value),
            _ => None,
        }
    }

    /// Number of items of a non-nil slice or map.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Slice {
                items: Some(items), ..
            } => Some(items.len()),
            Self::Map {
                entries: Some(entries),
                ..
            } => Some(entries.len()),
            _ => None,
        }
    }
}

impl From<WrappedValue> for Value {
    fn from(w: WrappedValue) -> Self {
        Self::Wrapped(w)
    }
}

impl From<StructValue> for Value {
    fn from(sv: StructValue) -> Self {
        Self::Struct(sv)
    }
}

impl Type {
    /// The zero value of this type.
    ///
    /// Nil-able types are nil and wrapped types are null.
    pub fn zero(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int32 => Value::Int32(0),
            Self::Int64 => Value::Int64(0),
            Self::Float32 => Value::Float32(0.0),
            Self::Float64 => Value::Float64(0.0),
            Self::String => Value::String(String::new()),
            Self::Bytes => Value::Bytes(None),
            Self::Enum(et) => Value::enumeration(et, ""),
            Self::Document => Value::Document(None),
            Self::Pointer(elem) => Value::nil_pointer((**elem).clone()),
            Self::Slice(elem) => Value::nil_slice((**elem).clone()),
            Self::Map(elem) => Value::nil_map((**elem).clone()),
            Self::Struct(st) => Value::Struct(StructValue::zero(st)),
            Self::Interface(iface) => Value::nil_interface(iface),
            Self::Wrapped(w) => Value::Wrapped(WrappedValue::null(w.clone())),
        }
    }
}

/// A value of a string-backed enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub ty: Arc<EnumType>,
    pub value: String,
}

impl EnumValue {
    pub fn new(ty: &Arc<EnumType>, value: impl Into<String>) -> Self {
        Self {
            ty: Arc::clone(ty),
            value: value.into(),
        }
    }
}

// ============================================================================
// StructValue
// ============================================================================

/// A struct value; `fields` is aligned with `ty.fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub ty: Arc<StructType>,
    pub fields: Vec<Value>,
}

impl StructValue {
    pub fn zero(ty: &Arc<StructType>) -> Self {
        Self {
            ty: Arc::clone(ty),
            fields: ty.fields.iter().map(|f| f.ty.zero()).collect(),
        }
    }

    /// Set a visible field by name. Unknown names are ignored.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        if let Some(slot) = self.field_mut(name) {
            *slot = value.into();
        }
        self
    }

    pub fn get(&self, locator: FieldLocator) -> Option<&Value> {
        let field = self.fields.get(locator.index)?;
        match locator.promoted {
            None => Some(field),
            Some(promoted) => field.as_struct()?.fields.get(promoted),
        }
    }

    pub fn get_mut(&mut self, locator: FieldLocator) -> Option<&mut Value> {
        let field = self.fields.get_mut(locator.index)?;
        match locator.promoted {
            None => Some(field),
            Some(promoted) => match field {
                Value::Struct(inner) => inner.fields.get_mut(promoted),
                _ => None,
            },
        }
    }

    /// A visible field by exact name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.get(self.ty.locate(name)?)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        let locator = self.ty.locate(name)?;
        self.get_mut(locator)
    }
}

// ============================================================================
// WrappedValue
// ============================================================================

/// Query surface every resource-model value provides.
pub trait TypedValue {
    /// The value's current type.
    fn value_type(&self) -> &WrappedType;

    fn is_null(&self) -> bool;

    fn is_unknown(&self) -> bool;

    fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    /// Semantic equality: same type, same state and equal payloads.
    fn equal(&self, other: &Self) -> bool;
}

/// Null/unknown/known state of a wrapped value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueState {
    Null,
    Unknown,
    Known(Payload),
}

/// Payload of a known wrapped value.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// String, StringEnum and Json payloads
    String(String),
    /// List and Set elements
    Elements(Vec<WrappedValue>),
    /// Map entries
    Entries(BTreeMap<String, WrappedValue>),
    Object(StructValue),
}

/// A resource-model value carrying explicit null/unknown/known state.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedValue {
    pub ty: WrappedType,
    pub state: ValueState,
}

impl WrappedValue {
    pub fn null(ty: WrappedType) -> Self {
        Self {
            ty,
            state: ValueState::Null,
        }
    }

    pub fn unknown(ty: WrappedType) -> Self {
        Self {
            ty,
            state: ValueState::Unknown,
        }
    }

    /// Create a known value. The payload is not checked against `ty`.
    pub fn known(ty: WrappedType, payload: Payload) -> Self {
        Self {
            ty,
            state: ValueState::Known(payload),
        }
    }

    pub fn bool(b: bool) -> Self {
        Self::known(WrappedType::Bool, Payload::Bool(b))
    }

    pub fn int32(i: i32) -> Self {
        Self::known(WrappedType::Int32, Payload::Int32(i))
    }

    pub fn int64(i: i64) -> Self {
        Self::known(WrappedType::Int64, Payload::Int64(i))
    }

    pub fn float32(f: f32) -> Self {
        Self::known(WrappedType::Float32, Payload::Float32(f))
    }

    pub fn float64(f: f64) -> Self {
        Self::known(WrappedType::Float64, Payload::Float64(f))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::known(WrappedType::String, Payload::String(s.into()))
    }

    /// Construct an enum value from a string.
    pub fn string_enum(ty: &Arc<EnumType>, s: impl Into<String>) -> Self {
        Self::known(
            WrappedType::StringEnum(Arc::clone(ty)),
            Payload::String(s.into()),
        )
    }

    pub fn json(s: impl Into<String>) -> Self {
        Self::known(WrappedType::Json, Payload::String(s.into()))
    }

    pub fn list(elem: WrappedType, items: Vec<WrappedValue>) -> Self {
        Self::known(WrappedType::list(elem), Payload::Elements(items))
    }

    pub fn set(elem: WrappedType, items: Vec<WrappedValue>) -> Self {
        Self::known(WrappedType::set(elem), Payload::Elements(items))
    }

    pub fn map(elem: WrappedType, entries: BTreeMap<String, WrappedValue>) -> Self {
        Self::known(WrappedType::map(elem), Payload::Entries(entries))
    }

    pub fn object(sv: StructValue) -> Self {
        Self::known(WrappedType::Object(Arc::clone(&sv.ty)), Payload::Object(sv))
    }

    /// A known list of nested objects.
    pub fn list_of(ty: &Arc<StructType>, items: Vec<StructValue>) -> Self {
        Self::list(
            WrappedType::Object(Arc::clone(ty)),
            items.into_iter().map(Self::object).collect(),
        )
    }

    /// A known set of nested objects.
    pub fn set_of(ty: &Arc<StructType>, items: Vec<StructValue>) -> Self {
        Self::set(
            WrappedType::Object(Arc::clone(ty)),
            items.into_iter().map(Self::object).collect(),
        )
    }

    /// The zero value used by the `legacy` directive: a known zero scalar or
    /// a known empty collection. Enums and objects stay null.
    pub fn legacy_zero(ty: &WrappedType) -> Self {
        let payload = match ty {
            WrappedType::Bool => Payload::Bool(false),
            WrappedType::Int32 => Payload::Int32(0),
            WrappedType::Int64 => Payload::Int64(0),
            WrappedType::Float32 => Payload::Float32(0.0),
            WrappedType::Float64 => Payload::Float64(0.0),
            WrappedType::String => Payload::String(String::new()),
            WrappedType::List(_) | WrappedType::Set(_) => Payload::Elements(Vec::new()),
            WrappedType::Map(_) => Payload::Entries(BTreeMap::new()),
            WrappedType::StringEnum(_) | WrappedType::Json | WrappedType::Object(_) => {
                return Self::null(ty.clone())
            }
        };
        Self::known(ty.clone(), payload)
    }

    pub fn payload(&self) -> Option<&Payload> {
        match &self.state {
            ValueState::Known(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.payload()? {
            Payload::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.payload()? {
            Payload::Int64(i) => Some(*i),
            Payload::Int32(i) => Some(i64::from(*i)),
            _ => None,
        }
    }

    pub fn elements(&self) -> Option<&[WrappedValue]> {
        match self.payload()? {
            Payload::Elements(items) => Some(items),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&BTreeMap<String, WrappedValue>> {
        match self.payload()? {
            Payload::Entries(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&StructValue> {
        match self.payload()? {
            Payload::Object(sv) => Some(sv),
            _ => None,
        }
    }

    /// The nested objects held by an object or object collection.
    ///
    /// `None` when the value is null or unknown. Null elements are skipped.
    pub fn objects(&self) -> Option<Vec<&StructValue>> {
        match self.payload()? {
            Payload::Object(sv) => Some(vec![sv]),
            Payload::Elements(items) => Some(items.iter().filter_map(WrappedValue::as_object).collect()),
            _ => None,
        }
    }
}

impl TypedValue for WrappedValue {
    fn value_type(&self) -> &WrappedType {
        &self.ty
    }

    fn is_null(&self) -> bool {
        matches!(self.state, ValueState::Null)
    }

    fn is_unknown(&self) -> bool {
        matches!(self.state, ValueState::Unknown)
    }

    fn equal(&self, other: &Self) -> bool {
        if self.ty != other.ty {
            return false;
        }
        match (&self.ty, self.payload(), other.payload()) {
            (WrappedType::Set(_), Some(Payload::Elements(a)), Some(Payload::Elements(b))) => {
                a.len() == b.len()
                    && a.iter().all(|x| b.iter().any(|y| x.equal(y)))
                    && b.iter().all(|y| a.iter().any(|x| x.equal(y)))
            }
            (_, Some(Payload::Elements(a)), Some(Payload::Elements(b))) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equal(y))
            }
            (_, Some(Payload::Entries(a)), Some(Payload::Entries(b))) => {
                a.len() == b.len()
                    && a.iter().all(|(k, x)| b.get(k).is_some_and(|y| x.equal(y)))
            }
            _ => self.state == other.state,
        }
    }
}
