//! Core type definitions for dynamic records
//!
//! A [`ValueType`] is the type handle a field is declared with. A
//! [`RecordType`] is the materialized shape produced by
//! [`StructBuilder::build`](crate::StructBuilder::build): an ordered list of
//! field descriptors plus the encoding tag used to pick external names.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{StructError, StructResult};
use crate::field::FieldDescriptor;

/// Global counter for materialized record types
static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

fn generate_type_id() -> TypeId {
    TypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Process-unique identity of one materialization
///
/// Two record types may be structurally identical and still carry different
/// ids; the id is only used to key cached scan plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u64);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Coarse classification of a type, used for set-time checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// Ordered sequence of one element type
    List,
    /// Key/value mapping
    Map,
    /// Single-level indirection that may be empty
    Optional,
    /// Nested record
    Record,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::String => write!(f, "string"),
            Kind::Int => write!(f, "int"),
            Kind::Float => write!(f, "float"),
            Kind::Bool => write!(f, "bool"),
            Kind::List => write!(f, "list"),
            Kind::Map => write!(f, "map"),
            Kind::Optional => write!(f, "optional"),
            Kind::Record => write!(f, "record"),
        }
    }
}

/// Declared type of a record field
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    /// `string`
    String,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `list<T>`
    List(Box<ValueType>),
    /// `map<K, V>`; `K` is always comparable
    Map(Box<ValueType>, Box<ValueType>),
    /// `optional<T>`
    Optional(Box<ValueType>),
    /// Nested record of a materialized type
    Record(Arc<RecordType>),
}

impl ValueType {
    /// List of `element`
    pub fn list(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    /// Map from `key` to `value`
    ///
    /// Fails if `key` cannot be used as a lookup key.
    pub fn map(key: ValueType, value: ValueType) -> StructResult<Self> {
        if !key.is_comparable() {
            return Err(StructError::NonComparableKey {
                key_type: key.to_string(),
            });
        }
        Ok(ValueType::Map(Box::new(key), Box::new(value)))
    }

    /// Optional `inner`
    pub fn optional(inner: ValueType) -> Self {
        ValueType::Optional(Box::new(inner))
    }

    /// Nested record type
    pub fn record(ty: Arc<RecordType>) -> Self {
        ValueType::Record(ty)
    }

    /// Kind of this type
    pub fn kind(&self) -> Kind {
        match self {
            ValueType::String => Kind::String,
            ValueType::Int => Kind::Int,
            ValueType::Float => Kind::Float,
            ValueType::Bool => Kind::Bool,
            ValueType::List(_) => Kind::List,
            ValueType::Map(..) => Kind::Map,
            ValueType::Optional(_) => Kind::Optional,
            ValueType::Record(_) => Kind::Record,
        }
    }

    /// Whether values of this type can key a map
    pub fn is_comparable(&self) -> bool {
        matches!(self, ValueType::String | ValueType::Int | ValueType::Bool)
    }

    /// Strip one level of optional indirection
    pub fn deref_once(&self) -> &ValueType {
        match self {
            ValueType::Optional(inner) => inner,
            other => other,
        }
    }

    /// Record type, if this is a record
    pub fn as_record(&self) -> Option<&Arc<RecordType>> {
        match self {
            ValueType::Record(ty) => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::List(elem) => write!(f, "list<{}>", elem),
            ValueType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            ValueType::Optional(inner) => write!(f, "optional<{}>", inner),
            ValueType::Record(ty) => write!(f, "{}", ty),
        }
    }
}

/// Materialized record shape
///
/// Immutable once created. Field order is significant: it defines positional
/// access.
#[derive(Debug, Clone)]
pub struct RecordType {
    id: TypeId,
    tag: String,
    fields: Vec<FieldDescriptor>,
    by_name: FxHashMap<String, usize>,
}

impl RecordType {
    /// Materialize a record type from ordered descriptors
    ///
    /// Callers are expected to have validated the descriptors; the builder
    /// does so as fields are added.
    pub(crate) fn new(tag: &str, fields: Vec<FieldDescriptor>) -> Self {
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Self {
            id: generate_type_id(),
            tag: tag.to_string(),
            fields,
            by_name,
        }
    }

    /// Unique id of this materialization
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Encoding tag used to select external names
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Ordered field descriptors
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the type has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of a field by internal name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Descriptor of a field by internal name
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    /// Descriptor of a field by position
    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    /// External name of a field under this type's tag
    pub fn external_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.external_name(&self.tag))
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id || (self.tag == other.tag && self.fields == other.fields)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record{{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.ty)?;
        }
        write!(f, "}}")
    }
}
