//! Field access by name and position
//!
//! Reads return owned copies of field values. Writes check the value against
//! the field's declared type before mutating the record in place:
//!
//! - an optional field accepts an optional value, or a bare value of its
//!   inner kind which is wrapped;
//! - any other field dereferences a present optional exactly once;
//! - after that the kinds must match, then the full type must conform.

use tracing::trace;

use crate::builder::StructBuilder;
use crate::error::{StructError, StructResult};
use crate::field::FieldDescriptor;
use crate::record::Record;
use crate::ty::{Kind, ValueType};
use crate::value::{FromValue, Value};

/// Check `value` against `field` and return what should be stored
pub(crate) fn coerce(field: &FieldDescriptor, value: Value) -> StructResult<Value> {
    if field.readonly {
        return Err(StructError::ReadOnlyField {
            name: field.name.clone(),
        });
    }

    let value = match (&field.ty, value) {
        (ValueType::Optional(inner), bare)
            if bare.kind() != Kind::Optional && bare.kind() == inner.kind() =>
        {
            Value::Optional(Some(Box::new(bare)))
        }
        (ValueType::Optional(_), value) => value,
        (_, Value::Optional(Some(inner))) => *inner,
        (_, value) => value,
    };

    if value.kind() != field.ty.kind() {
        return Err(StructError::KindMismatch {
            field: field.name.clone(),
            expected: field.ty.kind().to_string(),
            actual: value.kind().to_string(),
        });
    }
    if !value.conforms_to(&field.ty) {
        return Err(StructError::TypeMismatch {
            field: field.name.clone(),
            expected: field.ty.to_string(),
            actual: value.describe(),
        });
    }
    Ok(value)
}

impl Record {
    /// Whether a field with this name exists
    pub fn has_field(&self, name: &str) -> bool {
        self.record_type().field_index(name).is_some()
    }

    fn index_of(&self, name: &str) -> StructResult<usize> {
        self.record_type()
            .field_index(name)
            .ok_or_else(|| StructError::FieldNotFound {
                name: name.to_string(),
            })
    }

    /// Descriptor of the field at `index`
    pub fn field(&self, index: usize) -> StructResult<&FieldDescriptor> {
        self.record_type()
            .field(index)
            .ok_or(StructError::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Descriptor of the named field
    pub fn field_by_name(&self, name: &str) -> StructResult<&FieldDescriptor> {
        let index = self.index_of(name)?;
        self.field(index)
    }

    /// Borrow the current value of a field
    pub fn field_value(&self, name: &str) -> StructResult<&Value> {
        let index = self.index_of(name)?;
        self.slot(index).ok_or(StructError::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }

    /// Copy of the current value of a field
    pub fn get(&self, name: &str) -> StructResult<Value> {
        self.field_value(name).cloned()
    }

    /// Current value of a field converted to a Rust type
    pub fn get_as<T: FromValue>(&self, name: &str) -> StructResult<T> {
        T::from_value(self.field_value(name)?, name)
    }

    /// Set a field by name
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> StructResult<()> {
        let index = self.index_of(name)?;
        self.set_by_index(index, value)
    }

    /// Set a field by position
    pub fn set_by_index(&mut self, index: usize, value: impl Into<Value>) -> StructResult<()> {
        let value = coerce(self.field(index)?, value.into())?;
        trace!(index, kind = %value.kind(), "set field");
        let len = self.len();
        let slot = self
            .slot_mut(index)
            .ok_or(StructError::IndexOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }
}

impl StructBuilder {
    /// Descriptor of the materialized field at `index`
    pub fn field(&self, index: usize) -> StructResult<&FieldDescriptor> {
        self.instance("get field by index")?.field(index)
    }

    /// Descriptor of the named materialized field
    pub fn field_by_name(&self, name: &str) -> StructResult<&FieldDescriptor> {
        self.instance("get field by name")?.field_by_name(name)
    }

    /// Borrow the current value of a field
    pub fn field_value(&self, name: &str) -> StructResult<&Value> {
        self.instance("get field")?.field_value(name)
    }

    /// Copy of the current value of a field
    pub fn get(&self, name: &str) -> StructResult<Value> {
        self.instance("get field")?.get(name)
    }

    /// Current value of a field converted to a Rust type
    pub fn get_as<T: FromValue>(&self, name: &str) -> StructResult<T> {
        self.instance("get field")?.get_as(name)
    }

    /// Set a field by name
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> StructResult<()> {
        self.instance_mut("set field")?.set(name, value)
    }

    /// Set a field by position
    pub fn set_by_index(&mut self, index: usize, value: impl Into<Value>) -> StructResult<()> {
        self.instance_mut("set field")?.set_by_index(index, value)
    }

    /// The whole instance, read-only
    pub fn as_record(&self) -> StructResult<&Record> {
        self.instance("get interface")
    }

    /// The whole instance, mutable
    pub fn as_record_mut(&mut self) -> StructResult<&mut Record> {
        self.instance_mut("get pointer to")
    }
}
