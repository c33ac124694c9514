//! Record instances
//!
//! A [`Record`] pairs a materialized [`RecordType`] with one value per field.
//! Every stored value conforms to its field's declared type; the setters in
//! [`crate::access`] and the decoder in [`crate::codec`] maintain this.

use std::sync::Arc;

use crate::field::FieldDescriptor;
use crate::ty::RecordType;
use crate::value::Value;

/// Instance of a materialized record type
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    ty: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    /// Zero-valued instance of `ty`
    pub fn zero(ty: Arc<RecordType>) -> Self {
        let values = ty.fields().iter().map(|f| Value::zero(&f.ty)).collect();
        Self { ty, values }
    }

    /// The record's type
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// Field values in declaration order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(descriptor, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.ty.fields().iter().zip(self.values.iter())
    }

    /// Raw slot access; bypasses type and readonly checks
    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.values.get_mut(index)
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}
