//! Deriving a builder from an existing shape
//!
//! Anything that can name a record type (a type, an instance, another
//! builder, a dynamic value holding a record) implements [`ShapeSource`], and
//! [`StructBuilder::from_source`] copies its field set, optionally restricted
//! to a subset of field names.

use std::sync::Arc;

use tracing::debug;

use crate::builder::StructBuilder;
use crate::error::{StructError, StructResult};
use crate::record::Record;
use crate::ty::RecordType;
use crate::value::Value;

/// Something a record shape can be derived from
pub trait ShapeSource {
    /// The record type describing this source
    fn shape(&self) -> StructResult<Arc<RecordType>>;
}

impl ShapeSource for RecordType {
    fn shape(&self) -> StructResult<Arc<RecordType>> {
        Ok(Arc::new(self.clone()))
    }
}

impl ShapeSource for Arc<RecordType> {
    fn shape(&self) -> StructResult<Arc<RecordType>> {
        Ok(self.clone())
    }
}

impl ShapeSource for Record {
    fn shape(&self) -> StructResult<Arc<RecordType>> {
        Ok(self.record_type().clone())
    }
}

impl ShapeSource for StructBuilder {
    fn shape(&self) -> StructResult<Arc<RecordType>> {
        self.record_type().cloned()
    }
}

impl ShapeSource for Value {
    fn shape(&self) -> StructResult<Arc<RecordType>> {
        match self.deref_once() {
            Some(Value::Record(record)) => Ok(record.record_type().clone()),
            Some(other) => Err(StructError::NotARecord {
                role: "Source",
                actual: other.describe(),
            }),
            None => Err(StructError::NotARecord {
                role: "Source",
                actual: "empty optional".to_string(),
            }),
        }
    }
}

impl StructBuilder {
    /// Create an unbuilt builder with the field set of `source`
    ///
    /// With an empty `fields` list every source field is taken, otherwise only
    /// the named ones, in the order given. Fields whose external name under
    /// `tag` is the skip marker are left out either way.
    pub fn from_source<S: ShapeSource + ?Sized>(
        source: &S,
        tag: &str,
        fields: &[&str],
    ) -> StructResult<StructBuilder> {
        let shape = source.shape()?;
        let mut builder = StructBuilder::new(tag);

        let selected: Vec<_> = if fields.is_empty() {
            shape.fields().iter().collect()
        } else {
            fields
                .iter()
                .map(|name| {
                    shape
                        .field_by_name(name)
                        .ok_or_else(|| StructError::FieldNotFound {
                            name: name.to_string(),
                        })
                })
                .collect::<StructResult<Vec<_>>>()?
        };

        for field in selected {
            if field.is_skipped(tag) {
                continue;
            }
            let mut derived = field.clone();
            let external = field.external_name(tag).to_string();
            derived.tags.clear();
            derived.tags.insert(tag.to_string(), external);
            builder.add_prebuilt_field(derived)?;
        }

        debug!(
            source_type = %shape.id(),
            tag,
            fields = builder.pending_field_count(),
            "derived builder from source"
        );
        Ok(builder)
    }
}
