//! Dynamic record builder
//!
//! [`StructBuilder`] accumulates field descriptors and materializes them into
//! a [`RecordType`] plus one zero-valued [`Record`] instance.
//!
//! Adding a field after a build invalidates the materialized type; every
//! operation that reads or writes the instance fails with
//! [`StructError::NotBuilt`] until [`StructBuilder::build`] runs again.
//!
//! ```ignore
//! let mut person = StructBuilder::new("json");
//! person.string_field("Name", "name", true)?;
//! person.int_field("Age", "age", false)?;
//! person.build();
//! person.set("Name", "Nigel")?;
//! ```

use std::sync::Arc;

use tracing::{debug, trace};

use crate::codec::CodecOptions;
use crate::error::{StructError, StructResult};
use crate::field::FieldDescriptor;
use crate::record::Record;
use crate::ty::{RecordType, ValueType};

/// Builder for a record type materialized at runtime
#[derive(Debug, Clone)]
pub struct StructBuilder {
    /// Tag key used for external names
    tag: String,
    /// Pending descriptors, in declaration order
    fields: Vec<FieldDescriptor>,
    /// Materialized instance; `None` until built or after invalidation
    instance: Option<Record>,
    /// Options used by marshal/unmarshal
    codec: CodecOptions,
}

impl StructBuilder {
    /// Create an empty builder whose external names live under `tag`
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: Vec::new(),
            instance: None,
            codec: CodecOptions::default(),
        }
    }

    /// Replace the codec options
    pub fn with_codec_options(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }

    /// Encoding tag
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Codec options used by marshal/unmarshal
    pub fn codec_options(&self) -> &CodecOptions {
        &self.codec
    }

    /// Replace the codec options in place
    pub fn set_codec_options(&mut self, codec: CodecOptions) {
        self.codec = codec;
    }

    /// Add a field
    ///
    /// An empty `external` name defaults to `name`.
    pub fn add_field(
        &mut self,
        name: &str,
        external: &str,
        ty: ValueType,
        required: bool,
    ) -> StructResult<()> {
        let external = if external.is_empty() { name } else { external };
        let mut field = FieldDescriptor::new(name, ty).with_tag(self.tag.clone(), external);
        if required {
            field = field.required();
        }
        self.push_field(field)
    }

    /// Add a fully formed descriptor
    ///
    /// Embedded descriptors are rejected.
    pub fn add_prebuilt_field(&mut self, field: FieldDescriptor) -> StructResult<()> {
        if field.embedded {
            return Err(StructError::EmbeddedField { name: field.name });
        }
        self.push_field(field)
    }

    fn push_field(&mut self, field: FieldDescriptor) -> StructResult<()> {
        if field.name.is_empty() {
            return Err(StructError::EmptyFieldName);
        }
        if self.fields.iter().any(|f| f.name == field.name) {
            return Err(StructError::DuplicateField { name: field.name });
        }
        if !field.is_skipped(&self.tag) {
            let external = field.external_name(&self.tag);
            let taken = self
                .fields
                .iter()
                .find(|f| !f.is_skipped(&self.tag) && f.external_name(&self.tag) == external);
            if let Some(existing) = taken {
                return Err(StructError::DuplicateExternalName {
                    name: field.name.clone(),
                    external: external.to_string(),
                    existing: existing.name.clone(),
                });
            }
        }
        check_map_keys(&field.ty)?;

        trace!(
            field = %field.name,
            ty = %field.ty,
            tags = %field.tag_string(),
            "adding field"
        );
        // Next access must re-materialize
        self.instance = None;
        self.fields.push(field);
        Ok(())
    }

    /// Add a `string` field
    pub fn string_field(&mut self, name: &str, external: &str, required: bool) -> StructResult<()> {
        self.add_field(name, external, ValueType::String, required)
    }

    /// Add an `int` field
    pub fn int_field(&mut self, name: &str, external: &str, required: bool) -> StructResult<()> {
        self.add_field(name, external, ValueType::Int, required)
    }

    /// Add a `float` field
    pub fn float_field(&mut self, name: &str, external: &str, required: bool) -> StructResult<()> {
        self.add_field(name, external, ValueType::Float, required)
    }

    /// Add a `bool` field
    pub fn bool_field(&mut self, name: &str, external: &str, required: bool) -> StructResult<()> {
        self.add_field(name, external, ValueType::Bool, required)
    }

    /// Add a `list<element>` field
    pub fn list_field(
        &mut self,
        name: &str,
        external: &str,
        element: ValueType,
        required: bool,
    ) -> StructResult<()> {
        self.add_field(name, external, ValueType::list(element), required)
    }

    /// Add a `map<key, value>` field; `key` must be comparable
    pub fn map_field(
        &mut self,
        name: &str,
        external: &str,
        key: ValueType,
        value: ValueType,
        required: bool,
    ) -> StructResult<()> {
        let ty = ValueType::map(key, value)?;
        self.add_field(name, external, ty, required)
    }

    /// Add an `optional<inner>` field
    pub fn optional_field(
        &mut self,
        name: &str,
        external: &str,
        inner: ValueType,
        required: bool,
    ) -> StructResult<()> {
        self.add_field(name, external, ValueType::optional(inner), required)
    }

    /// Add a nested record field typed after another built builder
    pub fn record_field(
        &mut self,
        name: &str,
        external: &str,
        other: &StructBuilder,
        required: bool,
    ) -> StructResult<()> {
        let ty = other.record_type()?.clone();
        self.add_field(name, external, ValueType::record(ty), required)
    }

    /// Materialize the record type (if stale) and a fresh zero instance
    pub fn build(&mut self) -> &mut Self {
        let ty = match &self.instance {
            Some(record) => record.record_type().clone(),
            None => {
                let ty = Arc::new(RecordType::new(&self.tag, self.fields.clone()));
                debug!(
                    tag = %self.tag,
                    type_id = %ty.id(),
                    fields = ty.len(),
                    "materialized record type"
                );
                ty
            }
        };
        self.instance = Some(Record::zero(ty));
        self
    }

    /// Force re-materialization, discarding the current instance
    pub fn rebuild(&mut self) -> &mut Self {
        self.instance = None;
        self.build()
    }

    /// Whether the builder is built and its instance is usable
    pub fn is_built(&self) -> bool {
        self.instance.is_some()
    }

    /// Number of fields in the materialized type; 0 if not built
    pub fn field_count(&self) -> usize {
        self.instance.as_ref().map_or(0, Record::len)
    }

    /// Number of fields added so far, built or not
    pub fn pending_field_count(&self) -> usize {
        self.fields.len()
    }

    /// Pending descriptors in declaration order
    pub fn pending_fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Materialized record type
    pub fn record_type(&self) -> StructResult<&Arc<RecordType>> {
        self.instance("get record type").map(Record::record_type)
    }

    pub(crate) fn instance(&self, operation: &'static str) -> StructResult<&Record> {
        self.instance
            .as_ref()
            .ok_or(StructError::NotBuilt { operation })
    }

    pub(crate) fn instance_mut(&mut self, operation: &'static str) -> StructResult<&mut Record> {
        self.instance
            .as_mut()
            .ok_or(StructError::NotBuilt { operation })
    }
}

/// Reject map types (at any depth) whose key cannot be compared
fn check_map_keys(ty: &ValueType) -> StructResult<()> {
    match ty {
        ValueType::Map(key, value) => {
            if !key.is_comparable() {
                return Err(StructError::NonComparableKey {
                    key_type: key.to_string(),
                });
            }
            check_map_keys(value)
        }
        ValueType::List(inner) | ValueType::Optional(inner) => check_map_keys(inner),
        _ => Ok(()),
    }
}
