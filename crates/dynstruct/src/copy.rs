//! Deep copy and field scanning
//!
//! Deep copy is strict: the copy gets an equivalent field set and every
//! value must fit its destination, otherwise the whole copy fails.
//!
//! Scanning is tolerant: a [`ScanPlan`] pairs each source field with the
//! destination field of the same name and the identical type, and silently
//! drops everything else (absent, readonly, differently typed or outside the
//! requested subset). Plans depend only on the two record types, so
//! [`ScanPlanCache`] keeps them around for repeated scans between the same
//! shapes.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::builder::StructBuilder;
use crate::error::{StructError, StructResult};
use crate::record::Record;
use crate::ty::{RecordType, TypeId};
use crate::value::Value;

// ============================================================================
// Deep copy
// ============================================================================

/// Copy every field of `source` into the same position of `dest`
fn copy_fields(source: &Record, dest: &mut Record) -> StructResult<()> {
    for (index, (field, value)) in source.iter().enumerate() {
        let dest_field = dest.field(index)?;

        let source_kind = field.ty.deref_once().kind();
        let dest_kind = dest_field.ty.deref_once().kind();
        if source_kind != dest_kind {
            return Err(StructError::DeepCopyMismatch {
                field: field.name.clone(),
                reason: format!("the kinds are different ({} vs {})", source_kind, dest_kind),
            });
        }
        if !value.conforms_to(&dest_field.ty) {
            return Err(StructError::DeepCopyMismatch {
                field: field.name.clone(),
                reason: format!("{} does not fit {}", value.describe(), dest_field.ty),
            });
        }

        let len = dest.len();
        let slot = dest
            .slot_mut(index)
            .ok_or(StructError::IndexOutOfRange { index, len })?;
        *slot = value.clone();
    }
    Ok(())
}

impl Record {
    /// Independent copy under a freshly materialized, equivalent type
    pub fn deep_copy(&self) -> StructResult<Record> {
        let source_ty = self.record_type();
        let ty = Arc::new(RecordType::new(
            source_ty.tag(),
            source_ty.fields().to_vec(),
        ));
        let mut copy = Record::zero(ty);
        copy_fields(self, &mut copy)?;
        Ok(copy)
    }
}

impl StructBuilder {
    /// Independent, built copy of this builder and its instance
    ///
    /// The copy has the same field names, external names and flags; changing
    /// either side afterwards never affects the other.
    pub fn deep_copy(&self) -> StructResult<StructBuilder> {
        let source = self.instance("deep copy")?;

        let mut copy =
            StructBuilder::new(self.tag()).with_codec_options(self.codec_options().clone());
        for field in source.record_type().fields() {
            copy.add_prebuilt_field(field.clone())?;
        }
        copy.build();
        copy_fields(source, copy.instance_mut("deep copy")?)?;

        debug!(
            source_type = %source.record_type().id(),
            fields = source.len(),
            "deep copied struct"
        );
        Ok(copy)
    }
}

// ============================================================================
// Scanning
// ============================================================================

/// Precomputed field pairing between two record types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    source: TypeId,
    dest: TypeId,
    /// (source index, destination index)
    pairs: Vec<(usize, usize)>,
}

impl ScanPlan {
    /// Pair fields of `source` with fields of `dest`
    ///
    /// A non-empty `fields` list restricts the plan to those source names.
    pub fn new(source: &RecordType, dest: &RecordType, fields: &[&str]) -> Self {
        let mut pairs = Vec::new();

        for (index, field) in source.fields().iter().enumerate() {
            if !fields.is_empty() && !fields.contains(&field.name.as_str()) {
                continue;
            }
            let Some(dest_index) = dest.field_index(&field.name) else {
                trace!(field = %field.name, "scan skip: no destination field");
                continue;
            };
            let dest_field = &dest.fields()[dest_index];
            if dest_field.readonly {
                trace!(field = %field.name, "scan skip: destination readonly");
                continue;
            }
            if dest_field.ty != field.ty {
                trace!(
                    field = %field.name,
                    source_ty = %field.ty,
                    dest_ty = %dest_field.ty,
                    "scan skip: type differs"
                );
                continue;
            }
            pairs.push((index, dest_index));
        }

        Self {
            source: source.id(),
            dest: dest.id(),
            pairs,
        }
    }

    /// Field pairs the plan copies
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Number of fields the plan copies
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the plan copies nothing
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Copy the planned fields, returning how many were copied
    ///
    /// Fails if the records are not of the types the plan was built for.
    pub fn apply(&self, source: &Record, dest: &mut Record) -> StructResult<usize> {
        let source_id = source.record_type().id();
        let dest_id = dest.record_type().id();
        if source_id != self.source || dest_id != self.dest {
            return Err(StructError::ScanPlanMismatch {
                expected: format!("{} -> {}", self.source, self.dest),
                actual: format!("{} -> {}", source_id, dest_id),
            });
        }
        Ok(self.execute(source, dest))
    }

    fn execute(&self, source: &Record, dest: &mut Record) -> usize {
        let mut copied = 0;
        for &(from, to) in &self.pairs {
            if let (Some(value), Some(slot)) = (source.slot(from), dest.slot_mut(to)) {
                *slot = value.clone();
                copied += 1;
            }
        }
        copied
    }
}

impl Record {
    /// Copy same-named, same-typed fields into `dest`
    ///
    /// Returns the number of fields copied; mismatches are skipped.
    pub fn scan_into(&self, dest: &mut Record, fields: &[&str]) -> usize {
        let plan = ScanPlan::new(self.record_type(), dest.record_type(), fields);
        let copied = plan.execute(self, dest);
        debug!(copied, requested = fields.len(), "scanned record");
        copied
    }
}

impl StructBuilder {
    /// Scan this builder's instance into another built builder's instance
    pub fn scan_into(&self, dest: &mut StructBuilder, fields: &[&str]) -> StructResult<usize> {
        let source = self.instance("scan")?;
        let dest = dest.instance_mut("scan into")?;
        Ok(source.scan_into(dest, fields))
    }
}

fn not_a_record(role: &'static str, value: Option<&Value>) -> StructError {
    StructError::NotARecord {
        role,
        actual: value.map_or_else(|| "empty optional".to_string(), Value::describe),
    }
}

fn record_target(dest: &mut Value) -> StructResult<&mut Record> {
    match dest {
        Value::Record(record) => Ok(record),
        Value::Optional(Some(inner)) => match inner.as_mut() {
            Value::Record(record) => Ok(record),
            other => Err(not_a_record("Destination", Some(other))),
        },
        Value::Optional(None) => Err(not_a_record("Destination", None)),
        other => Err(not_a_record("Destination", Some(other))),
    }
}

/// Scan between two dynamic values
///
/// `source` must hold a record, directly or behind one optional level;
/// `dest` must hold a record to write into. Only those structural problems
/// fail; field mismatches are skipped.
pub fn scan_into(source: &Value, dest: &mut Value, fields: &[&str]) -> StructResult<usize> {
    let source = match source.deref_once() {
        Some(Value::Record(record)) => record,
        other => return Err(not_a_record("Source", other)),
    };
    let dest = record_target(dest)?;
    Ok(source.scan_into(dest, fields))
}

/// Memoized scan plans keyed by source type, destination type and field subset
#[derive(Debug, Default)]
pub struct ScanPlanCache {
    plans: FxHashMap<(TypeId, TypeId, Vec<String>), Arc<ScanPlan>>,
}

impl ScanPlanCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan for the given pair of types, computing it on first use
    pub fn plan(&mut self, source: &RecordType, dest: &RecordType, fields: &[&str]) -> Arc<ScanPlan> {
        let mut subset: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        subset.sort();
        subset.dedup();

        self.plans
            .entry((source.id(), dest.id(), subset))
            .or_insert_with(|| Arc::new(ScanPlan::new(source, dest, fields)))
            .clone()
    }

    /// Scan `source` into `dest` through a cached plan
    pub fn scan(&mut self, source: &Record, dest: &mut Record, fields: &[&str]) -> usize {
        let plan = self.plan(source.record_type(), dest.record_type(), fields);
        plan.execute(source, dest)
    }

    /// Number of cached plans
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether no plan is cached
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Drop all cached plans
    pub fn clear(&mut self) {
        self.plans.clear();
    }
}
