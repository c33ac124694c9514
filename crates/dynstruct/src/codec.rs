//! JSON encoding of records
//!
//! Encoding goes through `serde`: [`Value`] and [`Record`] implement
//! `Serialize`, with record keys taken from each field's external name under
//! the record type's tag.
//!
//! Decoding parses the text with `serde_json` and then walks the parsed tree
//! against the record type:
//!
//! 1. Keys are matched to external names, exactly first and then ignoring
//!    case; unknown keys are ignored unless
//!    [`CodecOptions::deny_unknown_fields`] is set
//! 2. Missing keys keep the field's current value
//! 3. `null` clears an optional field and leaves any other field unchanged
//! 4. Nested records and maps are decoded into their current value; lists are
//!    replaced
//! 5. Nesting deeper than [`CodecOptions::max_depth`] is rejected
//!
//! The walk runs on a scratch copy that replaces the instance only when the
//! whole document decoded.

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as Json;
use tracing::trace;

use crate::builder::StructBuilder;
use crate::error::{StructError, StructResult};
use crate::record::Record;
use crate::ty::{RecordType, ValueType};
use crate::value::{MapKey, Value};

/// Default maximum nesting depth accepted by the decoder
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Options for marshal/unmarshal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecOptions {
    /// Maximum nesting depth of decoded documents
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Reject object keys that match no field
    #[serde(default)]
    pub deny_unknown_fields: bool,

    /// Indent encoded output
    #[serde(default)]
    pub pretty: bool,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            deny_unknown_fields: false,
            pretty: false,
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(S::Error::custom(format!("unsupported value: {}", f)));
                }
                serializer.serialize_f64(*f)
            }
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(&key.to_string(), value)?;
                }
                map.end()
            }
            Value::Optional(None) => serializer.serialize_none(),
            Value::Optional(Some(inner)) => serializer.serialize_some(inner.as_ref()),
            Value::Record(record) => record.serialize(serializer),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tag = self.record_type().tag();
        let mut map = serializer.serialize_map(None)?;
        for (field, value) in self.iter() {
            if field.is_skipped(tag) {
                continue;
            }
            map.serialize_entry(field.external_name(tag), value)?;
        }
        map.end()
    }
}

/// Encode a record to JSON bytes
pub fn encode(record: &Record, options: &CodecOptions) -> StructResult<Vec<u8>> {
    let encoded = if options.pretty {
        serde_json::to_vec_pretty(record)
    } else {
        serde_json::to_vec(record)
    };
    encoded.map_err(|e| StructError::Encode(e.to_string()))
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode JSON bytes into `record` in place
///
/// On error `record` is left untouched.
pub fn decode_into(record: &mut Record, data: &[u8], options: &CodecOptions) -> StructResult<()> {
    let json: Json =
        serde_json::from_slice(data).map_err(|e| StructError::decode("", e.to_string()))?;
    let mut scratch = record.clone();
    Decoder { options }.record(&mut scratch, &json, "", 0)?;
    *record = scratch;
    Ok(())
}

struct Decoder<'a> {
    options: &'a CodecOptions,
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}

/// Index of the field decoded from `key`
///
/// An exact external name wins over a case-insensitive one.
fn field_for_key(ty: &RecordType, key: &str) -> Option<usize> {
    let tag = ty.tag();
    let decodable = || {
        ty.fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_skipped(tag))
    };
    decodable()
        .find(|(_, f)| f.external_name(tag) == key)
        .or_else(|| {
            let folded = key.to_lowercase();
            decodable().find(|(_, f)| f.external_name(tag).to_lowercase() == folded)
        })
        .map(|(index, _)| index)
}

fn json_type_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl Decoder<'_> {
    fn check_depth(&self, path: &str, depth: usize) -> StructResult<()> {
        if depth > self.options.max_depth {
            return Err(StructError::decode(
                path,
                format!("exceeded maximum nesting depth of {}", self.options.max_depth),
            ));
        }
        Ok(())
    }

    fn record(&self, record: &mut Record, json: &Json, path: &str, depth: usize) -> StructResult<()> {
        self.check_depth(path, depth)?;
        let object = match json {
            Json::Null => return Ok(()),
            Json::Object(object) => object,
            other => {
                return Err(StructError::decode(
                    path,
                    format!("expected object, got {}", json_type_name(other)),
                ))
            }
        };

        let ty = record.record_type().clone();
        for (key, item) in object {
            let index = field_for_key(&ty, key);
            let Some(index) = index else {
                if self.options.deny_unknown_fields {
                    return Err(StructError::decode(path, format!("unknown field {:?}", key)));
                }
                trace!(key = %key, "ignoring unknown key");
                continue;
            };

            let field = &ty.fields()[index];
            let field_path = join(path, key);
            let len = record.len();
            let slot = record
                .slot_mut(index)
                .ok_or(StructError::IndexOutOfRange { index, len })?;
            self.value_into(slot, &field.ty, item, &field_path, depth + 1)?;
        }
        Ok(())
    }

    /// Decode `json` into `slot`, which currently holds a value of `ty`
    fn value_into(
        &self,
        slot: &mut Value,
        ty: &ValueType,
        json: &Json,
        path: &str,
        depth: usize,
    ) -> StructResult<()> {
        self.check_depth(path, depth)?;

        if json.is_null() {
            if let ValueType::Optional(_) = ty {
                *slot = Value::Optional(None);
            }
            return Ok(());
        }

        match ty {
            ValueType::Optional(inner) => {
                if !matches!(slot, Value::Optional(Some(_))) {
                    *slot = Value::some(Value::zero(inner));
                }
                if let Value::Optional(Some(current)) = slot {
                    self.value_into(current, inner, json, path, depth + 1)?;
                }
                Ok(())
            }
            ValueType::Record(_) => match slot {
                Value::Record(record) => self.record(record, json, path, depth),
                _ => Err(StructError::decode(path, "record slot holds a non-record value")),
            },
            ValueType::Map(key_ty, value_ty) => {
                let Json::Object(object) = json else {
                    return Err(StructError::decode(
                        path,
                        format!("expected object, got {}", json_type_name(json)),
                    ));
                };
                if !matches!(slot, Value::Map(_)) {
                    *slot = Value::zero(ty);
                }
                let Value::Map(entries) = slot else {
                    return Ok(());
                };
                for (text, item) in object {
                    let entry_path = join(path, text);
                    let key = MapKey::parse(text, key_ty).ok_or_else(|| {
                        StructError::decode(&entry_path, format!("invalid {} key {:?}", key_ty, text))
                    })?;
                    let entry = entries
                        .entry(key)
                        .or_insert_with(|| Value::zero(value_ty));
                    self.value_into(entry, value_ty, item, &entry_path, depth + 1)?;
                }
                Ok(())
            }
            ValueType::List(elem_ty) => {
                let Json::Array(items) = json else {
                    return Err(StructError::decode(
                        path,
                        format!("expected array, got {}", json_type_name(json)),
                    ));
                };
                let mut decoded = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let mut value = Value::zero(elem_ty);
                    self.value_into(&mut value, elem_ty, item, &join(path, &i.to_string()), depth + 1)?;
                    decoded.push(value);
                }
                *slot = Value::List(decoded);
                Ok(())
            }
            scalar => {
                *slot = self.scalar(scalar, json, path)?;
                Ok(())
            }
        }
    }

    fn scalar(&self, ty: &ValueType, json: &Json, path: &str) -> StructResult<Value> {
        let value = match (ty, json) {
            (ValueType::String, Json::String(s)) => Some(Value::String(s.clone())),
            (ValueType::Bool, Json::Bool(b)) => Some(Value::Bool(*b)),
            (ValueType::Int, Json::Number(n)) => n.as_i64().map(Value::Int),
            (ValueType::Float, Json::Number(n)) => n.as_f64().map(Value::Float),
            _ => None,
        };
        value.ok_or_else(|| {
            StructError::decode(
                path,
                format!("cannot decode {} {} into {}", json_type_name(json), json, ty),
            )
        })
    }
}

// ============================================================================
// Builder entry points
// ============================================================================

impl StructBuilder {
    /// Encode the instance with the builder's codec options
    pub fn marshal(&self) -> StructResult<Vec<u8>> {
        self.marshal_with(self.codec_options())
    }

    /// Encode the instance with explicit options
    pub fn marshal_with(&self, options: &CodecOptions) -> StructResult<Vec<u8>> {
        encode(self.instance("marshal")?, options)
    }

    /// Decode into the instance with the builder's codec options
    pub fn unmarshal(&mut self, data: &[u8]) -> StructResult<()> {
        let options = self.codec_options().clone();
        self.unmarshal_with(data, &options)
    }

    /// Decode into the instance with explicit options
    pub fn unmarshal_with(&mut self, data: &[u8], options: &CodecOptions) -> StructResult<()> {
        decode_into(self.instance_mut("unmarshal")?, data, options)
    }
}
