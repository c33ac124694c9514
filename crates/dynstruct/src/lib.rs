//! Dynamic records
//!
//! Build record types at runtime from field descriptors, read and write the
//! fields of the single instance each builder owns, deep-copy records, copy
//! matching fields between records, and encode records to and from JSON.

#![warn(missing_docs)]

mod access;
pub mod builder;
pub mod codec;
pub mod copy;
pub mod error;
pub mod field;
pub mod record;
pub mod schema;
pub mod source;
pub mod ty;
pub mod value;

pub use builder::StructBuilder;
pub use codec::{decode_into, encode, CodecOptions, DEFAULT_MAX_DEPTH};
pub use copy::{scan_into, ScanPlan, ScanPlanCache};
pub use error::{StructError, StructResult};
pub use field::{FieldDescriptor, REQUIRED_TAG, SKIP_MARKER};
pub use record::Record;
pub use schema::{FieldSchema, RecordSchema, SchemaError, SchemaFile};
pub use source::ShapeSource;
pub use ty::{Kind, RecordType, TypeId, ValueType};
pub use value::{FromValue, MapKey, Value};
