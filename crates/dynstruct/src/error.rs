//! Error types for dynamic records

use thiserror::Error;

use crate::schema::SchemaError;

/// Result type for record operations
pub type StructResult<T> = Result<T, StructError>;

/// Errors that can occur while building, accessing, copying or encoding a record
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StructError {
    /// A field was added without a name
    #[error("Field name cannot be empty")]
    EmptyFieldName,

    /// A field with the same internal name is already pending
    #[error("Field {name} already exists")]
    DuplicateField {
        /// Internal field name
        name: String,
    },

    /// Another field already encodes under the same external name
    #[error("Field {name} uses external name {external:?} already taken by field {existing}")]
    DuplicateExternalName {
        /// Field being added
        name: String,
        /// Conflicting external name
        external: String,
        /// Field that already uses it
        existing: String,
    },

    /// Embedded (anonymous) fields are not supported
    #[error("Cannot add embedded field {name}")]
    EmbeddedField {
        /// Internal field name
        name: String,
    },

    /// The builder has pending fields that were never materialized
    #[error("Cannot {operation} if struct has not been built")]
    NotBuilt {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// No field with this name exists
    #[error("Field {name} does not exist")]
    FieldNotFound {
        /// Requested field name
        name: String,
    },

    /// Positional access past the last field
    #[error("Field index {index} out of range (struct has {len} fields)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of fields
        len: usize,
    },

    /// Value kind does not match the field kind
    #[error("Cannot set field {field} with value of kind {actual} (expected {expected})")]
    KindMismatch {
        /// Field name
        field: String,
        /// Declared kind
        expected: String,
        /// Kind of the supplied value
        actual: String,
    },

    /// Value kind matches but its element/field types do not
    #[error("Cannot set field {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Declared type
        expected: String,
        /// Description of the supplied value
        actual: String,
    },

    /// The field is marked readonly
    #[error("Field {name} is readonly")]
    ReadOnlyField {
        /// Field name
        name: String,
    },

    /// Map key type cannot be used as a lookup key
    #[error("Map key type {key_type} is not comparable")]
    NonComparableKey {
        /// Offending key type
        key_type: String,
    },

    /// Deep copy found a field whose value does not fit the copied type
    #[error("Cannot deep copy field {field}: {reason}")]
    DeepCopyMismatch {
        /// Field name
        field: String,
        /// Why the field could not be copied
        reason: String,
    },

    /// A record was expected
    #[error("{role} is not a record (got {actual})")]
    NotARecord {
        /// "Source" or "Destination"
        role: &'static str,
        /// What was found instead
        actual: String,
    },

    /// A scan plan was applied to records of other types
    #[error("Scan plan built for {expected} cannot be applied to {actual}")]
    ScanPlanMismatch {
        /// Types the plan was built for
        expected: String,
        /// Types it was applied to
        actual: String,
    },

    /// Value cannot be represented in the text encoding
    #[error("Encode error: {0}")]
    Encode(String),

    /// Encoded text does not match the record type
    #[error("Decode error at {path}: {message}")]
    Decode {
        /// Dotted path of the offending value
        path: String,
        /// Error message
        message: String,
    },

    /// Schema file error
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl StructError {
    /// Whether this error signals misuse of the API rather than bad input data
    pub fn is_usage_error(&self) -> bool {
        !matches!(
            self,
            StructError::Encode(_) | StructError::Decode { .. } | StructError::Schema(_)
        )
    }

    pub(crate) fn decode(path: &str, message: impl Into<String>) -> Self {
        StructError::Decode {
            path: if path.is_empty() {
                "$".to_string()
            } else {
                path.to_string()
            },
            message: message.into(),
        }
    }
}
