//! Record schemas loaded from TOML
//!
//! A schema file declares named records and the codec options used by the
//! builders created from it:
//!
//! ```toml
//! tag = "json"
//!
//! [codec]
//! max_depth = 32
//!
//! [[records.Address.fields]]
//! name = "City"
//! rename = "city"
//! type = "string"
//!
//! [[records.User.fields]]
//! name = "Name"
//! rename = "name"
//! type = "string"
//! required = true
//!
//! [[records.User.fields]]
//! name = "Home"
//! type = "optional<record:Address>"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::builder::StructBuilder;
use crate::codec::CodecOptions;
use crate::error::StructResult;
use crate::field::FieldDescriptor;
use crate::ty::{RecordType, ValueType};

/// Errors that can occur while loading a schema
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    /// Failed to read the schema file
    #[error("Failed to read schema file {path}: {message}")]
    Io {
        /// File path
        path: String,
        /// Underlying I/O error
        message: String,
    },

    /// Failed to parse TOML
    #[error("Failed to parse schema: {0}")]
    Parse(String),

    /// A field type expression could not be parsed
    #[error("Unknown type {expr:?} for field {field}")]
    UnknownType {
        /// Field name
        field: String,
        /// Offending expression
        expr: String,
    },

    /// A record name is not declared in the file
    #[error("Unknown record: {0}")]
    UnknownRecord(String),

    /// Records reference each other in a cycle
    #[error("Record {0} references itself")]
    Cycle(String),
}

/// Schema file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaFile {
    /// Default tag key for external names (default: "json")
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Codec options given to every builder
    #[serde(default)]
    pub codec: CodecOptions,

    /// Records by name
    #[serde(default)]
    pub records: BTreeMap<String, RecordSchema>,
}

/// One record declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordSchema {
    /// Tag key overriding the file's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

/// One field declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSchema {
    /// Internal name
    pub name: String,

    /// External name; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,

    /// Type expression
    #[serde(rename = "type")]
    pub ty: String,

    /// Required marker
    #[serde(default)]
    pub required: bool,

    /// Reject writes through `set`
    #[serde(default)]
    pub readonly: bool,
}

fn default_tag() -> String {
    "json".to_string()
}

/// Parsed type expression, before record references are resolved
#[derive(Debug, Clone, PartialEq)]
enum TypeExpr {
    String,
    Int,
    Float,
    Bool,
    List(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Optional(Box<TypeExpr>),
    Record(String),
}

impl SchemaFile {
    /// Parse a schema from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        toml::from_str(content).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    /// Load a schema from a file
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Declared record names, sorted
    pub fn record_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Create a built builder for the named record
    ///
    /// Records referenced through `record:Name` are materialized first, once
    /// per call.
    pub fn builder(&self, name: &str) -> StructResult<StructBuilder> {
        let mut resolved = BTreeMap::new();
        let mut stack = Vec::new();
        let builder = self.resolve(name, &mut resolved, &mut stack)?;
        debug!(record = name, nested = resolved.len() - 1, "built record from schema");
        Ok(builder)
    }

    fn resolve(
        &self,
        name: &str,
        resolved: &mut BTreeMap<String, Arc<RecordType>>,
        stack: &mut Vec<String>,
    ) -> StructResult<StructBuilder> {
        let schema = self
            .records
            .get(name)
            .ok_or_else(|| SchemaError::UnknownRecord(name.to_string()))?;
        if stack.iter().any(|s| s == name) {
            return Err(SchemaError::Cycle(name.to_string()).into());
        }
        stack.push(name.to_string());

        let tag = schema.tag.as_deref().unwrap_or(&self.tag);
        let mut builder = StructBuilder::new(tag).with_codec_options(self.codec.clone());
        for field in &schema.fields {
            let expr = parse_type(&field.ty).ok_or_else(|| SchemaError::UnknownType {
                field: field.name.clone(),
                expr: field.ty.clone(),
            })?;
            let ty = self.lower(&expr, resolved, stack)?;
            let external = field.rename.as_deref().unwrap_or(&field.name);
            let mut descriptor = FieldDescriptor::new(field.name.as_str(), ty).with_tag(tag, external);
            if field.required {
                descriptor = descriptor.required();
            }
            if field.readonly {
                descriptor = descriptor.readonly();
            }
            builder.add_prebuilt_field(descriptor)?;
        }
        builder.build();

        stack.pop();
        resolved.insert(name.to_string(), builder.record_type()?.clone());
        Ok(builder)
    }

    fn lower(
        &self,
        expr: &TypeExpr,
        resolved: &mut BTreeMap<String, Arc<RecordType>>,
        stack: &mut Vec<String>,
    ) -> StructResult<ValueType> {
        Ok(match expr {
            TypeExpr::String => ValueType::String,
            TypeExpr::Int => ValueType::Int,
            TypeExpr::Float => ValueType::Float,
            TypeExpr::Bool => ValueType::Bool,
            TypeExpr::List(inner) => ValueType::list(self.lower(inner, resolved, stack)?),
            TypeExpr::Optional(inner) => ValueType::optional(self.lower(inner, resolved, stack)?),
            TypeExpr::Map(key, value) => {
                let key = self.lower(key, resolved, stack)?;
                ValueType::map(key, self.lower(value, resolved, stack)?)?
            }
            TypeExpr::Record(name) => {
                let ty = match resolved.get(name) {
                    Some(ty) => ty.clone(),
                    None => self.resolve(name, resolved, stack)?.record_type()?.clone(),
                };
                ValueType::record(ty)
            }
        })
    }
}

/// Parse a type expression such as `map<string, list<int>>`
fn parse_type(expr: &str) -> Option<TypeExpr> {
    let expr = expr.trim();
    match expr {
        "string" => return Some(TypeExpr::String),
        "int" => return Some(TypeExpr::Int),
        "float" => return Some(TypeExpr::Float),
        "bool" => return Some(TypeExpr::Bool),
        _ => {}
    }
    if let Some(name) = expr.strip_prefix("record:") {
        let name = name.trim();
        return (!name.is_empty()).then(|| TypeExpr::Record(name.to_string()));
    }

    let open = expr.find('<')?;
    let args = expr[open + 1..].strip_suffix('>')?;
    match expr[..open].trim() {
        "list" => Some(TypeExpr::List(Box::new(parse_type(args)?))),
        "optional" => Some(TypeExpr::Optional(Box::new(parse_type(args)?))),
        "map" => {
            let comma = top_level_comma(args)?;
            let key = parse_type(&args[..comma])?;
            let value = parse_type(&args[comma + 1..])?;
            Some(TypeExpr::Map(Box::new(key), Box::new(value)))
        }
        _ => None,
    }
}

/// Byte offset of the first comma outside angle brackets
fn top_level_comma(args: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in args.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructError;

    const USERS: &str = r#"
tag = "json"

[codec]
max_depth = 8

[[records.Address.fields]]
name = "City"
rename = "city"
type = "string"

[[records.User.fields]]
name = "Name"
rename = "name"
type = "string"
required = true

[[records.User.fields]]
name = "Scores"
rename = "scores"
type = "map<string, list<float>>"

[[records.User.fields]]
name = "Home"
rename = "home"
type = "optional<record:Address>"
"#;

    #[test]
    fn test_parse_type_expressions() {
        assert_eq!(parse_type(" int "), Some(TypeExpr::Int));
        assert_eq!(
            parse_type("map<int, map<string, bool>>"),
            Some(TypeExpr::Map(
                Box::new(TypeExpr::Int),
                Box::new(TypeExpr::Map(
                    Box::new(TypeExpr::String),
                    Box::new(TypeExpr::Bool)
                ))
            ))
        );
        assert_eq!(
            parse_type("list<record:Address>"),
            Some(TypeExpr::List(Box::new(TypeExpr::Record(
                "Address".to_string()
            ))))
        );
        assert_eq!(parse_type("list<int"), None);
        assert_eq!(parse_type("map<int>"), None);
        assert_eq!(parse_type("record:"), None);
        assert_eq!(parse_type("uint"), None);
    }

    #[test]
    fn test_builder_from_schema() {
        let schema = SchemaFile::from_toml_str(USERS).unwrap();
        assert_eq!(schema.record_names().collect::<Vec<_>>(), vec!["Address", "User"]);
        assert_eq!(schema.codec.max_depth, 8);

        let user = schema.builder("User").unwrap();
        assert!(user.is_built());
        assert_eq!(user.codec_options().max_depth, 8);
        let ty = user.record_type().unwrap();
        assert_eq!(ty.len(), 3);
        assert_eq!(ty.field(1).unwrap().ty.to_string(), "map<string, list<float>>");
        assert_eq!(ty.field(2).unwrap().ty.to_string(), "optional<record{City: string}>");
        assert!(ty.field(0).unwrap().required);
        assert_eq!(ty.external_name(2), Some("home"));
    }

    #[test]
    fn test_defaults() {
        let schema = SchemaFile::from_toml_str(
            "[[records.A.fields]]\nname = \"X\"\ntype = \"int\"\nreadonly = true\n",
        )
        .unwrap();
        assert_eq!(schema.tag, "json");
        assert_eq!(schema.codec, CodecOptions::default());
        let a = schema.builder("A").unwrap();
        let field = a.field(0).unwrap();
        assert_eq!(field.external_name("json"), "X");
        assert!(field.readonly);
    }

    #[test]
    fn test_record_tag_override() {
        let schema = SchemaFile::from_toml_str(
            "[records.Row]\ntag = \"db\"\n[[records.Row.fields]]\nname = \"Id\"\nrename = \"id\"\ntype = \"int\"\n",
        )
        .unwrap();
        let row = schema.builder("Row").unwrap();
        assert_eq!(row.tag(), "db");
        assert_eq!(row.field(0).unwrap().tag("db"), Some("id"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            SchemaFile::from_toml_str("tag = ["),
            Err(SchemaError::Parse(_))
        ));

        let schema = SchemaFile::from_toml_str(USERS).unwrap();
        assert_eq!(
            schema.builder("Nobody").unwrap_err(),
            StructError::Schema(SchemaError::UnknownRecord("Nobody".to_string()))
        );

        let bad = SchemaFile::from_toml_str(
            "[[records.A.fields]]\nname = \"X\"\ntype = \"set<int>\"\n",
        )
        .unwrap();
        assert!(matches!(
            bad.builder("A"),
            Err(StructError::Schema(SchemaError::UnknownType { .. }))
        ));

        let keys = SchemaFile::from_toml_str(
            "[[records.A.fields]]\nname = \"X\"\ntype = \"map<list<int>, int>\"\n",
        )
        .unwrap();
        assert!(matches!(
            keys.builder("A"),
            Err(StructError::NonComparableKey { .. })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let schema = SchemaFile::from_toml_str(
            r#"
[[records.A.fields]]
name = "B"
type = "record:B"

[[records.B.fields]]
name = "A"
type = "optional<record:A>"
"#,
        )
        .unwrap();
        let err = schema.builder("A").unwrap_err();
        assert!(matches!(err, StructError::Schema(SchemaError::Cycle(_))));
        assert!(!err.is_usage_error());
    }

    #[test]
    fn test_from_path_missing() {
        let err = SchemaFile::from_path(Path::new("/nonexistent/schema.toml")).unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }
}
