//! Field descriptors
//!
//! A descriptor carries everything needed to materialize one field: its
//! internal name, declared type, the external names it is known by under
//! each encoding tag, and the `required`/`readonly` flags.

use std::collections::BTreeMap;
use std::fmt;

use crate::ty::ValueType;

/// Tag key under which the required marker is rendered
pub const REQUIRED_TAG: &str = "structs";

/// External name that excludes a field from encoding and from shape derivation
pub const SKIP_MARKER: &str = "-";

/// Definition of one field of a record-to-be-built
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Internal field name
    pub name: String,
    /// Declared type
    pub ty: ValueType,
    /// External names keyed by encoding tag
    pub tags: BTreeMap<String, String>,
    /// Informational required marker
    pub required: bool,
    /// Whether setters and scans may write this field
    pub readonly: bool,
    /// Embedded (anonymous) field; always rejected by the builder
    pub embedded: bool,
}

impl FieldDescriptor {
    /// Create a descriptor with no external names
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            tags: BTreeMap::new(),
            required: false,
            readonly: false,
            embedded: false,
        }
    }

    /// Set the external name under `tag`
    pub fn with_tag(mut self, tag: impl Into<String>, external: impl Into<String>) -> Self {
        self.tags.insert(tag.into(), external.into());
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as readonly
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Mark as embedded
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Raw tag value under `tag`, if any
    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    /// External name under `tag`, falling back to the internal name
    pub fn external_name(&self, tag: &str) -> &str {
        match self.tag(tag) {
            Some(name) if !name.is_empty() => name,
            _ => &self.name,
        }
    }

    /// Whether the field is excluded under `tag`
    pub fn is_skipped(&self, tag: &str) -> bool {
        self.tag(tag) == Some(SKIP_MARKER)
    }

    /// Render as a tag string, e.g. `json:"name" structs:"required"`
    pub fn tag_string(&self) -> String {
        let mut parts: Vec<String> = self
            .tags
            .iter()
            .map(|(key, value)| format!("{}:{:?}", key, value))
            .collect();
        if self.required {
            parts.push(format!("{}:\"required\"", REQUIRED_TAG));
        }
        parts.join(" ")
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)?;
        let tags = self.tag_string();
        if !tags.is_empty() {
            write!(f, " `{}`", tags)?;
        }
        Ok(())
    }
}
