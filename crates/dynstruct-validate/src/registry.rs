//! Validator registry

use std::fmt;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Error returned by a failing validator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct ValidationError {
    /// Field the failure applies to, if known
    pub field: Option<String>,
    /// Failure description
    pub message: String,
}

impl ValidationError {
    /// Failure with a message only
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// Attach the field name
    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Result of running validators
pub type ValidationResult = Result<(), ValidationError>;

/// A validation function
pub type Validator<T> = Box<dyn Fn(&T) -> ValidationResult + Send + Sync>;

/// Ordered validators keyed by field name
///
/// Owned explicitly by whatever schema needs it; there is no shared global
/// instance.
pub struct ValidatorRegistry<T = dynstruct::Value> {
    validators: FxHashMap<String, Vec<Validator<T>>>,
}

impl<T> Default for ValidatorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ValidatorRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for field in self.fields() {
            map.entry(&field, &self.validator_count(field));
        }
        map.finish()
    }
}

impl<T> ValidatorRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            validators: FxHashMap::default(),
        }
    }

    /// Append a validator to `field`'s list, creating the list if absent
    pub fn add<F>(&mut self, field: &str, validator: F)
    where
        F: Fn(&T) -> ValidationResult + Send + Sync + 'static,
    {
        let list = self.validators.entry(field.to_string()).or_default();
        list.push(Box::new(validator));
        trace!(field, count = list.len(), "added validator");
    }

    /// Replace `field`'s list with this single validator
    pub fn set<F>(&mut self, field: &str, validator: F)
    where
        F: Fn(&T) -> ValidationResult + Send + Sync + 'static,
    {
        let replaced = self
            .validators
            .insert(field.to_string(), vec![Box::new(validator)]);
        trace!(
            field,
            replaced = replaced.map_or(0, |list| list.len()),
            "set validator"
        );
    }

    /// Delete `field`'s entry; returns whether it existed
    pub fn remove(&mut self, field: &str) -> bool {
        self.validators.remove(field).is_some()
    }

    /// Run `field`'s validators in insertion order, stopping at the first failure
    ///
    /// Passes if the field has no validators.
    pub fn validate(&self, field: &str, value: &T) -> ValidationResult {
        let Some(list) = self.validators.get(field) else {
            return Ok(());
        };
        for (index, validator) in list.iter().enumerate() {
            if let Err(err) = validator(value) {
                debug!(field, index, error = %err, "validation failed");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Number of fields with validators
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether no field has validators
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Whether `field` has an entry
    pub fn contains(&self, field: &str) -> bool {
        self.validators.contains_key(field)
    }

    /// Number of validators registered for `field`
    pub fn validator_count(&self, field: &str) -> usize {
        self.validators.get(field).map_or(0, Vec::len)
    }

    /// Field names with entries, sorted
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        fields.sort_unstable();
        fields
    }
}
