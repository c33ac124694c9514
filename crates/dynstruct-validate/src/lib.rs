//! Per-field validation callbacks
//!
//! A [`ValidatorRegistry`] maps field names to ordered lists of validation
//! functions. It has no coupling to the record builder: callers decide which
//! value to validate under which name.

#![warn(missing_docs)]

pub mod registry;

pub use registry::{ValidationError, ValidationResult, Validator, ValidatorRegistry};
