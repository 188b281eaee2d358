//! Coercion and validation of untyped key/value records against declarative
//! field schemas.
//!
//! This crate turns loosely typed input (submitted form fields, JSON
//! objects) into a typed record, or into a complete list of everything that
//! is wrong with it:
//!
//! - [`FieldRule`] — one [`Valuer`] (coercion) fused with any number of
//!   [`Validator`]s (constraints). Coercion failure short-circuits the field;
//!   constraint failures are all collected.
//! - [`Schema`] — ordered field name → rule mapping. Evaluation visits every
//!   field even after failures and returns either a [`TypedRecord`] or
//!   [`FieldErrors`], never both.
//! - [`Record`] — the "lookup raw value by field name" capability, with
//!   adapters for [`FormData`] and plain JSON objects.
//! - [`FieldError`] — structured, attributable failure: message, field,
//!   offending value, related errors and an optional cause.
//!
//! Concrete valuers and validators are supplied by the caller as closures.
//!
//! # Example
//!
//! ```
//! use field_schema_core::*;
//! use serde_json::{Value, json};
//!
//! let age = FieldRule::new(|raw: Option<&Value>, field: &str| {
//!     raw.and_then(Value::as_str)
//!         .and_then(|s| s.parse::<u32>().ok())
//!         .ok_or_else(|| FieldError::new("expected a number", field, raw.cloned().unwrap_or_default()))
//! })
//! .with_validator(|age: &u32, field: &str| {
//!     (*age < 18).then(|| FieldError::new("must be an adult", field, *age))
//! });
//! let schema = Schema::new().field("age", age);
//!
//! let form: FormData = [("age", "42")].into_iter().collect();
//! let record = schema.evaluate(&form).unwrap();
//! assert_eq!(record.get::<u32>("age"), Some(&42));
//!
//! let errors = schema.evaluate(&json!({ "age": "7" })).unwrap_err();
//! assert_eq!(errors[0].message(), "must be an adult");
//! assert_eq!(errors[0].value(), &json!(7));
//! ```

mod error;
mod options;
mod output;
mod record;
mod rule;
mod schema;

pub use error::{
    Cause, ErrorKind, FieldError, FieldErrors, ForeignError, RuleError, UNKNOWN_ERROR,
    UNKNOWN_FIELD, VALUER_NOT_CALLABLE,
};
pub use options::{EvaluateOptions, FailureMode};
pub use output::TypedRecord;
pub use record::{FormData, Record};
pub use rule::{ErasedRule, FieldRule, TypedValue, Validator, Valuer, compose, validator, valuer};
pub use schema::{Schema, SharedRule, parse_form, parse_object};
