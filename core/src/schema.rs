//! Schemas and the schema evaluator.
//!
//! A [`Schema`] is an ordered mapping of field name to field rule. Evaluating
//! it against a [`Record`] runs every rule, stores each coerced value in a
//! [`TypedRecord`] and funnels every failure into one [`FieldErrors`] list.
//! The caller gets exactly one of the two: the complete typed record when no
//! field failed, otherwise the complete error list.
//!
//! # Example
//!
//! ```
//! use field_schema_core::*;
//! use serde_json::{Value, json};
//!
//! fn text() -> FieldRule<String> {
//!     FieldRule::new(|raw: Option<&Value>, field: &str| match raw {
//!         Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
//!         other => Err(FieldError::new("required", field, other.cloned().unwrap_or_default())),
//!     })
//! }
//!
//! let schema = Schema::new()
//!     .field("first_name", text())
//!     .field("last_name", text())
//!     .field("email", text().with_validator(|email: &String, field: &str| {
//!         (!email.contains('@')).then(|| FieldError::new("invalid email", field, email.as_str()))
//!     }));
//!
//! // Every failing field is reported, not just the first.
//! let errors = parse_object(&schema, json!({ "last_name": "Doe", "email": "nope" }).as_object().unwrap())
//!     .unwrap_err();
//! assert_eq!(errors.fields(), vec!["first_name", "email"]);
//!
//! let form: FormData = [("first_name", "Jane"), ("last_name", "Doe"), ("email", "jane@doe.dev")]
//!     .into_iter()
//!     .collect();
//! let record = parse_form(&schema, &form).unwrap();
//! assert_eq!(record.get::<String>("email").unwrap(), "jane@doe.dev");
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{FieldError, FieldErrors, ForeignError, RuleError};
use crate::options::{EvaluateOptions, FailureMode};
use crate::output::TypedRecord;
use crate::record::{FormData, Record};
use crate::rule::{ErasedRule, FieldRule, TypedValue};

/// Shared, type-erased field rule.
pub type SharedRule = Arc<dyn ErasedRule>;

#[derive(Clone)]
enum Slot {
    Rule(SharedRule),
    /// No valuer could be resolved; the value is what stood in for it.
    Unresolved(Value),
}

#[derive(Clone)]
struct Entry {
    name: String,
    slot: Slot,
}

type FieldOutcome = Result<TypedValue, Vec<FieldError>>;

/// Ordered mapping of field name to field rule.
///
/// Field names are unique: declaring a name twice replaces the earlier rule
/// but keeps its position. A schema is immutable once built and can be
/// evaluated any number of times.
#[derive(Clone, Default)]
pub struct Schema {
    entries: Vec<Entry>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` with a typed rule.
    pub fn field<T: Any + Send + Sync>(self, name: impl Into<String>, rule: FieldRule<T>) -> Self {
        self.shared(name, Arc::new(rule))
    }

    /// Declares `name` with an already erased rule.
    pub fn shared(mut self, name: impl Into<String>, rule: SharedRule) -> Self {
        self.insert(name.into(), Slot::Rule(rule));
        self
    }

    /// Declares `name` without a usable valuer.
    ///
    /// Evaluation reports a configuration error for this field, carrying
    /// `value` as the offending value. This is how schemas assembled from
    /// data represent a rule reference that did not resolve.
    pub fn unresolved(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name.into(), Slot::Unresolved(value.into()));
        self
    }

    fn insert(&mut self, name: String, slot: Slot) {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.slot = slot,
            None => self.entries.push(Entry { name, slot }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Declared field names in evaluation order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Fields that will fail with a configuration error on every evaluation.
    ///
    /// Lets callers reject a badly authored schema up front instead of
    /// discovering it in an evaluation result.
    pub fn unresolved_fields(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.slot, Slot::Unresolved(_)))
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Evaluates every field against `record`, collecting all errors.
    ///
    /// # Errors
    ///
    /// Returns every field error in schema order when at least one field
    /// failed. No partial record is ever returned.
    ///
    /// # Panics
    ///
    /// Never propagates a panic from a valuer or validator: each rule runs
    /// under [`catch_unwind`](std::panic::catch_unwind) and a panic becomes a
    /// field error (an unknown error unless the payload is itself a field
    /// error). The process panic hook still runs first, so the default hook
    /// prints the panic message to stderr for every such rule.
    pub fn evaluate<R: Record + Sync + ?Sized>(&self, record: &R) -> Result<TypedRecord, FieldErrors> {
        self.evaluate_with(record, &EvaluateOptions::default())
    }

    /// Evaluates with explicit [`EvaluateOptions`].
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`](Self::evaluate); with
    /// [`FailureMode::FailFast`] only the errors of the first failing field
    /// are returned.
    pub fn evaluate_with<R: Record + Sync + ?Sized>(
        &self,
        record: &R,
        options: &EvaluateOptions,
    ) -> Result<TypedRecord, FieldErrors> {
        if options.parallel {
            let outcomes: Vec<FieldOutcome> = self
                .entries
                .par_iter()
                .map(|entry| evaluate_field(entry, record))
                .collect();
            self.assemble(self.entries.iter().zip(outcomes), options.mode)
        } else {
            let outcomes = self
                .entries
                .iter()
                .map(|entry| (entry, evaluate_field(entry, record)));
            self.assemble(outcomes, options.mode)
        }
    }

    fn assemble<'a>(
        &self,
        outcomes: impl Iterator<Item = (&'a Entry, FieldOutcome)>,
        mode: FailureMode,
    ) -> Result<TypedRecord, FieldErrors> {
        let mut output = TypedRecord::with_capacity(self.entries.len());
        let mut errors = FieldErrors::new();

        for (entry, outcome) in outcomes {
            match outcome {
                Ok(value) => output.insert(entry.name.clone(), value),
                Err(field_errors) => {
                    debug!(field = %entry.name, errors = field_errors.len(), "field rejected");
                    errors.extend(require_errors(field_errors, &entry.name));
                    if mode == FailureMode::FailFast {
                        break;
                    }
                }
            }
        }

        debug!(
            fields = self.entries.len(),
            errors = errors.len(),
            "schema evaluated"
        );

        if errors.is_empty() {
            Ok(output)
        } else {
            Err(errors)
        }
    }
}

fn evaluate_field<R: Record + ?Sized>(entry: &Entry, record: &R) -> FieldOutcome {
    let rule = match &entry.slot {
        Slot::Rule(rule) => rule,
        Slot::Unresolved(value) => {
            warn!(field = %entry.name, valuer = %value, "field has no callable valuer");
            return Err(vec![FieldError::configuration(&entry.name, value.clone())]);
        }
    };

    let raw = record.lookup(&entry.name);
    let raw = raw.as_deref();

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| rule.apply_erased(raw, &entry.name))) {
        Ok(outcome) => outcome.map_err(RuleError::into_errors),
        Err(payload) => Err(recover_panic(payload, &entry.name)),
    };
    outcome.map_err(|errors| require_errors(errors, &entry.name))
}

/// A failed field must contribute at least one error, otherwise the
/// evaluation would report success with the field missing.
fn require_errors(errors: Vec<FieldError>, field: &str) -> Vec<FieldError> {
    if !errors.is_empty() {
        return errors;
    }
    warn!(field, "rule failed without reporting an error");
    vec![FieldError::unknown(ForeignError::new(format!(
        "rule for field {field} failed without reporting an error"
    )))]
}

/// Turns a panic raised by external code back into field errors. Payloads
/// that already are field errors pass through; anything else is wrapped as
/// an unknown error.
fn recover_panic(payload: Box<dyn Any + Send>, field: &str) -> Vec<FieldError> {
    let payload = match payload.downcast::<FieldError>() {
        Ok(error) => return vec![*error],
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<FieldErrors>() {
        Ok(errors) => return errors.into_vec(),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<RuleError>() {
        Ok(error) => return error.into_errors(),
        Err(payload) => payload,
    };

    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    warn!(field, %message, "rule panicked, wrapping as unknown error");
    vec![FieldError::unknown(ForeignError::new(message))]
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for entry in &self.entries {
            match &entry.slot {
                Slot::Rule(rule) => map.entry(&entry.name, &rule.output_type()),
                Slot::Unresolved(value) => map.entry(&entry.name, &format_args!("<unresolved {value}>")),
            };
        }
        map.finish()
    }
}

/// Evaluates `schema` against form-style input.
///
/// # Errors
///
/// See [`Schema::evaluate`].
pub fn parse_form(schema: &Schema, data: &FormData) -> Result<TypedRecord, FieldErrors> {
    schema.evaluate(data)
}

/// Evaluates `schema` against a plain JSON object.
///
/// # Errors
///
/// See [`Schema::evaluate`].
pub fn parse_object(schema: &Schema, data: &Map<String, Value>) -> Result<TypedRecord, FieldErrors> {
    schema.evaluate(data)
}
