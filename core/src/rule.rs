//! Field rules: one coercion step fused with any number of constraint checks.
//!
//! A [`FieldRule`] first runs its [`Valuer`]. A coercion failure is returned
//! as-is and no [`Validator`] runs, since constraints only make sense on a
//! coerced value. Otherwise every validator runs in declared order and all
//! failures are bundled into one [`RuleError::Constraints`].
//!
//! # Example
//!
//! ```
//! use field_schema_core::{FieldError, FieldRule, RuleError};
//! use serde_json::{Value, json};
//!
//! let username = FieldRule::new(|raw: Option<&Value>, field: &str| {
//!     raw.and_then(Value::as_str)
//!         .map(str::to_owned)
//!         .ok_or_else(|| FieldError::new("expected a string", field, raw.cloned().unwrap_or_default()))
//! })
//! .with_validator(|name: &String, field: &str| {
//!     (name.len() < 3).then(|| FieldError::new("too short", field, name.as_str()))
//! })
//! .with_validator(|name: &String, field: &str| {
//!     (!name.chars().all(char::is_alphanumeric))
//!         .then(|| FieldError::new("must be alphanumeric", field, name.as_str()))
//! });
//!
//! assert_eq!(username.apply(Some(&json!("ferris")), "username").unwrap(), "ferris");
//!
//! // Both constraints fail and both are reported.
//! let err = username.apply(Some(&json!("a!")), "username").unwrap_err();
//! assert!(matches!(&err, RuleError::Constraints(errors) if errors.len() == 2));
//!
//! // Coercion fails: constraints never run.
//! let err = username.apply(None, "username").unwrap_err();
//! assert!(matches!(err, RuleError::Coercion(_)));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{FieldError, FieldErrors, RuleError};

/// Coerces one raw field value (absent as `None`) into a typed value.
pub type Valuer<T> = Arc<dyn Fn(Option<&Value>, &str) -> Result<T, FieldError> + Send + Sync>;

/// Checks a constraint on an already coerced value.
pub type Validator<T> = Arc<dyn Fn(&T, &str) -> Option<FieldError> + Send + Sync>;

/// Type-erased output of a rule, stored in a [`TypedRecord`](crate::TypedRecord).
pub type TypedValue = Box<dyn Any + Send + Sync>;

/// Wraps a closure as a shareable [`Valuer`].
pub fn valuer<T, F>(f: F) -> Valuer<T>
where
    F: Fn(Option<&Value>, &str) -> Result<T, FieldError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a shareable [`Validator`].
pub fn validator<T, F>(f: F) -> Validator<T>
where
    F: Fn(&T, &str) -> Option<FieldError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Composes one valuer with an ordered list of validators.
///
/// # Examples
///
/// ```
/// use field_schema_core::{FieldError, compose, validator, valuer};
/// use serde_json::{Value, json};
///
/// let port = compose(
///     valuer(|raw: Option<&Value>, field: &str| {
///         raw.and_then(Value::as_u64)
///             .ok_or_else(|| FieldError::new("expected an integer", field, raw.cloned().unwrap_or_default()))
///     }),
///     [
///         validator(|p: &u64, field: &str| (*p == 0).then(|| FieldError::new("must be non-zero", field, *p))),
///         validator(|p: &u64, field: &str| (*p > 65535).then(|| FieldError::new("out of range", field, *p))),
///     ],
/// );
///
/// assert_eq!(port.apply(Some(&json!(8080)), "port").unwrap(), 8080);
/// assert!(port.apply(Some(&json!(70000)), "port").is_err());
/// ```
pub fn compose<T>(
    valuer: Valuer<T>,
    validators: impl IntoIterator<Item = Validator<T>>,
) -> FieldRule<T> {
    FieldRule::from_valuer(valuer).with_validators(validators)
}

/// Coerce-then-validate-all unit for one schema field.
pub struct FieldRule<T> {
    valuer: Valuer<T>,
    validators: Vec<Validator<T>>,
}

impl<T> FieldRule<T> {
    /// Creates a rule with no validators.
    pub fn new<F>(valuer: F) -> Self
    where
        F: Fn(Option<&Value>, &str) -> Result<T, FieldError> + Send + Sync + 'static,
    {
        Self::from_valuer(Arc::new(valuer))
    }

    pub fn from_valuer(valuer: Valuer<T>) -> Self {
        Self {
            valuer,
            validators: Vec::new(),
        }
    }

    /// Appends a validator.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&T, &str) -> Option<FieldError> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Appends already shared validators.
    pub fn with_validators(mut self, validators: impl IntoIterator<Item = Validator<T>>) -> Self {
        self.validators.extend(validators);
        self
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Runs the rule against one raw value.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Coercion`] when the valuer rejects the value, or
    /// [`RuleError::Constraints`] with one entry per failing validator.
    pub fn apply(&self, raw: Option<&Value>, field: &str) -> Result<T, RuleError> {
        let value = (self.valuer)(raw, field).map_err(RuleError::Coercion)?;

        let errors: FieldErrors = self
            .validators
            .iter()
            .filter_map(|validate| validate(&value, field))
            .collect();

        if errors.is_empty() {
            Ok(value)
        } else {
            Err(RuleError::Constraints(errors))
        }
    }
}

impl<T> Clone for FieldRule<T> {
    fn clone(&self) -> Self {
        Self {
            valuer: Arc::clone(&self.valuer),
            validators: self.validators.clone(),
        }
    }
}

impl<T> fmt::Debug for FieldRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("output", &std::any::type_name::<T>())
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

/// A field rule with its output type erased, so rules of different types can
/// share one [`Schema`](crate::Schema).
pub trait ErasedRule: Send + Sync {
    fn apply_erased(&self, raw: Option<&Value>, field: &str) -> Result<TypedValue, RuleError>;

    /// Name of the produced type, for diagnostics.
    fn output_type(&self) -> &'static str;
}

impl<T: Any + Send + Sync> ErasedRule for FieldRule<T> {
    fn apply_erased(&self, raw: Option<&Value>, field: &str) -> Result<TypedValue, RuleError> {
        self.apply(raw, field).map(|value| Box::new(value) as TypedValue)
    }

    fn output_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}
