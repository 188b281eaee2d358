//! Structured field errors and the multi-error containers built from them.
//!
//! Every failure surfaced by this crate is a [`FieldError`] attributed to one
//! field name. Several errors for one field (failing constraints) or for one
//! evaluation pass travel together as [`FieldErrors`]. [`RuleError`] is what a
//! single [`FieldRule`](crate::FieldRule) produces and keeps the distinction
//! between one coercion failure and N constraint failures visible.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Message carried by configuration errors (a schema slot with no valuer).
pub const VALUER_NOT_CALLABLE: &str = "valuer must be a function";

/// Message carried by wrapped foreign errors.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Field name (and offending value) carried by wrapped foreign errors.
pub const UNKNOWN_FIELD: &str = "unknown";

/// Opaque underlying cause attached to a [`FieldError`].
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of a [`FieldError`].
///
/// # Examples
///
/// ```
/// use field_schema_core::{ErrorKind, FieldError};
///
/// let err = FieldError::new("too short", "name", "ab");
/// assert_eq!(err.kind(), ErrorKind::Data);
///
/// let err = FieldError::configuration("name", "missing_rule");
/// assert_eq!(err.kind(), ErrorKind::Configuration);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input: a coercion or constraint failure.
    Data,
    /// Bad input with a list of related sub-errors attached.
    Composite,
    /// The schema itself is wrong: the field has no callable valuer.
    Configuration,
    /// Foreign failure raised by external code, wrapped with its cause.
    Unknown,
}

/// A single attributable validation or coercion failure.
///
/// Immutable once built: the `with_*` methods consume the error while it is
/// still being constructed, and only accessors are exposed afterwards.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{field}: {message}")]
pub struct FieldError {
    kind: ErrorKind,
    message: String,
    field: String,
    value: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
    #[source]
    #[serde(
        serialize_with = "serialize_cause",
        skip_serializing_if = "Option::is_none"
    )]
    cause: Option<Cause>,
}

impl FieldError {
    /// Creates a data error for `field` rejecting `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use field_schema_core::FieldError;
    ///
    /// let err = FieldError::new("must be positive", "count", -3);
    /// assert_eq!(err.field(), "count");
    /// assert_eq!(err.value(), &serde_json::json!(-3));
    /// assert_eq!(err.to_string(), "count: must be positive");
    /// ```
    pub fn new(
        message: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            kind: ErrorKind::Data,
            message: message.into(),
            field: field.into(),
            value: value.into(),
            errors: Vec::new(),
            cause: None,
        }
    }

    /// Creates the configuration error raised for a field whose valuer could
    /// not be resolved. `value` is whatever stood in for the valuer.
    pub fn configuration(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            kind: ErrorKind::Configuration,
            ..Self::new(VALUER_NOT_CALLABLE, field, value)
        }
    }

    /// Wraps an error that does not follow the field-error contract.
    ///
    /// The result is attributed to the [`UNKNOWN_FIELD`] and keeps `cause`
    /// reachable through [`cause`](Self::cause) and `source()`.
    pub fn unknown(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            kind: ErrorKind::Unknown,
            cause: Some(Arc::new(cause)),
            ..Self::new(UNKNOWN_ERROR, UNKNOWN_FIELD, UNKNOWN_FIELD)
        }
    }

    /// Attaches related sub-errors.
    pub fn with_errors(mut self, errors: impl IntoIterator<Item = FieldError>) -> Self {
        self.errors.extend(errors);
        if self.kind == ErrorKind::Data && !self.errors.is_empty() {
            self.kind = ErrorKind::Composite;
        }
        self
    }

    /// Attaches an underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the field this error is attributed to.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The offending raw (or partially processed) value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Related sub-errors, empty unless attached with
    /// [`with_errors`](Self::with_errors).
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Returns `true` for schema-authoring mistakes rather than bad input.
    pub fn is_configuration(&self) -> bool {
        self.kind == ErrorKind::Configuration
    }
}

fn serialize_cause<S: Serializer>(cause: &Option<Cause>, serializer: S) -> Result<S::Ok, S::Error> {
    match cause {
        Some(cause) => serializer.serialize_some(&cause.to_string()),
        None => serializer.serialize_none(),
    }
}

/// A foreign failure message recovered from code that did not return a
/// [`FieldError`], e.g. a panicking valuer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ForeignError(String);

impl ForeignError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Ordered list of field errors.
///
/// Used both for the constraint failures of a single field and for the
/// failure outcome of a whole evaluation.
///
/// # Examples
///
/// ```
/// use field_schema_core::{FieldError, FieldErrors};
///
/// let errors: FieldErrors = vec![
///     FieldError::new("required", "name", serde_json::Value::Null),
///     FieldError::new("too small", "age", 3),
///     FieldError::new("not even", "age", 3),
/// ]
/// .into();
///
/// assert_eq!(errors.len(), 3);
/// assert_eq!(errors.fields(), vec!["name", "age"]);
/// assert_eq!(errors.for_field("age").count(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Distinct field names with at least one error, in first-seen order.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for error in &self.0 {
            if !fields.contains(&error.field()) {
                fields.push(error.field());
            }
        }
        fields
    }

    /// Errors attributed to `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.0.iter().filter(move |error| error.field() == field)
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            1 => write!(f, "1 field error")?,
            n => write!(f, "{n} field errors")?,
        }
        for error in &self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl Deref for FieldErrors {
    type Target = [FieldError];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Extend<FieldError> for FieldErrors {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<FieldError> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<FieldError>> for FieldErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl From<FieldError> for FieldErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Failure of a single field rule.
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    /// The raw value could not be coerced; no constraint ran.
    #[error(transparent)]
    Coercion(FieldError),
    /// The coerced value violated one or more constraints, in declared order.
    #[error(transparent)]
    Constraints(FieldErrors),
}

impl RuleError {
    /// Flattens into individual field errors.
    pub fn into_errors(self) -> Vec<FieldError> {
        match self {
            Self::Coercion(error) => vec![error],
            Self::Constraints(errors) => errors.into_vec(),
        }
    }

    /// Number of individual field errors carried.
    pub fn len(&self) -> usize {
        match self {
            Self::Coercion(_) => 1,
            Self::Constraints(errors) => errors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
