//! The typed output record produced by a successful evaluation.

use std::any::Any;
use std::fmt;

use crate::rule::TypedValue;

/// Ordered mapping of field name to coerced value.
///
/// Values keep the concrete type their rule produced and are read back with
/// [`get`](Self::get) or moved out with [`take`](Self::take).
///
/// # Examples
///
/// ```
/// use field_schema_core::{FieldError, FieldRule, FormData, Schema};
/// use serde_json::Value;
///
/// let schema = Schema::new().field(
///     "count",
///     FieldRule::new(|raw: Option<&Value>, field: &str| {
///         raw.and_then(Value::as_str)
///             .and_then(|s| s.parse::<u8>().ok())
///             .ok_or_else(|| FieldError::new("expected a count", field, raw.cloned().unwrap_or_default()))
///     }),
/// );
///
/// let form: FormData = [("count", "7")].into_iter().collect();
/// let mut record = schema.evaluate(&form).unwrap();
///
/// assert_eq!(record.get::<u8>("count"), Some(&7));
/// assert_eq!(record.get::<String>("count"), None);
/// assert_eq!(record.take::<u8>("count"), Some(7));
/// assert!(record.is_empty());
/// ```
#[derive(Default)]
pub struct TypedRecord {
    entries: Vec<(String, TypedValue)>,
}

impl TypedRecord {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, field: String, value: TypedValue) {
        self.entries.push((field, value));
    }

    /// Borrows the value stored under `field` if it has type `T`.
    pub fn get<T: Any>(&self, field: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| (**value).downcast_ref::<T>())
    }

    /// Removes and returns the value stored under `field` if it has type `T`.
    ///
    /// The entry is left in place when the type does not match.
    pub fn take<T: Any>(&mut self, field: &str) -> Option<T> {
        let index = self
            .entries
            .iter()
            .position(|(name, value)| name == field && (**value).is::<T>())?;
        let (_, value) = self.entries.remove(index);
        value.downcast::<T>().ok().map(|value| *value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    /// Field names in schema order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TypedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedRecord")
            .field("fields", &self.fields().collect::<Vec<_>>())
            .finish()
    }
}
