//! Input record adapters.
//!
//! The evaluator only needs one capability from its input: look up the raw
//! value for a field name. [`Record`] is that capability. It is implemented
//! for the form-style [`FormData`] container and for plain JSON objects, so
//! both reduce to the same lookup before evaluation starts.
//!
//! A missing key is `None`, never an error. A key present with JSON `null`
//! is `Some(Value::Null)`.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde_json::{Map, Value};

/// Read-only "raw value by field name" lookup.
pub trait Record {
    /// Returns the raw value stored under `field`, or `None` when absent.
    fn lookup(&self, field: &str) -> Option<Cow<'_, Value>>;
}

impl<R: Record + ?Sized> Record for &R {
    fn lookup(&self, field: &str) -> Option<Cow<'_, Value>> {
        (**self).lookup(field)
    }
}

impl Record for Map<String, Value> {
    fn lookup(&self, field: &str) -> Option<Cow<'_, Value>> {
        self.get(field).map(Cow::Borrowed)
    }
}

/// Only JSON objects have keys; every other value looks up as absent.
impl Record for Value {
    fn lookup(&self, field: &str) -> Option<Cow<'_, Value>> {
        self.as_object().and_then(|object| object.lookup(field))
    }
}

impl<S: BuildHasher> Record for HashMap<String, Value, S> {
    fn lookup(&self, field: &str) -> Option<Cow<'_, Value>> {
        self.get(field).map(Cow::Borrowed)
    }
}

impl Record for BTreeMap<String, Value> {
    fn lookup(&self, field: &str) -> Option<Cow<'_, Value>> {
        self.get(field).map(Cow::Borrowed)
    }
}

/// Ordered, multi-valued string key/value container, shaped like submitted
/// form fields.
///
/// [`get`](Self::get) returns the first value stored under a name; that is
/// also what the [`Record`] lookup hands to valuers, as a JSON string.
///
/// # Examples
///
/// ```
/// use field_schema_core::FormData;
///
/// let mut form = FormData::new();
/// form.append("tag", "rust");
/// form.append("tag", "forms");
/// form.append("title", "hello");
///
/// assert_eq!(form.get("tag"), Some("rust"));
/// assert_eq!(form.get_all("tag"), vec!["rust", "forms"]);
/// assert_eq!(form.get("missing"), None);
///
/// form.set("tag", "validation");
/// assert_eq!(form.get_all("tag"), vec!["validation"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, keeping any existing values under the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every value under `name` with `value`.
    ///
    /// The new entry takes the position of the first existing one, or is
    /// appended when the name is new.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter().position(|(key, _)| *key == name) {
            Some(index) => {
                self.entries[index].1 = value;
                let mut position = 0;
                self.entries.retain(|(key, _)| {
                    let keep = *key != name || position == index;
                    position += 1;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Removes every value under `name`.
    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(key, _)| key != name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Self::new();
        for (name, value) in iter {
            form.append(name, value);
        }
        form
    }
}

impl Record for FormData {
    fn lookup(&self, field: &str) -> Option<Cow<'_, Value>> {
        self.get(field)
            .map(|value| Cow::Owned(Value::String(value.to_owned())))
    }
}
