//! Named rule registry.
//!
//! Rules are registered under a name once, in code, and schema definitions
//! loaded from data refer to them by that name. A reference that does not
//! resolve is kept in the schema as a field without a valuer, so it surfaces
//! as a configuration error when the schema is evaluated.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use field_schema_core::{FieldErrors, FieldRule, Record, Schema, SharedRule, TypedRecord};
use tracing::debug;

use crate::definition::SchemaDefinition;

/// Name → rule lookup used to resolve [`SchemaDefinition`]s.
///
/// # Examples
///
/// ```
/// use field_schema_core::{FieldError, FieldRule, FormData, VALUER_NOT_CALLABLE};
/// use field_schema_registry::{RuleRegistry, SchemaDefinition};
/// use serde_json::Value;
///
/// let mut registry = RuleRegistry::new();
/// registry.register("text", FieldRule::new(|raw: Option<&Value>, field: &str| {
///     raw.and_then(Value::as_str)
///         .map(str::to_owned)
///         .ok_or_else(|| FieldError::new("required", field, Value::Null))
/// }));
///
/// let definition = SchemaDefinition::new()
///     .with_field("title", "text")
///     .with_field("body", "markdown");
/// let schema = registry.resolve(&definition);
/// assert_eq!(schema.unresolved_fields(), vec!["body"]);
///
/// let form: FormData = [("title", "hi"), ("body", "...")].into_iter().collect();
/// let errors = schema.evaluate(&form).unwrap_err();
/// assert_eq!(errors[0].field(), "body");
/// assert_eq!(errors[0].message(), VALUER_NOT_CALLABLE);
/// ```
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, SharedRule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rule` under `name`, replacing any previous rule.
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        rule: FieldRule<T>,
    ) -> &mut Self {
        self.register_shared(name, Arc::new(rule))
    }

    pub fn register_shared(&mut self, name: impl Into<String>, rule: SharedRule) -> &mut Self {
        self.rules.insert(name.into(), rule);
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_rule<T: Any + Send + Sync>(mut self, name: impl Into<String>, rule: FieldRule<T>) -> Self {
        self.register(name, rule);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SharedRule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Registered rule names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Builds a schema from `definition`.
    ///
    /// Unregistered rule names become unresolved fields whose offending
    /// value is the rule name.
    pub fn resolve(&self, definition: &SchemaDefinition) -> Schema {
        let mut schema = Schema::new();
        for field in &definition.fields {
            schema = match self.rules.get(&field.rule) {
                Some(rule) => schema.shared(field.name.clone(), Arc::clone(rule)),
                None => {
                    debug!(field = %field.name, rule = %field.rule, "rule not registered");
                    schema.unresolved(field.name.clone(), field.rule.clone())
                }
            };
        }
        schema
    }

    /// Resolves `definition` and evaluates it against `record` with the
    /// definition's own options.
    ///
    /// # Errors
    ///
    /// See [`Schema::evaluate`].
    pub fn evaluate<R: Record + Sync + ?Sized>(
        &self,
        definition: &SchemaDefinition,
        record: &R,
    ) -> Result<TypedRecord, FieldErrors> {
        self.resolve(definition)
            .evaluate_with(record, &definition.options)
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}
