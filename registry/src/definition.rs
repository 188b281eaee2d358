//! Serializable schema definitions.
//!
//! A definition names each field and the registered rule that handles it.
//! It carries no rule logic itself; a [`RuleRegistry`](crate::RuleRegistry)
//! turns it into an evaluable [`Schema`](field_schema_core::Schema).
//!
//! # Example YAML
//!
//! ```yaml
//! name: signup
//! fields:
//!   - name: username
//!     rule: username
//!   - name: age
//!     rule: adult_age
//! options:
//!   mode: collect
//!   parallel: false
//! ```

use std::collections::HashSet;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use field_schema_core::EvaluateOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{RegistryError, Result};

/// One schema entry: field name and the name of its registered rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub rule: String,
}

/// Structural problems in a [`SchemaDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A field name is empty or whitespace-only.
    #[error("field name cannot be empty (entry {0})")]
    EmptyFieldName(usize),
    /// Two entries declare the same field.
    #[error("duplicate field: {0}")]
    DuplicateField(String),
    /// A field references an empty rule name.
    #[error("field {0} has an empty rule name")]
    EmptyRuleName(String),
}

/// Ordered list of field definitions plus evaluation options.
///
/// # Examples
///
/// ```
/// use field_schema_registry::SchemaDefinition;
///
/// let definition = SchemaDefinition::from_yaml_str(
///     "fields:\n  - name: email\n    rule: email\n",
/// )
/// .unwrap();
/// assert_eq!(definition.fields[0].name, "email");
/// assert!(definition.validate().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub options: EvaluateOptions,
}

impl SchemaDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field handled by the rule registered as `rule`.
    pub fn with_field(mut self, name: impl Into<String>, rule: impl Into<String>) -> Self {
        self.fields.push(FieldDefinition {
            name: name.into(),
            rule: rule.into(),
        });
        self
    }

    pub fn with_options(mut self, options: EvaluateOptions) -> Self {
        self.options = options;
        self
    }

    /// Parses a YAML definition.
    ///
    /// # Errors
    ///
    /// Returns [`YamlError`](RegistryError::YamlError) on malformed input.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Parses a JSON definition.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError`](RegistryError::JsonError) on malformed input.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Loads a definition, choosing YAML or JSON by file extension.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedFormat`](RegistryError::UnsupportedFormat) for
    /// unknown extensions, [`IoError`](RegistryError::IoError) if the file
    /// cannot be read, or a parse error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let reader = BufReader::new(std::fs::File::open(path)?);
        let definition = match format {
            Format::Json => serde_json::from_reader(reader)?,
            Format::Yaml => serde_yaml::from_reader(reader)?,
        };
        Ok(definition)
    }

    /// Saves the definition, choosing YAML or JSON by file extension.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`load`](Self::load).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        match format {
            Format::Json => serde_json::to_writer_pretty(&mut writer, self)?,
            Format::Yaml => serde_yaml::to_writer(&mut writer, self)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Reports every structural problem found.
    pub fn validate(&self) -> Vec<DefinitionError> {
        let mut errors = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for (index, field) in self.fields.iter().enumerate() {
            let name = field.name.trim();
            if name.is_empty() {
                errors.push(DefinitionError::EmptyFieldName(index));
                continue;
            }
            if !seen.insert(name) {
                errors.push(DefinitionError::DuplicateField(name.to_string()));
            }
            if field.rule.trim().is_empty() {
                errors.push(DefinitionError::EmptyRuleName(name.to_string()));
            }
        }

        errors
    }
}

enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(RegistryError::UnsupportedFormat(path.display().to_string())),
        }
    }
}
