//! Named rule registry and file-backed schema definitions.
//!
//! Field rules are closures and cannot live in a config file. This crate lets
//! an application register its rules by name in a [`RuleRegistry`] and keep
//! the shape of each schema (which fields, which rule, which options) in a
//! YAML or JSON [`SchemaDefinition`].
//!
//! # Quick start
//!
//! ```no_run
//! use field_schema_core::FormData;
//! use field_schema_registry::{RuleRegistry, SchemaDefinition};
//!
//! let registry = RuleRegistry::new();
//! // registry.register("email", email_rule()); ...
//!
//! let definition = SchemaDefinition::load("schemas/signup.yaml").unwrap();
//! for problem in definition.validate() {
//!     eprintln!("signup.yaml: {problem}");
//! }
//!
//! let schema = registry.resolve(&definition);
//! if !schema.unresolved_fields().is_empty() {
//!     eprintln!("unregistered rules for {:?}", schema.unresolved_fields());
//! }
//!
//! let form = FormData::new();
//! let outcome = schema.evaluate_with(&form, &definition.options);
//! ```

mod definition;
mod error;
mod registry;

pub use definition::{DefinitionError, FieldDefinition, SchemaDefinition};
pub use error::{RegistryError, Result};
pub use registry::RuleRegistry;
