//! Evaluation options.
//!
//! Options are plain serde data so they can live next to a schema definition
//! in a config file:
//!
//! ```yaml
//! mode: collect     # or fail_fast
//! parallel: false
//! ```

use serde::{Deserialize, Serialize};

/// What happens after a field fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Keep evaluating the remaining fields and report every error (the default).
    #[default]
    Collect,
    /// Stop at the first failing field, in schema order.
    FailFast,
}

/// Options for [`Schema::evaluate_with`](crate::Schema::evaluate_with).
///
/// # Examples
///
/// ```
/// use field_schema_core::{EvaluateOptions, FailureMode};
///
/// let options = EvaluateOptions::default();
/// assert_eq!(options.mode, FailureMode::Collect);
/// assert!(!options.parallel);
///
/// let options: EvaluateOptions = serde_json::from_str(r#"{"mode": "fail_fast"}"#).unwrap();
/// assert_eq!(options.mode, FailureMode::FailFast);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateOptions {
    pub mode: FailureMode,
    /// Evaluate fields on the rayon pool. Results are merged in schema order,
    /// so outcomes are identical to a sequential pass.
    pub parallel: bool,
}

impl EvaluateOptions {
    pub fn with_mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
