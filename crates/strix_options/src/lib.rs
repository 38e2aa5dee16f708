//! strix_options: analysis configuration.
//!
//! Options are read from a JSON object whose keys match the field names.
//! Every key is optional; missing keys take the defaults below.

use serde::{Deserialize, Serialize};
use strix_core::limits::DEFAULT_MAX_LITERAL_STRING_LENGTH;
use thiserror::Error;

/// Switches consulted by the type registry, the symbol table and the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    // -- Casting --
    /// Treat `null` as castable to any type, so `?int` passes where `int` is expected.
    pub null_casts_as_any_type: bool,
    /// Accept any int-or-string index on arrays, regardless of their key kind.
    pub scalar_array_key_cast: bool,

    // -- Variables --
    /// Undeclared variables in the global scope evaluate to the empty type
    /// instead of raising `UndeclaredVariable`.
    pub ignore_undeclared_variables_in_global_scope: bool,

    // -- Symbol table --
    /// Hydrate a class on first access instead of requiring `hydrate_all`.
    pub hydrate_lazily: bool,

    // -- Inference --
    /// Keep scalar literals as literal types (`1`, `'x'`) instead of widening them.
    pub literal_scalar_types: bool,
    /// Longer string literals widen to `string`.
    pub max_literal_string_length: usize,
    /// Allow overriding methods to accept a wider (or untyped) parameter.
    pub allow_method_param_type_widening: bool,
    /// Allow spreading string-keyed arrays into array literals.
    pub allow_string_key_unpack: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            null_casts_as_any_type: false,
            scalar_array_key_cast: false,
            ignore_undeclared_variables_in_global_scope: false,
            hydrate_lazily: true,
            literal_scalar_types: true,
            max_literal_string_length: DEFAULT_MAX_LITERAL_STRING_LENGTH,
            allow_method_param_type_widening: false,
            allow_string_key_unpack: false,
        }
    }
}

/// Errors while loading options from disk.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read options file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse options from a JSON string.
pub fn parse_options(content: &str) -> Result<AnalysisOptions, serde_json::Error> {
    serde_json::from_str(content)
}

/// Parse options from a JSON file.
pub fn parse_options_file(path: &str) -> Result<AnalysisOptions, OptionsError> {
    let content = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
        path: path.to_string(),
        source,
    })?;
    Ok(parse_options(&content)?)
}
