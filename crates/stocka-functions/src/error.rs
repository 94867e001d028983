//! Error taxonomy for parsing and executing call directives

use stocka_types::FunctionName;
use thiserror::Error;

/// Failures recovered locally by the registry and surfaced as text
#[derive(Debug, Error)]
pub enum FunctionCallError {
    /// The directive named something outside the catalogue
    #[error("Function '{name}' not found. Available functions: {available}")]
    UnknownFunction { name: String, available: String },

    /// A required parameter had no value
    #[error("Missing required parameter '{param}' for {function}")]
    MissingParameter {
        function: FunctionName,
        param: &'static str,
    },

    /// A number-typed parameter failed numeric coercion
    #[error("Parameter '{param}' of {function} expects a number, got '{value}'")]
    NotANumber {
        function: FunctionName,
        param: &'static str,
        value: String,
    },

    /// The underlying data-store call failed
    #[error("Query execution failed for {function}: {message}")]
    Execution {
        function: FunctionName,
        message: String,
    },
}

impl FunctionCallError {
    /// Whether the error happened before any query ran
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, Self::Execution { .. })
    }
}
