//! Error types for streaming topic discovery.
//!
//! Errors carry actionable context and fail fast with clear diagnostic
//! messages. Internal invariant violations (as opposed to caller mistakes)
//! panic instead; they are bugs, never recoverable runtime conditions.

use std::fmt;

/// Result type for tematica operations
pub type Result<T> = std::result::Result<T, TematicaError>;

/// Errors that can occur while configuring or persisting a learner
#[derive(Debug, Clone)]
pub enum TematicaError {
    /// A configuration value is outside its valid domain
    InvalidConfig {
        /// Parameter name
        param: String,
        /// Value provided, as a string
        value: String,
        /// Constraint violated
        constraint: String,
    },

    /// IO error while reading or writing a model
    IoError {
        /// What was being read or written
        context: String,
        /// Underlying error message
        message: String,
    },

    /// A persisted model does not match the expected layout
    ModelFormat {
        /// Row index at which the mismatch was detected
        row: usize,
        /// Description of the mismatch
        message: String,
    },
}

impl TematicaError {
    /// Invalid configuration value with the constraint it violates.
    pub fn invalid_config(
        param: impl Into<String>,
        value: impl fmt::Display,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            param: param.into(),
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }

    /// IO failure wrapped with the operation that was in flight.
    pub fn io_error(context: impl Into<String>, err: &std::io::Error) -> Self {
        Self::IoError {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Persisted model layout mismatch at a given row.
    pub fn model_format(row: usize, message: impl Into<String>) -> Self {
        Self::ModelFormat {
            row,
            message: message.into(),
        }
    }
}

impl fmt::Display for TematicaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid value '{value}' for '{param}'. Constraint: {constraint}"
                )
            }

            Self::IoError { context, message } => {
                write!(f, "IO error while {context}: {message}")
            }

            Self::ModelFormat { row, message } => {
                write!(f, "Model format error at row {row}: {message}")
            }
        }
    }
}

impl std::error::Error for TematicaError {}
