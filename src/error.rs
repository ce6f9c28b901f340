//! Error types for dbalint.

use thiserror::Error;

use crate::types::TypeTag;

/// Result type alias using [`DbaError`].
pub type Result<T> = std::result::Result<T, DbaError>;

/// Error types for query validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbaError {
    /// Syntax error with location information.
    #[error("Syntax error at line {line}, column {col}: {message}")]
    SyntaxError {
        line: usize,
        col: usize,
        message: String,
    },

    /// The tokenizer could not process the input at all.
    #[error("Lexer error: {0}")]
    Lexer(String),

    /// A `Type::method` allow-list entry is malformed.
    #[error("Invalid classMethod definition: {0}")]
    InvalidClassMethod(String),

    /// Invalid analyzer configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Outcome raised when a query looks checkable but cannot be resolved safely.
///
/// This is not a failure of the analysis: the analyzer turns it into a
/// `dba.unresolvableQuery` finding and keeps the findings it already has.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnresolvableQuery {
    /// A value involved in the query has no usable static type.
    #[error("Unresolvable Query: Seems the query is too dynamic to be resolved by query simulation.")]
    TooDynamic,

    /// A bound value has a type that has no SQL literal representation.
    #[error("Unresolvable Query: Cannot simulate a parameter value of type {0}.")]
    UnsimulatableType(TypeTag),
}

impl UnresolvableQuery {
    /// Remediation hint shown next to the finding.
    #[must_use]
    pub fn tip(&self) -> &'static str {
        match self {
            UnresolvableQuery::TooDynamic => {
                "Make sure all variables involved have a non-mixed type and array-types are specified."
            }
            UnresolvableQuery::UnsimulatableType(_) => {
                "Bind scalar values only, or narrow the parameter type to a scalar type."
            }
        }
    }

    /// Message used for the rule finding.
    #[must_use]
    pub fn as_rule_message(&self) -> String {
        self.to_string()
    }
}
