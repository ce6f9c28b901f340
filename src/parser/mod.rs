//! SQL syntax validation.
//!
//! Query text is tokenized with a per-dialect pest grammar, then the token
//! stream is checked structurally. Only violations the checker is certain
//! about are reported; constructs it does not model are accepted.

mod lexer;
mod statement;

use tracing::debug;

use crate::config::Dialect;
use crate::enumerator::CandidateQuery;
use crate::error::{DbaError, Result};
use crate::finding::Finding;

pub use lexer::{tokenize, Token, TokenKind};

/// Validates candidate query strings for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxValidator {
    dialect: Dialect,
}

impl SyntaxValidator {
    /// Creates a validator for `dialect`.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// The dialect queries are checked against.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Checks `sql` and returns the first syntax error.
    ///
    /// # Errors
    ///
    /// Returns `SyntaxError` with its location for invalid SQL, or `Lexer`
    /// if the text could not be tokenized.
    pub fn check(&self, sql: &str) -> Result<()> {
        let tokens = tokenize(sql, self.dialect)?;
        statement::check(&tokens, self.dialect)
    }

    /// Validates one candidate query.
    ///
    /// The finding message leaves out the error location: candidates of one
    /// call-site differ in length, and the same error must read the same.
    #[must_use]
    pub fn validate(&self, candidate: &CandidateQuery) -> Option<Finding> {
        match self.check(&candidate.text) {
            Ok(()) => None,
            Err(DbaError::SyntaxError { message, .. }) => Some(Finding::syntax_error(
                format!("Syntax error: {message}"),
                candidate.line,
            )),
            Err(e) => {
                debug!(line = candidate.line, error = %e, "could not check candidate query");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str) -> CandidateQuery {
        CandidateQuery {
            text: text.to_string(),
            line: 5,
        }
    }

    #[test]
    fn test_validate_clean_query() {
        let validator = SyntaxValidator::new(Dialect::Standard);
        assert_eq!(validator.validate(&candidate("SELECT * FROM users WHERE id = 1")), None);
    }

    #[test]
    fn test_validate_reports_error_message() {
        let validator = SyntaxValidator::new(Dialect::Standard);
        let finding = validator
            .validate(&candidate("SELECT * FROM users WHERE id ="))
            .unwrap();
        assert_eq!(
            finding.message(),
            "Syntax error: expected an expression after '=', found end of query"
        );
        assert_eq!(finding.line(), 5);
        assert_eq!(finding.identifier(), "dba.syntaxError");
    }

    #[test]
    fn test_message_does_not_depend_on_value_length() {
        let validator = SyntaxValidator::new(Dialect::Standard);
        let short = validator.validate(&candidate("SELECT * FROM t WHERE a = 'x' ORDER a"));
        let long = validator.validate(&candidate("SELECT * FROM t WHERE a = 'yyyy' ORDER a"));
        assert!(short.is_some());
        assert_eq!(short, long);
        assert!(validator.check("SELECT * FROM t WHERE a = 'yyyy' ORDER a").is_err());
    }

    #[test]
    fn test_check_is_dialect_aware() {
        let sql = "SELECT * FROM t WHERE a = 'it\\'s'";
        assert!(SyntaxValidator::new(Dialect::Mysql).check(sql).is_ok());
        assert!(SyntaxValidator::new(Dialect::Standard).check(sql).is_err());
    }
}
