//! Placeholder scanning and binding validation.
//!
//! Placeholders are taken from the SQL tokenizer, so markers inside string
//! literals, quoted identifiers and comments never count. The validator
//! only reports what it is sure about: unknown values and unparseable
//! queries produce no findings.

use tracing::debug;

use crate::config::Dialect;
use crate::error::Result;
use crate::finding::Finding;
use crate::parser::{tokenize, Token, TokenKind};
use crate::resolver::{normalize_name, ParameterBinding};
use crate::types::ValueDomain;

/// How a placeholder refers to its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// `?`, bound by order of appearance.
    Positional,
    /// `$n` or `?n`, bound to the n-th value (1-based).
    Numbered(usize),
    /// `:name`, `@name` or `$name`; holds the name without its sigil.
    Named(String),
}

/// Value type the surrounding SQL requires, when it can be told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    Any,
    /// LIMIT/OFFSET row counts.
    Integer,
}

/// A placeholder found in query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    pub kind: PlaceholderKind,
    /// Byte offset in the query text.
    pub position: usize,
    /// Length in bytes.
    pub len: usize,
    /// The placeholder as written, sigil included.
    pub text: String,
    /// 1-based line in the query text.
    pub line: usize,
    /// 1-based column in the query text.
    pub col: usize,
    pub expected: ExpectedType,
}

impl PlaceholderToken {
    /// Returns true for `?`, `$n` and `?n`.
    #[must_use]
    pub fn is_positional(&self) -> bool {
        !matches!(self.kind, PlaceholderKind::Named(_))
    }
}

/// Scans `sql` for placeholders in order of appearance.
///
/// # Errors
///
/// Returns `Lexer` if the text cannot be tokenized.
pub fn scan(sql: &str, dialect: Dialect) -> Result<Vec<PlaceholderToken>> {
    let tokens = tokenize(sql, dialect)?;
    let mut found = Vec::new();
    let mut brackets = 0_usize;

    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct("[") {
            brackets += 1;
        } else if token.is_punct("]") {
            brackets = brackets.saturating_sub(1);
        }
        let kind = match token.kind {
            // Postgres array slices: arr[1:n], arr[lo:hi]
            TokenKind::NamedPlaceholder
                if dialect == Dialect::Postgres
                    && (brackets > 0 || (i > 0 && tokens[i - 1].kind == TokenKind::Number)) =>
            {
                continue
            }
            TokenKind::PositionalPlaceholder => PlaceholderKind::Positional,
            TokenKind::NumberedPlaceholder => match token.text[1..].parse::<usize>() {
                Ok(n) if n > 0 => PlaceholderKind::Numbered(n),
                _ => continue,
            },
            TokenKind::NamedPlaceholder => {
                PlaceholderKind::Named(normalize_name(token.text).to_string())
            }
            _ => continue,
        };
        found.push(PlaceholderToken {
            kind,
            position: token.start,
            len: token.end - token.start,
            text: token.text.to_string(),
            line: token.line,
            col: token.col,
            expected: expected_type(&tokens[..i]),
        });
    }
    Ok(found)
}

/// Looks at the tokens before a placeholder for a row-count context.
fn expected_type(before: &[Token<'_>]) -> ExpectedType {
    let nth_back = |n: usize| before.len().checked_sub(n).and_then(|i| before.get(i));

    let Some(prev) = nth_back(1) else {
        return ExpectedType::Any;
    };
    if prev.is_any_keyword(&["LIMIT", "OFFSET"]) {
        return ExpectedType::Integer;
    }
    // FETCH FIRST ? ROWS
    if prev.is_any_keyword(&["FIRST", "NEXT"]) && nth_back(2).is_some_and(|t| t.is_keyword("FETCH")) {
        return ExpectedType::Integer;
    }
    // LIMIT offset, ?
    if prev.is_punct(",")
        && nth_back(2).is_some_and(|t| t.kind == TokenKind::Number || t.is_placeholder())
        && nth_back(3).is_some_and(|t| t.is_keyword("LIMIT"))
    {
        return ExpectedType::Integer;
    }
    ExpectedType::Any
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn label(token: &PlaceholderToken, positional_index: usize) -> String {
    match token.kind {
        PlaceholderKind::Positional => format!("#{}", positional_index + 1),
        PlaceholderKind::Numbered(_) | PlaceholderKind::Named(_) => token.text.clone(),
    }
}

/// Checks placeholders in query text against resolved values.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderValidator {
    dialect: Dialect,
}

impl PlaceholderValidator {
    /// Creates a validator that scans placeholders the way `dialect` writes them.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the binding mismatches of `query`, attributed to `line`.
    #[must_use]
    pub fn check(&self, query: &str, binding: &ParameterBinding, line: usize) -> Vec<Finding> {
        let placeholders = match scan(query, self.dialect) {
            Ok(placeholders) => placeholders,
            Err(e) => {
                debug!(line, error = %e, "skipping placeholder check");
                return Vec::new();
            }
        };

        let has_positional = placeholders.iter().any(PlaceholderToken::is_positional);
        let has_named = placeholders.iter().any(|p| !p.is_positional());
        if has_positional && has_named {
            return vec![Finding::placeholder_mismatch(
                "Query mixes positional and named placeholders.",
                line,
            )];
        }

        let mut findings = match binding {
            ParameterBinding::Positional(values) if has_named => {
                let message = if values.is_empty() {
                    no_values_message(distinct_names(&placeholders).len())
                } else {
                    "Query uses named placeholders, but positional values are given.".to_string()
                };
                return vec![Finding::placeholder_mismatch(message, line)];
            }
            ParameterBinding::Positional(values) => {
                let expected = expected_positional_count(&placeholders);
                if expected == values.len() {
                    Vec::new()
                } else if values.is_empty() {
                    return vec![Finding::placeholder_mismatch(no_values_message(expected), line)];
                } else {
                    let verb = if values.len() == 1 { "is" } else { "are" };
                    return vec![Finding::placeholder_mismatch(
                        format!(
                            "Query expects {}, but {} {verb} given.",
                            plural(expected, "placeholder"),
                            plural(values.len(), "value"),
                        ),
                        line,
                    )];
                }
            }
            ParameterBinding::Named(_) if has_positional => {
                return vec![Finding::placeholder_mismatch(
                    "Query uses positional placeholders, but named values are given.",
                    line,
                )];
            }
            ParameterBinding::Named(values) => {
                let names = distinct_names(&placeholders);
                let mut findings: Vec<Finding> = names
                    .iter()
                    .filter(|name| binding.named(name).is_none())
                    .map(|name| {
                        Finding::placeholder_mismatch(
                            format!("Query expects placeholder :{name}, but it is missing from values given."),
                            line,
                        )
                    })
                    .collect();
                findings.extend(
                    values
                        .iter()
                        .filter(|(name, _)| !names.contains(&name.as_str()))
                        .map(|(name, _)| {
                            Finding::placeholder_mismatch(
                                format!("Value :{name} is given, but the query does not contain this placeholder."),
                                line,
                            )
                        }),
                );
                findings
            }
        };

        findings.extend(self.check_row_counts(&placeholders, binding, line));
        findings
    }

    fn check_row_counts(
        &self,
        placeholders: &[PlaceholderToken],
        binding: &ParameterBinding,
        line: usize,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut positional_index = 0;

        for placeholder in placeholders {
            let value: Option<&ValueDomain> = match &placeholder.kind {
                PlaceholderKind::Positional => {
                    positional_index += 1;
                    binding.positional(positional_index - 1)
                }
                PlaceholderKind::Numbered(n) => binding.positional(n - 1),
                PlaceholderKind::Named(name) => binding.named(name),
            };
            if placeholder.expected != ExpectedType::Integer {
                continue;
            }
            let Some(bad) = value.and_then(ValueDomain::first_non_integer) else {
                continue;
            };
            let label = label(placeholder, positional_index.saturating_sub(1));
            findings.push(Finding::placeholder_mismatch(
                format!("Value {bad} bound to placeholder {label} is used in a LIMIT/OFFSET clause, but is not an integer."),
                line,
            ));
        }
        findings
    }
}

fn no_values_message(expected: usize) -> String {
    format!(
        "Query expects {}, but no values are given.",
        plural(expected, "placeholder")
    )
}

/// Number of values a positional query needs: one per `?`, or the highest
/// number used by `$n`/`?n`.
fn expected_positional_count(placeholders: &[PlaceholderToken]) -> usize {
    let mut questions = 0;
    let mut highest = 0;
    for placeholder in placeholders {
        match placeholder.kind {
            PlaceholderKind::Positional => questions += 1,
            PlaceholderKind::Numbered(n) => highest = highest.max(n),
            PlaceholderKind::Named(_) => {}
        }
    }
    questions.max(highest)
}

/// Placeholder names in order of first appearance.
fn distinct_names(placeholders: &[PlaceholderToken]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for placeholder in placeholders {
        if let PlaceholderKind::Named(name) = &placeholder.kind {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
    }
    names
}
