//! Pest tokenizer for SQL text.

use pest::Parser;
use pest_derive::Parser;

use crate::config::Dialect;
use crate::error::{DbaError, Result};

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
struct SqlLexer;

/// Token categories produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Keyword or unquoted identifier.
    Word,
    /// Quoted identifier (`"x"`, `` `x` ``, `[x]`).
    QuotedIdent,
    /// String literal, including dollar-quoted strings.
    String,
    /// Numeric literal.
    Number,
    /// `?`
    PositionalPlaceholder,
    /// `$1`, `?1`
    NumberedPlaceholder,
    /// `:name`, `@name`, `$name`
    NamedPlaceholder,
    /// MySQL `@var` / `@@var`.
    Variable,
    /// Operator symbol.
    Operator,
    /// Parenthesis, bracket, comma, semicolon, dot or brace.
    Punct,
    /// Anything else.
    Unknown,
    /// String literal without its closing quote.
    UnterminatedString,
    /// Quoted identifier without its closing quote.
    UnterminatedIdent,
    /// Block comment without `*/`.
    UnterminatedComment,
}

/// A token with its location in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub line: usize,
    pub col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Token<'_> {
    /// Returns true for a word equal to `keyword`, ignoring ASCII case.
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Returns true for a word equal to any of `keywords`.
    #[must_use]
    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.is_keyword(k))
    }

    /// Returns true for the punctuation `p`.
    #[must_use]
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Returns true for the operator `op`.
    #[must_use]
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    /// Returns true for any placeholder token.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::PositionalPlaceholder
                | TokenKind::NumberedPlaceholder
                | TokenKind::NamedPlaceholder
        )
    }

    /// Returns true for a word or quoted identifier.
    #[must_use]
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::QuotedIdent)
    }
}

fn entry_rule(dialect: Dialect) -> Rule {
    match dialect {
        Dialect::Standard => Rule::standard_tokens,
        Dialect::Mysql => Rule::mysql_tokens,
        Dialect::Postgres => Rule::postgres_tokens,
        Dialect::Sqlite => Rule::sqlite_tokens,
    }
}

fn token_kind(rule: Rule) -> Option<TokenKind> {
    let kind = match rule {
        Rule::word => TokenKind::Word,
        Rule::quoted_ident | Rule::backtick_ident | Rule::bracket_ident => TokenKind::QuotedIdent,
        Rule::string
        | Rule::mysql_string
        | Rule::escape_string
        | Rule::dollar_string => TokenKind::String,
        Rule::number => TokenKind::Number,
        Rule::positional_placeholder => TokenKind::PositionalPlaceholder,
        Rule::numbered_placeholder | Rule::dollar_placeholder => TokenKind::NumberedPlaceholder,
        Rule::named_placeholder | Rule::sigil_placeholder => TokenKind::NamedPlaceholder,
        Rule::user_variable => TokenKind::Variable,
        Rule::operator | Rule::pg_operator => TokenKind::Operator,
        Rule::punct => TokenKind::Punct,
        Rule::unknown => TokenKind::Unknown,
        Rule::unterminated_string
        | Rule::unterminated_mysql_string
        | Rule::unterminated_dollar_string => TokenKind::UnterminatedString,
        Rule::unterminated_quoted_ident
        | Rule::unterminated_backtick_ident
        | Rule::unterminated_bracket_ident => TokenKind::UnterminatedIdent,
        Rule::unterminated_comment => TokenKind::UnterminatedComment,
        _ => return None,
    };
    Some(kind)
}

/// Splits `sql` into tokens, dropping whitespace and comments.
///
/// # Errors
///
/// Returns `Lexer` if the grammar rejects the input, which the catch-all
/// `unknown` token is meant to rule out.
pub fn tokenize(sql: &str, dialect: Dialect) -> Result<Vec<Token<'_>>> {
    let pairs = SqlLexer::parse(entry_rule(dialect), sql)
        .map_err(|e| DbaError::Lexer(e.variant.message().to_string()))?;

    let mut tokens = Vec::new();
    for pair in pairs {
        for inner in pair.into_inner() {
            let Some(kind) = token_kind(inner.as_rule()) else {
                continue;
            };
            let span = inner.as_span();
            let (line, col) = span.start_pos().line_col();
            let (end_line, end_col) = span.end_pos().line_col();
            tokens.push(Token {
                kind,
                text: span.as_str(),
                start: span.start(),
                end: span.end(),
                line,
                col,
                end_line,
                end_col,
            });
        }
    }
    Ok(tokens)
}
