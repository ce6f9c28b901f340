//! Structural checks over the token stream.
//!
//! The checker walks the statement kinds it models and reports the first
//! violation it is certain about. On anything it does not model it stops
//! checking the current statement, or the current parenthesized group, and
//! accepts the rest.

use tracing::trace;

use super::lexer::{Token, TokenKind};
use crate::config::Dialect;
use crate::error::{DbaError, Result};

/// Words that never start an operand.
const NEVER_OPERAND: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "UNION", "INTERSECT",
    "EXCEPT", "AND", "OR", "JOIN", "ON", "WHEN", "THEN", "ELSE", "INTO",
];

/// Words never taken as an implicit alias.
const NOT_ALIAS: &[&str] = &[
    "AS", "SET", "USING", "NATURAL", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS",
    "STRAIGHT_JOIN", "LATERAL", "WINDOW", "OFFSET", "FETCH", "FOR", "LOCK", "RETURNING",
    "WITH", "NOT", "IS", "IN", "LIKE", "BETWEEN", "USE", "FORCE", "IGNORE", "PARTITION",
    "TABLESAMPLE", "INDEXED", "ASC", "DESC", "NULLS", "MINUS", "OVER", "FILTER", "ESCAPE",
    "COLLATE", "VALUES", "DEFAULT", "END", "CASE", "PROCEDURE", "QUALIFY", "ISNULL", "NOTNULL",
];

const COMPARISON: &[&str] = &["=", "==", "<>", "!=", "<", ">", "<=", ">=", "<=>"];

const INTERVAL_UNITS: &[&str] = &[
    "MICROSECOND", "SECOND", "MINUTE", "HOUR", "DAY", "WEEK", "MONTH", "QUARTER", "YEAR",
    "SECOND_MICROSECOND", "MINUTE_MICROSECOND", "MINUTE_SECOND", "HOUR_MICROSECOND",
    "HOUR_SECOND", "HOUR_MINUTE", "DAY_MICROSECOND", "DAY_SECOND", "DAY_MINUTE", "DAY_HOUR",
    "YEAR_MONTH",
];

const MYSQL_SELECT_MODIFIERS: &[&str] = &[
    "DISTINCTROW", "HIGH_PRIORITY", "STRAIGHT_JOIN", "SQL_SMALL_RESULT", "SQL_BIG_RESULT",
    "SQL_BUFFER_RESULT", "SQL_NO_CACHE", "SQL_CACHE", "SQL_CALC_FOUND_ROWS",
];

fn syntax_error(line: usize, col: usize, message: impl Into<String>) -> DbaError {
    DbaError::SyntaxError {
        line,
        col,
        message: message.into(),
    }
}

enum Stop {
    /// Unmodeled construct: accept the rest of the current group.
    Bail,
    Error(DbaError),
}

type Step<T = ()> = std::result::Result<T, Stop>;

/// Where a token slice ends: a `;`, a closing `)`, or the end of the query.
#[derive(Debug, Clone, Copy)]
struct Boundary<'t, 'a> {
    token: Option<&'t Token<'a>>,
    line: usize,
    col: usize,
}

impl<'t, 'a> Boundary<'t, 'a> {
    fn at(token: &'t Token<'a>) -> Self {
        Self {
            token: Some(token),
            line: token.line,
            col: token.col,
        }
    }

    fn end_of(tokens: &'t [Token<'a>]) -> Self {
        let (line, col) = tokens.last().map_or((1, 1), |t| (t.end_line, t.end_col));
        Self {
            token: None,
            line,
            col,
        }
    }

    fn label(&self) -> String {
        match self.token {
            Some(token) => format!("'{}'", token.text),
            None => "end of query".to_string(),
        }
    }
}

/// Checks every `;`-separated statement of a tokenized query.
pub(crate) fn check(tokens: &[Token<'_>], dialect: Dialect) -> Result<()> {
    check_lexical(tokens, dialect)?;

    let mut start = 0;
    let mut depth = 0_usize;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "(" | "[" => depth += 1,
            ")" | "]" => depth = depth.saturating_sub(1),
            ";" if depth == 0 => {
                check_statement(&tokens[start..i], dialect, Boundary::at(token))?;
                start = i + 1;
            }
            _ => {}
        }
    }
    check_statement(&tokens[start..], dialect, Boundary::end_of(tokens))
}

/// Reports unterminated literals and comments, unbalanced brackets and,
/// for MySQL, an empty query.
fn check_lexical(tokens: &[Token<'_>], dialect: Dialect) -> Result<()> {
    if tokens.is_empty() {
        return match dialect {
            Dialect::Mysql => Err(syntax_error(1, 1, "Query was empty")),
            _ => Ok(()),
        };
    }

    let mut open: Vec<&Token<'_>> = Vec::new();
    for token in tokens {
        let message = match token.kind {
            TokenKind::UnterminatedString if token.text.starts_with('$') => {
                "unterminated dollar-quoted string"
            }
            TokenKind::UnterminatedString => "unterminated string literal",
            TokenKind::UnterminatedIdent => "unterminated quoted identifier",
            TokenKind::UnterminatedComment => "unterminated comment",
            TokenKind::Punct => {
                match token.text {
                    "(" | "[" => open.push(token),
                    ")" | "]" => {
                        let opener = if token.text == ")" { "(" } else { "[" };
                        match open.pop() {
                            Some(o) if o.text == opener => {}
                            _ => {
                                return Err(syntax_error(
                                    token.line,
                                    token.col,
                                    format!("unexpected '{}'", token.text),
                                ))
                            }
                        }
                    }
                    _ => {}
                }
                continue;
            }
            _ => continue,
        };
        return Err(syntax_error(token.line, token.col, message));
    }

    if let Some(unclosed) = open.last() {
        let end = Boundary::end_of(tokens);
        let closer = if unclosed.text == "(" { ")" } else { "]" };
        return Err(syntax_error(
            end.line,
            end.col,
            format!(
                "missing '{closer}' to close '{}' opened at line {}, column {}",
                unclosed.text, unclosed.line, unclosed.col
            ),
        ));
    }
    Ok(())
}

fn check_statement<'t, 'a>(
    tokens: &'t [Token<'a>],
    dialect: Dialect,
    boundary: Boundary<'t, 'a>,
) -> Result<()> {
    if tokens.is_empty() {
        return Ok(());
    }
    let mut checker = Checker {
        tokens,
        pos: 0,
        dialect,
        boundary,
        opener: None,
    };
    match checker.statement() {
        Ok(()) => Ok(()),
        Err(Stop::Bail) => {
            trace!(
                token = checker.peek().map(|t| t.text),
                "statement check stopped at unmodeled construct"
            );
            Ok(())
        }
        Err(Stop::Error(e)) => Err(e),
    }
}

/// Number of comma-separated items in a group's contents.
fn count_items(tokens: &[Token<'_>]) -> usize {
    if tokens.is_empty() {
        return 0;
    }
    let mut depth = 0_usize;
    let mut items = 1;
    for token in tokens.iter().filter(|t| t.kind == TokenKind::Punct) {
        match token.text {
            "(" | "[" => depth += 1,
            ")" | "]" => depth = depth.saturating_sub(1),
            "," if depth == 0 => items += 1,
            _ => {}
        }
    }
    items
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Start,
    From,
    Where,
    GroupBy,
    Having,
    Subquery,
    OrderBy,
    Limit,
    Offset,
}

impl Clause {
    fn rank(self) -> u8 {
        match self {
            Clause::Start => 0,
            Clause::From => 2,
            Clause::Where => 4,
            Clause::GroupBy => 6,
            Clause::Having => 8,
            Clause::Subquery => 9,
            Clause::OrderBy => 10,
            Clause::Limit | Clause::Offset => 12,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Clause::Start => "SELECT",
            Clause::From => "FROM",
            Clause::Where => "WHERE",
            Clause::GroupBy => "GROUP BY",
            Clause::Having => "HAVING",
            Clause::Subquery => ")",
            Clause::OrderBy => "ORDER BY",
            Clause::Limit => "LIMIT",
            Clause::Offset => "OFFSET",
        }
    }
}

/// What may follow after an operand.
enum Continuation {
    Operand { after_in: bool },
    Postfix,
    Done,
}

struct Checker<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    dialect: Dialect,
    boundary: Boundary<'t, 'a>,
    /// The `(` a nested checker was opened by.
    opener: Option<&'t Token<'a>>,
}

impl<'t, 'a> Checker<'t, 'a> {
    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos + n)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn prev(&self) -> Option<&'t Token<'a>> {
        match self.pos {
            0 => self.opener,
            pos => self.tokens.get(pos - 1),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn peek_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.peek_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_any_keyword(&mut self, keywords: &[&str]) -> bool {
        let found = self.peek().is_some_and(|t| t.is_any_keyword(keywords));
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        let found = self.peek_punct(p);
        if found {
            self.pos += 1;
        }
        found
    }

    /// True where an expected item is certainly missing: at the end, before
    /// a comma, or before a word that cannot start one.
    fn at_stop(&self) -> bool {
        match self.peek() {
            None => true,
            Some(t) => t.is_punct(",") || t.is_any_keyword(NEVER_OPERAND),
        }
    }

    fn finish(&self) -> Step {
        if self.at_end() {
            Ok(())
        } else {
            Err(Stop::Bail)
        }
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => format!("'{}'", token.text),
            None => self.boundary.label(),
        }
    }

    fn error_here(&self, message: String) -> Stop {
        let (line, col) = self
            .peek()
            .map_or((self.boundary.line, self.boundary.col), |t| (t.line, t.col));
        Stop::Error(syntax_error(line, col, message))
    }

    fn expected(&self, what: &str) -> Stop {
        let message = match self.prev() {
            Some(prev) => format!("expected {what} after '{}', found {}", prev.text, self.found()),
            None => format!("expected {what}, found {}", self.found()),
        };
        self.error_here(message)
    }

    /// `expected(what)` where certain, otherwise stop checking.
    fn expected_or_bail(&self, what: &str) -> Stop {
        if self.at_stop() {
            self.expected(what)
        } else {
            Stop::Bail
        }
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    fn matching_close(&self, open: &str, close: &str) -> Step<usize> {
        if !self.peek_punct(open) {
            return Err(Stop::Bail);
        }
        let mut depth = 0_usize;
        for (i, token) in self.tokens.iter().enumerate().skip(self.pos) {
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
        }
        Err(Stop::Bail)
    }

    /// Consumes a parenthesized group and returns a checker over its contents.
    fn enter(&mut self) -> Step<Checker<'t, 'a>> {
        let opener = self.peek();
        let close = self.matching_close("(", ")")?;
        let child = Checker {
            tokens: &self.tokens[self.pos + 1..close],
            pos: 0,
            dialect: self.dialect,
            boundary: Boundary::at(&self.tokens[close]),
            opener,
        };
        self.pos = close + 1;
        Ok(child)
    }

    /// Checks a parenthesized group with `f`. Stopping inside the group
    /// does not stop the enclosing statement.
    fn nested<F>(&mut self, f: F) -> Step
    where
        F: FnOnce(&mut Checker<'t, 'a>) -> Step,
    {
        let mut child = self.enter()?;
        match f(&mut child).and_then(|()| child.finish()) {
            Ok(()) | Err(Stop::Bail) => Ok(()),
            Err(stop) => Err(stop),
        }
    }

    fn skip_group(&mut self) -> Step {
        self.enter().map(|_| ())
    }

    fn skip_brackets(&mut self) -> Step {
        self.pos = self.matching_close("[", "]")? + 1;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> Step {
        self.statement_body()?;
        self.finish()
    }

    fn statement_body(&mut self) -> Step {
        let Some(first) = self.peek() else {
            return Err(self.expected("a statement"));
        };
        if first.is_keyword("SELECT") || first.is_punct("(") {
            self.query()
        } else if first.is_keyword("WITH") {
            self.with_statement()
        } else if first.is_any_keyword(&["INSERT", "REPLACE"]) {
            self.insert()
        } else if first.is_keyword("UPDATE") {
            self.update()
        } else if first.is_keyword("DELETE") {
            self.delete()
        } else {
            Err(Stop::Bail)
        }
    }

    fn with_statement(&mut self) -> Step {
        self.pos += 1;
        self.eat_keyword("RECURSIVE");
        loop {
            match self.peek() {
                Some(t) if t.is_name() && !t.is_any_keyword(NEVER_OPERAND) => self.pos += 1,
                _ => return Err(self.expected_or_bail("a name")),
            }
            if self.peek_punct("(") {
                self.skip_group()?;
            }
            if !self.eat_keyword("AS") {
                return Err(self.expected_or_bail("AS"));
            }
            self.eat_keyword("NOT");
            self.eat_keyword("MATERIALIZED");
            if !self.peek_punct("(") {
                return Err(self.expected_or_bail("'('"));
            }
            self.nested(Checker::statement_body)?;
            if !self.eat_punct(",") {
                break;
            }
        }
        self.statement_body()
    }

    fn query(&mut self) -> Step {
        if self.peek_keyword("WITH") {
            return self.with_statement();
        }
        let mut parenthesized = self.query_term()?;
        while self.eat_any_keyword(&["UNION", "INTERSECT", "EXCEPT"]) {
            self.eat_any_keyword(&["ALL", "DISTINCT"]);
            parenthesized = self.query_term()?;
        }
        if parenthesized {
            self.clauses(Clause::Subquery)?;
        }
        Ok(())
    }

    /// A `SELECT` or a parenthesized query; true for the latter.
    fn query_term(&mut self) -> Step<bool> {
        match self.peek() {
            Some(t) if t.is_keyword("SELECT") => {
                self.select_core()?;
                Ok(false)
            }
            Some(t) if t.is_punct("(") => {
                let inner_is_query = self
                    .peek_nth(1)
                    .is_some_and(|t| t.is_any_keyword(&["SELECT", "WITH"]) || t.is_punct("("));
                if inner_is_query {
                    self.nested(Checker::query)?;
                } else {
                    self.skip_group()?;
                }
                Ok(true)
            }
            _ => Err(self.expected_or_bail("SELECT")),
        }
    }

    fn select_core(&mut self) -> Step {
        self.pos += 1;
        loop {
            if self.eat_keyword("DISTINCT") {
                if self.dialect == Dialect::Postgres && self.eat_keyword("ON") {
                    if !self.peek_punct("(") {
                        return Err(Stop::Bail);
                    }
                    self.skip_group()?;
                }
                continue;
            }
            let modifier = self.eat_keyword("ALL")
                || (self.dialect == Dialect::Mysql && self.eat_any_keyword(MYSQL_SELECT_MODIFIERS));
            if !modifier {
                break;
            }
        }

        let empty_list = self.dialect == Dialect::Postgres
            && self.peek().map_or(true, |t| {
                t.is_any_keyword(&[
                    "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "UNION",
                    "INTERSECT", "EXCEPT",
                ])
            });
        if !empty_list {
            loop {
                self.expr()?;
                self.alias()?;
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.clauses(Clause::Start)
    }

    /// `FROM`, `WHERE`, `GROUP BY`, `HAVING`, `ORDER BY`, `LIMIT` and
    /// `OFFSET`, each at most once and in that order. `LIMIT` and `OFFSET`
    /// may come in either order.
    fn clauses(&mut self, mut last: Clause) -> Step {
        let mut seen_limit = false;
        let mut seen_offset = false;
        loop {
            let Some(token) = self.peek() else {
                return Ok(());
            };
            let clause = if token.is_keyword("FROM") {
                Clause::From
            } else if token.is_keyword("WHERE") {
                Clause::Where
            } else if token.is_keyword("GROUP") {
                Clause::GroupBy
            } else if token.is_keyword("HAVING") {
                Clause::Having
            } else if token.is_keyword("ORDER") {
                Clause::OrderBy
            } else if token.is_keyword("LIMIT") {
                Clause::Limit
            } else if token.is_keyword("OFFSET") {
                Clause::Offset
            } else {
                return Ok(());
            };

            let misplaced = clause.rank() < last.rank()
                || clause == last
                || (clause == Clause::Limit && seen_limit)
                || (clause == Clause::Offset && seen_offset);
            if misplaced {
                return Err(self.error_here(format!(
                    "unexpected '{}' after '{}'",
                    clause.label(),
                    last.label()
                )));
            }
            self.pos += 1;

            match clause {
                Clause::From => self.table_refs()?,
                Clause::Where | Clause::Having => self.expr()?,
                Clause::GroupBy => {
                    self.expect_by()?;
                    self.expression_list()?;
                    if self.peek_keyword("WITH")
                        && self.peek_nth(1).is_some_and(|t| t.is_keyword("ROLLUP"))
                    {
                        self.pos += 2;
                    }
                }
                Clause::OrderBy => {
                    self.expect_by()?;
                    self.order_items()?;
                }
                Clause::Limit => {
                    seen_limit = true;
                    self.expr()?;
                    if self.eat_punct(",") {
                        self.expr()?;
                    }
                }
                Clause::Offset => {
                    seen_offset = true;
                    self.expr()?;
                    self.eat_any_keyword(&["ROW", "ROWS"]);
                }
                Clause::Start | Clause::Subquery => {}
            }
            last = clause;
        }
    }

    fn expect_by(&mut self) -> Step {
        if self.eat_keyword("BY") {
            Ok(())
        } else {
            Err(self.expected("BY"))
        }
    }

    fn order_items(&mut self) -> Step {
        loop {
            self.expr()?;
            self.eat_any_keyword(&["ASC", "DESC"]);
            if self.eat_keyword("NULLS") && !self.eat_any_keyword(&["FIRST", "LAST"]) {
                return Err(Stop::Bail);
            }
            if !self.eat_punct(",") {
                return Ok(());
            }
        }
    }

    fn alias(&mut self) -> Step {
        if self.eat_keyword("AS") {
            return match self.peek() {
                Some(t)
                    if (t.is_name() && !t.is_any_keyword(NEVER_OPERAND))
                        || t.kind == TokenKind::String =>
                {
                    self.pos += 1;
                    Ok(())
                }
                _ => Err(self.expected_or_bail("an alias")),
            };
        }
        let bare = self.peek().is_some_and(|t| match t.kind {
            TokenKind::QuotedIdent => true,
            TokenKind::Word => !t.is_any_keyword(NEVER_OPERAND) && !t.is_any_keyword(NOT_ALIAS),
            _ => false,
        });
        if bare {
            self.pos += 1;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Table references
    // ------------------------------------------------------------------

    fn table_refs(&mut self) -> Step {
        self.table_ref()?;
        loop {
            if self.eat_punct(",") {
                self.table_ref()?;
            } else if !self.join()? {
                return Ok(());
            }
        }
    }

    fn table_ref(&mut self) -> Step {
        self.eat_keyword("LATERAL");
        if self.dialect == Dialect::Postgres {
            self.eat_keyword("ONLY");
        }
        let Some(token) = self.peek() else {
            return Err(self.expected("a table name"));
        };
        match token.kind {
            TokenKind::Punct if token.text == "(" => match self.peek_nth(1) {
                Some(t) if t.is_punct(")") => {
                    self.pos += 1;
                    return Err(self.expected("a table name"));
                }
                Some(t) if t.is_any_keyword(&["SELECT", "WITH"]) => self.nested(Checker::query)?,
                _ => self.nested(Checker::table_refs)?,
            },
            TokenKind::Punct if token.text == "," => return Err(self.expected("a table name")),
            TokenKind::Word if token.is_any_keyword(NEVER_OPERAND) || token.is_keyword("SET") => {
                return Err(self.expected("a table name"));
            }
            TokenKind::Word | TokenKind::QuotedIdent => {
                self.qualified_name()?;
                if self.peek_punct("(") {
                    self.skip_group()?;
                }
            }
            _ => return Err(Stop::Bail),
        }
        self.alias()?;
        if self.peek_punct("(") {
            self.skip_group()?;
        }
        Ok(())
    }

    /// Parses one join if the next tokens start one.
    fn join(&mut self) -> Step<bool> {
        let start = self.pos;
        if !self.eat_keyword("STRAIGHT_JOIN") {
            self.eat_keyword("NATURAL");
            if self.eat_any_keyword(&["LEFT", "RIGHT", "FULL"]) {
                self.eat_keyword("OUTER");
            } else {
                self.eat_any_keyword(&["INNER", "CROSS"]);
            }
            if !self.eat_keyword("JOIN") {
                if self.pos == start {
                    return Ok(false);
                }
                return Err(self.expected_or_bail("JOIN"));
            }
        }
        self.table_ref()?;
        if self.eat_keyword("ON") {
            self.expr()?;
        } else if self.eat_keyword("USING") {
            if !self.peek_punct("(") {
                return Err(self.expected_or_bail("'('"));
            }
            self.nested(|c| c.names().map(|_| ()))?;
        }
        Ok(true)
    }

    /// Comma-separated column names; returns how many.
    fn names(&mut self) -> Step<usize> {
        if self.at_end() {
            return Ok(0);
        }
        let mut count = 0;
        loop {
            match self.peek() {
                Some(t) if t.is_name() && !t.is_any_keyword(NEVER_OPERAND) => self.qualified_name()?,
                _ => return Err(self.expected_or_bail("a column name")),
            }
            count += 1;
            if !self.eat_punct(",") {
                return Ok(count);
            }
        }
    }

    fn qualified_name(&mut self) -> Step {
        self.pos += 1;
        while self.eat_punct(".") {
            match self.peek() {
                Some(t) if t.is_name() || t.is_operator("*") => self.pos += 1,
                _ => return Err(self.expected_or_bail("a name")),
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Data modification
    // ------------------------------------------------------------------

    fn insert(&mut self) -> Step {
        self.pos += 1;
        if self.dialect == Dialect::Mysql {
            while self.eat_any_keyword(&["LOW_PRIORITY", "DELAYED", "HIGH_PRIORITY", "IGNORE"]) {}
        }
        self.or_conflict_clause()?;
        self.eat_keyword("INTO");

        match self.peek() {
            Some(t) if t.is_any_keyword(&["VALUES", "VALUE", "SET", "SELECT", "DEFAULT"]) => {
                return Err(self.expected("a table name"));
            }
            Some(t) if t.is_name() && !t.is_any_keyword(NEVER_OPERAND) => self.qualified_name()?,
            _ => return Err(self.expected_or_bail("a table name")),
        }
        if self.eat_keyword("AS") {
            match self.peek() {
                Some(t) if t.is_name() => self.pos += 1,
                _ => return Err(Stop::Bail),
            }
        }

        let mut columns = None;
        if self.peek_punct("(") {
            let source_query = self
                .peek_nth(1)
                .is_some_and(|t| t.is_any_keyword(&["SELECT", "WITH"]) || t.is_punct("("));
            if source_query {
                self.nested(Checker::query)?;
                return self.insert_tail();
            }
            columns = self.column_list()?;
        }

        match self.peek() {
            Some(t)
                if t.is_keyword("VALUES")
                    || (self.dialect == Dialect::Mysql && t.is_keyword("VALUE")) =>
            {
                self.pos += 1;
                self.value_rows(columns)?;
            }
            Some(t) if t.is_any_keyword(&["SELECT", "WITH"]) || t.is_punct("(") => self.query()?,
            Some(t) if t.is_keyword("SET") && columns.is_none() => {
                self.pos += 1;
                self.assignments()?;
            }
            Some(t) if t.is_keyword("DEFAULT") => {
                self.pos += 1;
                if !self.eat_keyword("VALUES") {
                    return Err(self.expected_or_bail("VALUES"));
                }
            }
            None => return Err(self.expected("VALUES or SELECT")),
            Some(_) => return Err(Stop::Bail),
        }
        self.insert_tail()
    }

    /// SQLite `OR REPLACE` and friends.
    fn or_conflict_clause(&mut self) -> Step {
        if self.eat_keyword("OR") {
            match self.peek() {
                Some(t) if t.kind == TokenKind::Word => self.pos += 1,
                _ => return Err(self.expected_or_bail("a conflict resolution")),
            }
        }
        Ok(())
    }

    /// Column list of an `INSERT`; `None` if its shape is not modeled.
    fn column_list(&mut self) -> Step<Option<usize>> {
        let mut child = self.enter()?;
        match child.names().and_then(|n| child.finish().map(|()| n)) {
            Ok(n) => Ok(Some(n)),
            Err(Stop::Bail) => Ok(None),
            Err(stop) => Err(stop),
        }
    }

    fn value_rows(&mut self, columns: Option<usize>) -> Step {
        let mut expected = columns;
        let mut row = 0;
        loop {
            row += 1;
            let Some(open) = self.peek().filter(|t| t.is_punct("(")) else {
                return Err(self.expected_or_bail("'('"));
            };
            let close = self.matching_close("(", ")")?;
            let count = count_items(&self.tokens[self.pos + 1..close]);
            self.nested(Checker::row_values)?;
            match expected {
                Some(n) if n != count => {
                    return Err(Stop::Error(syntax_error(
                        open.line,
                        open.col,
                        format!("Column count doesn't match value count at row {row}"),
                    )));
                }
                None => expected = Some(count),
                Some(_) => {}
            }
            if !self.eat_punct(",") {
                return Ok(());
            }
        }
    }

    fn row_values(&mut self) -> Step {
        if self.at_end() && self.dialect == Dialect::Mysql {
            return Ok(());
        }
        self.expression_list()
    }

    fn insert_tail(&mut self) -> Step {
        let on_duplicate = self.peek_keyword("ON")
            && self.peek_nth(1).is_some_and(|t| t.is_keyword("DUPLICATE"))
            && self.peek_nth(2).is_some_and(|t| t.is_keyword("KEY"))
            && self.peek_nth(3).is_some_and(|t| t.is_keyword("UPDATE"));
        if on_duplicate {
            self.pos += 4;
            self.assignments()?;
        }
        Ok(())
    }

    fn assignments(&mut self) -> Step {
        loop {
            match self.peek() {
                Some(t) if t.is_name() && !t.is_any_keyword(NEVER_OPERAND) => self.qualified_name()?,
                _ => return Err(self.expected_or_bail("a column name")),
            }
            match self.peek() {
                Some(t) if t.is_operator("=") || t.is_operator(":=") => self.pos += 1,
                _ => return Err(self.expected_or_bail("'='")),
            }
            self.expr()?;
            if !self.eat_punct(",") {
                return Ok(());
            }
        }
    }

    fn update(&mut self) -> Step {
        self.pos += 1;
        if self.dialect == Dialect::Mysql {
            while self.eat_any_keyword(&["LOW_PRIORITY", "IGNORE"]) {}
        }
        self.or_conflict_clause()?;
        self.table_refs()?;
        if !self.eat_keyword("SET") {
            return Err(self.expected_or_bail("SET"));
        }
        self.assignments()?;
        self.clauses(Clause::Start)
    }

    fn delete(&mut self) -> Step {
        self.pos += 1;
        if self.dialect == Dialect::Mysql {
            while self.eat_any_keyword(&["LOW_PRIORITY", "QUICK", "IGNORE"]) {}
        }
        if self.eat_keyword("FROM") {
            self.table_refs()?;
        } else {
            match self.peek() {
                Some(t) if t.is_name() && !t.is_any_keyword(NEVER_OPERAND) => {
                    self.names()?;
                    if !self.eat_keyword("FROM") {
                        return Err(self.expected_or_bail("FROM"));
                    }
                    self.table_refs()?;
                }
                _ => return Err(self.expected_or_bail("FROM")),
            }
        }
        if self.eat_keyword("USING") {
            self.table_refs()?;
        }
        self.clauses(Clause::From)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression_list(&mut self) -> Step {
        loop {
            self.expr()?;
            if !self.eat_punct(",") {
                return Ok(());
            }
        }
    }

    fn expr(&mut self) -> Step {
        let mut after_in = false;
        loop {
            self.operand(after_in)?;
            loop {
                match self.binary_operator()? {
                    Continuation::Operand { after_in: next } => {
                        after_in = next;
                        break;
                    }
                    Continuation::Postfix => {}
                    Continuation::Done => return Ok(()),
                }
            }
        }
    }

    fn eat_prefix(&mut self) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        let prefix = match token.kind {
            TokenKind::Operator => matches!(token.text, "-" | "+" | "~" | "!"),
            TokenKind::Word => {
                token.is_keyword("NOT")
                    || (self.dialect == Dialect::Mysql && token.is_keyword("BINARY"))
            }
            _ => false,
        };
        if prefix {
            self.pos += 1;
        }
        prefix
    }

    fn operand(&mut self, after_in: bool) -> Step {
        while self.eat_prefix() {}
        let Some(token) = self.peek() else {
            return Err(self.expected("an expression"));
        };
        match token.kind {
            TokenKind::Number
            | TokenKind::String
            | TokenKind::Variable
            | TokenKind::PositionalPlaceholder
            | TokenKind::NumberedPlaceholder
            | TokenKind::NamedPlaceholder => self.pos += 1,
            TokenKind::Word if token.is_any_keyword(NEVER_OPERAND) => {
                return Err(self.expected("an expression"));
            }
            TokenKind::Word if token.is_keyword("CASE") => self.case_expr()?,
            TokenKind::Word if token.is_keyword("INTERVAL") && self.interval_follows() => {
                self.interval()?;
            }
            TokenKind::Word
                if token.is_keyword("EXISTS")
                    && self.peek_nth(1).is_some_and(|t| t.is_punct("(")) =>
            {
                self.pos += 1;
                self.paren_operand(false)?;
            }
            TokenKind::Word | TokenKind::QuotedIdent => self.name_operand()?,
            TokenKind::Punct if token.text == "(" => self.paren_operand(after_in)?,
            TokenKind::Punct if token.text == "," => return Err(self.expected("an expression")),
            TokenKind::Operator if token.text == "*" => self.pos += 1,
            TokenKind::Operator
                if self.dialect != Dialect::Postgres && COMPARISON.contains(&token.text) =>
            {
                return Err(self.expected("an expression"));
            }
            _ => return Err(Stop::Bail),
        }
        self.postfix()
    }

    fn name_operand(&mut self) -> Step {
        self.qualified_name()?;
        match self.peek() {
            Some(t) if t.is_punct("(") => {
                self.call_arguments()?;
                self.window_suffix()?;
            }
            // DATE '2024-01-01', _utf8mb4'x', N'x'
            Some(t) if t.kind == TokenKind::String => self.pos += 1,
            _ => {}
        }
        Ok(())
    }

    fn call_arguments(&mut self) -> Step {
        let unchecked = self
            .peek_nth(1)
            .map_or(true, |t| t.is_punct(")") || t.is_any_keyword(NEVER_OPERAND));
        if unchecked {
            self.skip_group()
        } else {
            self.nested(Checker::expression_list)
        }
    }

    fn window_suffix(&mut self) -> Step {
        if self.peek_keyword("WITHIN") && self.peek_nth(1).is_some_and(|t| t.is_keyword("GROUP")) {
            self.pos += 2;
            if !self.peek_punct("(") {
                return Err(Stop::Bail);
            }
            self.skip_group()?;
        }
        if self.eat_keyword("FILTER") {
            if !self.peek_punct("(") {
                return Err(Stop::Bail);
            }
            self.skip_group()?;
        }
        if self.eat_keyword("OVER") {
            match self.peek() {
                Some(t) if t.is_punct("(") => self.skip_group()?,
                Some(t) if t.is_name() => self.pos += 1,
                _ => return Err(Stop::Bail),
            }
        }
        Ok(())
    }

    fn paren_operand(&mut self, after_in: bool) -> Step {
        match self.peek_nth(1) {
            Some(t) if t.is_punct(")") => {
                if after_in && self.dialect != Dialect::Sqlite {
                    self.pos += 1;
                    return Err(self.expected("an expression"));
                }
                self.skip_group()
            }
            Some(t) if t.is_any_keyword(&["SELECT", "WITH"]) => self.nested(Checker::query),
            _ => self.nested(Checker::expression_list),
        }
    }

    fn postfix(&mut self) -> Step {
        loop {
            match self.peek() {
                Some(t) if t.is_operator("::") => {
                    self.pos += 1;
                    match self.peek() {
                        Some(t) if t.is_name() => self.qualified_name()?,
                        _ => return Err(Stop::Bail),
                    }
                    if self.peek_punct("(") {
                        self.skip_group()?;
                    }
                }
                Some(t) if t.is_punct("[") => self.skip_brackets()?,
                _ => return Ok(()),
            }
        }
    }

    fn is_binary_keyword(&self, token: &Token<'_>) -> bool {
        if token.is_any_keyword(&["AND", "OR", "LIKE", "IN", "BETWEEN", "ESCAPE", "COLLATE"]) {
            return true;
        }
        match self.dialect {
            Dialect::Mysql => token.is_any_keyword(&["XOR", "DIV", "MOD", "RLIKE", "REGEXP"]),
            Dialect::Postgres => token.is_keyword("ILIKE"),
            Dialect::Sqlite => token.is_any_keyword(&["GLOB", "MATCH", "REGEXP"]),
            Dialect::Standard => false,
        }
    }

    fn is_negatable(&self, token: &Token<'_>) -> bool {
        token.is_any_keyword(&["IN", "LIKE", "BETWEEN"])
            || match self.dialect {
                Dialect::Mysql => token.is_any_keyword(&["RLIKE", "REGEXP"]),
                Dialect::Postgres => token.is_any_keyword(&["ILIKE", "SIMILAR"]),
                Dialect::Sqlite => token.is_any_keyword(&["GLOB", "MATCH", "REGEXP"]),
                Dialect::Standard => false,
            }
    }

    /// Words in `pair` follow at the cursor.
    fn peek_pair(&self, pair: [&str; 2]) -> bool {
        self.peek_keyword(pair[0]) && self.peek_nth(1).is_some_and(|t| t.is_keyword(pair[1]))
    }

    fn binary_operator(&mut self) -> Step<Continuation> {
        let Some(token) = self.peek() else {
            return Ok(Continuation::Done);
        };
        let operand = Continuation::Operand { after_in: false };

        if token.kind == TokenKind::Operator {
            self.pos += 1;
            return Ok(operand);
        }
        if token.kind != TokenKind::Word {
            return Ok(Continuation::Done);
        }

        if token.is_keyword("IS") {
            self.pos += 1;
            self.eat_keyword("NOT");
            if self.eat_keyword("DISTINCT") && !self.eat_keyword("FROM") {
                return Err(Stop::Bail);
            }
            return Ok(operand);
        }
        if self.dialect != Dialect::Mysql && token.is_any_keyword(&["ISNULL", "NOTNULL"]) {
            self.pos += 1;
            return Ok(Continuation::Postfix);
        }
        if token.is_keyword("NOT") {
            return match self.peek_nth(1) {
                Some(next) if self.is_negatable(next) => {
                    self.pos += 2;
                    if next.is_keyword("SIMILAR") && !self.eat_keyword("TO") {
                        return Err(Stop::Bail);
                    }
                    Ok(Continuation::Operand {
                        after_in: next.is_keyword("IN"),
                    })
                }
                _ => Ok(Continuation::Done),
            };
        }
        let two_word = match self.dialect {
            Dialect::Postgres => self.peek_pair(["SIMILAR", "TO"]),
            Dialect::Mysql => self.peek_pair(["SOUNDS", "LIKE"]) || self.peek_pair(["MEMBER", "OF"]),
            Dialect::Standard | Dialect::Sqlite => false,
        };
        if two_word {
            self.pos += 2;
            return Ok(operand);
        }
        if self.is_binary_keyword(token) {
            self.pos += 1;
            return Ok(Continuation::Operand {
                after_in: token.is_keyword("IN"),
            });
        }
        Ok(Continuation::Done)
    }

    fn case_expr(&mut self) -> Step {
        self.pos += 1;
        if !self.peek_keyword("WHEN") && !self.peek_keyword("END") {
            self.expr()?;
        }
        let mut arms = 0;
        while self.eat_keyword("WHEN") {
            self.expr()?;
            if !self.eat_keyword("THEN") {
                return Err(self.expected_or_bail("THEN"));
            }
            self.expr()?;
            arms += 1;
        }
        if arms == 0 {
            return Err(if self.peek_keyword("END") {
                self.expected("WHEN")
            } else {
                self.expected_or_bail("WHEN")
            });
        }
        if self.eat_keyword("ELSE") {
            self.expr()?;
        }
        if self.eat_keyword("END") {
            Ok(())
        } else if self.at_stop() {
            Err(self.error_here("CASE expression is missing END".to_string()))
        } else {
            Err(Stop::Bail)
        }
    }

    /// `INTERVAL` starts an interval literal rather than naming a column.
    fn interval_follows(&self) -> bool {
        self.peek_nth(1).is_some_and(|t| match t.kind {
            TokenKind::String
            | TokenKind::Number
            | TokenKind::PositionalPlaceholder
            | TokenKind::NumberedPlaceholder
            | TokenKind::NamedPlaceholder
            | TokenKind::Variable => true,
            TokenKind::Punct => t.text == "(",
            TokenKind::Operator => t.text == "-" || t.text == "+",
            TokenKind::Word => !t.is_any_keyword(NEVER_OPERAND) && !t.is_any_keyword(NOT_ALIAS),
            _ => false,
        })
    }

    fn interval(&mut self) -> Step {
        self.pos += 1;
        self.operand(false)?;
        self.eat_any_keyword(INTERVAL_UNITS);
        Ok(())
    }
}
