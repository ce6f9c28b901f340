//! Analyzer configuration and the call-site allow-list.

use serde::{Deserialize, Serialize};

use crate::error::{DbaError, Result};

/// Default ceiling on the number of distinct values a domain may hold.
pub const DEFAULT_MAX_DOMAIN_VALUES: usize = 256;

/// Default ceiling on the number of candidate queries per call-site.
pub const DEFAULT_MAX_CANDIDATES: usize = 256;

/// SQL dialect used for lexing, placeholder conventions and literal quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// ANSI quoting, `?` and `:name` placeholders.
    #[default]
    Standard,
    /// Backticks, backslash escapes, `#` comments, `@` user variables.
    Mysql,
    /// Dollar quoting, `E''` strings, `$n` placeholders.
    Postgres,
    /// `[...]` identifiers, `?NNN`, `@name` and `$name` placeholders.
    Sqlite,
}

/// Configuration for the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Dialect of the checked queries.
    pub dialect: Dialect,
    /// Maximum number of distinct values kept in a finite domain.
    pub max_domain_values: usize,
    /// Maximum number of candidate queries validated per call-site.
    pub max_candidates: usize,
    /// Substitute `1` for unknown numeric pieces of query text.
    pub simulate_typed_values: bool,
    /// Query-executing methods, as `Type::method` strings.
    pub class_methods: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_domain_values: DEFAULT_MAX_DOMAIN_VALUES,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            simulate_typed_values: true,
            class_methods: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the finite domain ceiling.
    #[must_use]
    pub fn with_max_domain_values(mut self, max_domain_values: usize) -> Self {
        self.max_domain_values = max_domain_values;
        self
    }

    /// Sets the candidate query ceiling.
    #[must_use]
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    /// Enables or disables simulation of unknown numeric values.
    #[must_use]
    pub fn with_simulation(mut self, simulate: bool) -> Self {
        self.simulate_typed_values = simulate;
        self
    }

    /// Adds a `Type::method` entry to the allow-list.
    #[must_use]
    pub fn with_class_method(mut self, class_method: impl Into<String>) -> Self {
        self.class_methods.push(class_method.into());
        self
    }

    /// Checks the configuration and parses the allow-list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for zero ceilings and `InvalidClassMethod`
    /// for a malformed allow-list entry.
    pub fn validate(&self) -> Result<MethodAllowList> {
        if self.max_domain_values == 0 {
            return Err(DbaError::InvalidConfig(
                "max_domain_values must be greater than zero".into(),
            ));
        }
        if self.max_candidates == 0 {
            return Err(DbaError::InvalidConfig(
                "max_candidates must be greater than zero".into(),
            ));
        }
        MethodAllowList::parse(&self.class_methods)
    }
}

/// One `Type::method` allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassMethod {
    /// Fully qualified type name, without a leading separator.
    pub class: String,
    /// Method name.
    pub method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Default,
    InIdentifier,
}

#[derive(Debug, PartialEq, Eq)]
enum Piece<'a> {
    Ident(&'a str),
    Separator,
    DoubleColon,
}

impl ClassMethod {
    /// Parses `Namespace\Type::method`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClassMethod` if the entry does not have that shape.
    pub fn parse(entry: &str) -> Result<Self> {
        let invalid = || DbaError::InvalidClassMethod(entry.to_string());
        let pieces = scan_pieces(entry).ok_or_else(invalid)?;

        let mut iter = pieces.iter().peekable();
        if iter.peek() == Some(&&Piece::Separator) {
            iter.next();
        }

        let mut class_parts = Vec::new();
        loop {
            match iter.next() {
                Some(Piece::Ident(name)) => class_parts.push(*name),
                _ => return Err(invalid()),
            }
            match iter.next() {
                Some(Piece::Separator) => {}
                Some(Piece::DoubleColon) => break,
                _ => return Err(invalid()),
            }
        }

        let method = match (iter.next(), iter.next()) {
            (Some(Piece::Ident(method)), None) => *method,
            _ => return Err(invalid()),
        };

        Ok(Self {
            class: class_parts.join("\\"),
            method: method.to_string(),
        })
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn scan_pieces(entry: &str) -> Option<Vec<Piece<'_>>> {
    let chars: Vec<(usize, char)> = entry.char_indices().collect();
    let mut pieces = Vec::new();
    let mut state = ScanState::Default;
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (idx, c) = chars[i];
        match state {
            ScanState::Default => {
                if is_ident_start(c) {
                    state = ScanState::InIdentifier;
                    start = idx;
                } else if c == '\\' {
                    pieces.push(Piece::Separator);
                } else if c == ':' && chars.get(i + 1).map(|&(_, n)| n) == Some(':') {
                    pieces.push(Piece::DoubleColon);
                    i += 1;
                } else {
                    return None;
                }
                i += 1;
            }
            ScanState::InIdentifier => {
                if is_ident_char(c) {
                    i += 1;
                } else {
                    pieces.push(Piece::Ident(&entry[start..idx]));
                    state = ScanState::Default;
                }
            }
        }
    }
    if state == ScanState::InIdentifier {
        pieces.push(Piece::Ident(&entry[start..]));
    }
    Some(pieces)
}

/// Parsed allow-list of query-executing methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodAllowList {
    entries: Vec<ClassMethod>,
}

impl MethodAllowList {
    /// Parses every entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClassMethod` for the first malformed entry.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let entries = entries
            .iter()
            .map(|entry| ClassMethod::parse(entry.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Returns the parsed entries.
    #[must_use]
    pub fn entries(&self) -> &[ClassMethod] {
        &self.entries
    }

    /// Returns true if no entries are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a call of `method` declared on `declaring_class` is
    /// listed, directly or through a listed ancestor.
    ///
    /// `is_subclass_of(ancestor)` is answered by the host.
    pub fn matches<F>(&self, declaring_class: &str, method: &str, is_subclass_of: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        let declaring_class = declaring_class.trim_start_matches('\\');
        self.entries.iter().any(|entry| {
            entry.method == method
                && (entry.class == declaring_class || is_subclass_of(&entry.class))
        })
    }
}
