//! Findings reported back to the host.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::UnresolvableQuery;

/// Identifier of syntax errors and placeholder mismatches.
pub const SYNTAX_ERROR_IDENTIFIER: &str = "dba.syntaxError";

/// Identifier of queries that cannot be resolved safely.
pub const UNRESOLVABLE_QUERY_IDENTIFIER: &str = "dba.unresolvableQuery";

/// One problem found at a call-site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A candidate query does not parse.
    SyntaxError { message: String, line: usize },
    /// The query looks checkable but could not be resolved.
    UnresolvableQuery {
        message: String,
        tip: String,
        line: usize,
    },
    /// Placeholders and bound values disagree.
    PlaceholderMismatch { message: String, line: usize },
}

impl Finding {
    /// Creates a syntax error finding.
    #[must_use]
    pub fn syntax_error(message: impl Into<String>, line: usize) -> Self {
        Finding::SyntaxError {
            message: message.into(),
            line,
        }
    }

    /// Creates a placeholder mismatch finding.
    #[must_use]
    pub fn placeholder_mismatch(message: impl Into<String>, line: usize) -> Self {
        Finding::PlaceholderMismatch {
            message: message.into(),
            line,
        }
    }

    /// Creates the finding for an unresolvable query.
    #[must_use]
    pub fn unresolvable(reason: &UnresolvableQuery, line: usize) -> Self {
        Finding::UnresolvableQuery {
            message: reason.as_rule_message(),
            tip: reason.tip().to_string(),
            line,
        }
    }

    /// Stable namespaced identifier.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Finding::SyntaxError { .. } | Finding::PlaceholderMismatch { .. } => {
                SYNTAX_ERROR_IDENTIFIER
            }
            Finding::UnresolvableQuery { .. } => UNRESOLVABLE_QUERY_IDENTIFIER,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Finding::SyntaxError { message, .. }
            | Finding::UnresolvableQuery { message, .. }
            | Finding::PlaceholderMismatch { message, .. } => message,
        }
    }

    /// Remediation hint, if any.
    #[must_use]
    pub fn tip(&self) -> Option<&str> {
        match self {
            Finding::UnresolvableQuery { tip, .. } => Some(tip),
            Finding::SyntaxError { .. } | Finding::PlaceholderMismatch { .. } => None,
        }
    }

    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Finding::SyntaxError { line, .. }
            | Finding::UnresolvableQuery { line, .. }
            | Finding::PlaceholderMismatch { line, .. } => *line,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line(), self.message(), self.identifier())
    }
}

/// Findings of one call-site, unique by message, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FindingSet {
    findings: Vec<Finding>,
    messages: HashSet<String>,
}

impl FindingSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `finding` unless one with the same message is present.
    /// Returns true if it was added.
    pub fn insert(&mut self, finding: Finding) -> bool {
        if self.messages.contains(finding.message()) {
            return false;
        }
        self.messages.insert(finding.message().to_string());
        self.findings.push(finding);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.findings.iter()
    }

    /// Returns the findings in insertion order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Finding> {
        self.findings
    }
}

impl Extend<Finding> for FindingSet {
    fn extend<I: IntoIterator<Item = Finding>>(&mut self, iter: I) {
        for finding in iter {
            self.insert(finding);
        }
    }
}

impl FromIterator<Finding> for FindingSet {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        let mut set = FindingSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for FindingSet {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.into_iter()
    }
}

impl<'a> IntoIterator for &'a FindingSet {
    type Item = &'a Finding;
    type IntoIter = std::slice::Iter<'a, Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.iter()
    }
}
