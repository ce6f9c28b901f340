//! Candidate query enumeration.
//!
//! Every known query text is combined with every combination of known
//! parameter values. Placeholders are replaced by SQL literals so that the
//! syntax validator sees the query the database would see.

use std::collections::HashSet;

use tracing::debug;

use crate::config::{AnalyzerConfig, Dialect};
use crate::error::UnresolvableQuery;
use crate::placeholder::{scan, PlaceholderKind, PlaceholderToken};
use crate::resolver::ParameterBinding;
use crate::types::{Scalar, ValueDomain};

/// One concrete query string and the line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateQuery {
    pub text: String,
    pub line: usize,
}

/// Which bound value a placeholder takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKey<'p> {
    Index(usize),
    Name(&'p str),
}

/// One bound value and the placeholders that take it.
struct Slot<'p> {
    key: SlotKey<'p>,
    occurrences: Vec<&'p PlaceholderToken>,
    literals: Vec<String>,
}

/// Produces candidate queries, capped per call-site.
#[derive(Debug, Clone)]
pub struct Enumerator {
    dialect: Dialect,
    max_candidates: usize,
}

impl Enumerator {
    /// Creates an enumerator with the dialect and candidate cap of `config`.
    #[must_use]
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            dialect: config.dialect,
            max_candidates: config.max_candidates,
        }
    }

    /// Enumerates the candidate queries of a query domain.
    ///
    /// A domain without known values yields no candidates: the call-site is
    /// not statically checkable. Candidates keep first-seen order and never
    /// repeat.
    ///
    /// # Errors
    ///
    /// Returns `UnsimulatableType` if a bound value has no SQL literal form,
    /// and `TooDynamic` if a bound value is unresolvable.
    pub fn enumerate(
        &self,
        query: &ValueDomain,
        bindings: Option<&ParameterBinding>,
        line: usize,
    ) -> Result<Vec<CandidateQuery>, UnresolvableQuery> {
        let Some(texts) = query.values() else {
            debug!(line, "query text is not enumerable");
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for value in texts {
            let text = value.to_text();
            for candidate in self.candidates(&text, bindings, line)? {
                if out.len() == self.max_candidates {
                    debug!(line, max = self.max_candidates, "candidate queries truncated");
                    return Ok(out);
                }
                if seen.insert(candidate.text.clone()) {
                    out.push(candidate);
                }
            }
        }
        Ok(out)
    }

    /// Candidates of one query text, at most `max_candidates` of them.
    fn candidates(
        &self,
        text: &str,
        bindings: Option<&ParameterBinding>,
        line: usize,
    ) -> Result<Vec<CandidateQuery>, UnresolvableQuery> {
        let verbatim = || {
            vec![CandidateQuery {
                text: text.to_string(),
                line,
            }]
        };
        let Some(bindings) = bindings else {
            return Ok(verbatim());
        };
        let placeholders = match scan(text, self.dialect) {
            Ok(placeholders) => placeholders,
            Err(e) => {
                debug!(line, error = %e, "placeholders not substituted");
                return Ok(verbatim());
            }
        };

        let slots = self.slots(&placeholders, bindings)?;
        if slots.is_empty() {
            return Ok(verbatim());
        }

        // Mixed-radix counter; the last slot varies fastest.
        let mut digits = vec![0_usize; slots.len()];
        let mut out = Vec::new();
        loop {
            out.push(CandidateQuery {
                text: substitute(text, &slots, &digits),
                line,
            });
            if out.len() == self.max_candidates {
                break;
            }
            let mut i = slots.len();
            loop {
                if i == 0 {
                    return Ok(out);
                }
                i -= 1;
                digits[i] += 1;
                if digits[i] < slots[i].literals.len() {
                    break;
                }
                digits[i] = 0;
            }
        }
        Ok(out)
    }

    /// Groups the bound placeholders by the value they take, in order of
    /// first appearance. Unbound placeholders are left out.
    fn slots<'p>(
        &self,
        placeholders: &'p [PlaceholderToken],
        bindings: &ParameterBinding,
    ) -> Result<Vec<Slot<'p>>, UnresolvableQuery> {
        let mut slots: Vec<Slot<'p>> = Vec::new();
        let mut question_marks = 0;

        for placeholder in placeholders {
            let key = match &placeholder.kind {
                PlaceholderKind::Positional => {
                    question_marks += 1;
                    SlotKey::Index(question_marks - 1)
                }
                PlaceholderKind::Numbered(n) => SlotKey::Index(n - 1),
                PlaceholderKind::Named(name) => SlotKey::Name(name),
            };
            if let Some(slot) = slots.iter_mut().find(|s| s.key == key) {
                slot.occurrences.push(placeholder);
                continue;
            }
            let domain = match key {
                SlotKey::Index(i) => bindings.positional(i),
                SlotKey::Name(name) => bindings.named(name),
            };
            let Some(domain) = domain else {
                continue;
            };
            let literals = self.literals(domain)?;
            if literals.is_empty() {
                continue;
            }
            slots.push(Slot {
                key,
                occurrences: vec![placeholder],
                literals,
            });
        }
        Ok(slots)
    }

    fn literals(&self, domain: &ValueDomain) -> Result<Vec<String>, UnresolvableQuery> {
        let render = |v: &Scalar| v.to_sql_literal(self.dialect);
        match domain {
            ValueDomain::SingleValue(_) | ValueDomain::FiniteSet(_) => Ok(domain
                .values()
                .map(|values| values.iter().map(render).collect())
                .unwrap_or_default()),
            ValueDomain::TypedUnknown(tag) => tag
                .simulated_value()
                .map(|v| vec![render(&v)])
                .ok_or(UnresolvableQuery::UnsimulatableType(*tag)),
            ValueDomain::Unresolvable => Err(UnresolvableQuery::TooDynamic),
        }
    }
}

/// Replaces every bound placeholder with the literal picked by `digits`.
fn substitute(text: &str, slots: &[Slot<'_>], digits: &[usize]) -> String {
    let mut replacements: Vec<(&PlaceholderToken, &str)> = slots
        .iter()
        .zip(digits)
        .flat_map(|(slot, &digit)| {
            slot.occurrences
                .iter()
                .map(move |p| (*p, slot.literals[digit].as_str()))
        })
        .collect();
    replacements.sort_by_key(|(p, _)| p.position);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (placeholder, literal) in replacements {
        out.push_str(&text[cursor..placeholder.position]);
        out.push_str(literal);
        cursor = placeholder.position + placeholder.len;
    }
    out.push_str(&text[cursor..]);
    out
}
