//! Value-domain resolution of host expressions.
//!
//! The resolver turns an expression into a [`ValueDomain`]:
//! - literals become `SingleValue`
//! - concatenations combine both sides (cartesian product, capped)
//! - conditionals union their branches
//! - literal-typed variables enumerate their literal members
//! - everything else keeps only its type, or is `Unresolvable`
//!
//! Resolution is pure and never fails; unknown input is an ordinary domain.

mod expr;

use std::collections::HashSet;

use tracing::trace;

use crate::config::AnalyzerConfig;
use crate::types::{Scalar, TypeTag, ValueDomain};

pub use expr::{ArrayKey, Expr, ExprShape, HostExpr};

/// Resolved values bound to the placeholders of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterBinding {
    /// Values in call-site order.
    Positional(Vec<ValueDomain>),
    /// Values by placeholder name (without the leading sigil); keys unique.
    Named(Vec<(String, ValueDomain)>),
}

impl ParameterBinding {
    /// Number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ParameterBinding::Positional(values) => values.len(),
            ParameterBinding::Named(values) => values.len(),
        }
    }

    /// Returns true if no values are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at a zero-based position of a positional binding.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&ValueDomain> {
        match self {
            ParameterBinding::Positional(values) => values.get(index),
            ParameterBinding::Named(_) => None,
        }
    }

    /// Value bound to `name` in a named binding.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&ValueDomain> {
        match self {
            ParameterBinding::Positional(_) => None,
            ParameterBinding::Named(values) => {
                values.iter().find(|(key, _)| key == name).map(|(_, v)| v)
            }
        }
    }
}

/// Strips a leading `:`, `@` or `$` from a placeholder or binding name.
#[must_use]
pub fn normalize_name(name: &str) -> &str {
    name.strip_prefix([':', '@', '$']).unwrap_or(name)
}

/// Resolves host expressions into value domains.
#[derive(Debug, Clone)]
pub struct Resolver {
    max_domain_values: usize,
    simulate: bool,
}

impl Resolver {
    /// Creates a resolver using the ceilings of `config`.
    #[must_use]
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            max_domain_values: config.max_domain_values,
            simulate: config.simulate_typed_values,
        }
    }

    /// Resolves the value domain of `expr`.
    pub fn resolve<E: HostExpr + ?Sized>(&self, expr: &E) -> ValueDomain {
        match expr.shape() {
            ExprShape::Concat(left, right) => {
                let left = self.resolve(left);
                let right = self.resolve(right);
                left.concat(&right, self.max_domain_values, self.simulate)
            }
            ExprShape::Conditional(then, otherwise) => {
                let then = self.resolve(then);
                let otherwise = self.resolve(otherwise);
                then.union(&otherwise, self.max_domain_values)
            }
            ExprShape::Other if expr.is_literal_type() => {
                ValueDomain::from_values(expr.literal_values(), self.max_domain_values)
            }
            ExprShape::Other => match expr.static_type() {
                TypeTag::Bool => ValueDomain::FiniteSet(vec![Scalar::Bool(true), Scalar::Bool(false)]),
                TypeTag::Null => ValueDomain::SingleValue(Scalar::Null),
                TypeTag::Mixed => ValueDomain::Unresolvable,
                tag => ValueDomain::TypedUnknown(tag),
            },
        }
    }

    /// Returns true if the query text of `expr` can be enumerated.
    pub fn is_resolvable<E: HostExpr + ?Sized>(&self, expr: &E) -> bool {
        self.resolve(expr).is_enumerable()
    }

    /// Resolves a parameter bundle into a binding.
    ///
    /// Returns `None` when there is nothing to check against: the bundle is
    /// not an array, mixes integer and string keys, or holds a value that
    /// resolves to `Unresolvable`.
    pub fn resolve_parameters<E: HostExpr + ?Sized>(&self, expr: &E) -> Option<ParameterBinding> {
        let Some(entries) = expr.array_entries() else {
            trace!(line = expr.line(), "parameter bundle is not array-shaped");
            return None;
        };

        let all_indexed = entries.iter().all(|(k, _)| matches!(k, ArrayKey::Index(_)));
        let all_named = entries.iter().all(|(k, _)| matches!(k, ArrayKey::Name(_)));

        let binding = if all_indexed {
            let values = entries
                .iter()
                .map(|(_, value)| self.resolve_parameter(*value))
                .collect::<Option<Vec<_>>>();
            values.map(ParameterBinding::Positional)
        } else if all_named {
            let mut seen = HashSet::new();
            let mut values = Vec::with_capacity(entries.len());
            for (key, value) in &entries {
                let ArrayKey::Name(key) = key else { continue };
                let name = normalize_name(key);
                let domain = self.resolve_parameter(*value);
                if seen.insert(name.to_string()) {
                    values.push((name.to_string(), domain));
                }
            }
            values
                .into_iter()
                .map(|(name, domain)| domain.map(|d| (name, d)))
                .collect::<Option<Vec<_>>>()
                .map(ParameterBinding::Named)
        } else {
            trace!(line = expr.line(), "parameter bundle mixes integer and string keys");
            return None;
        };

        if binding.is_none() {
            trace!(line = expr.line(), "parameter bundle holds an unresolvable value");
        }
        binding
    }

    fn resolve_parameter<E: HostExpr + ?Sized>(&self, expr: &E) -> Option<ValueDomain> {
        match self.resolve(expr) {
            ValueDomain::Unresolvable => None,
            domain => Some(domain),
        }
    }
}
