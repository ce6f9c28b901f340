//! Value domains: what an expression may evaluate to at runtime.

use std::collections::HashSet;

use super::value::{Scalar, TypeTag};

/// Statically known set of values for an expression.
///
/// `FiniteSet` always holds at least two distinct values and never more
/// than the configured ceiling; constructors degrade larger sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDomain {
    /// Nothing usable is known.
    Unresolvable,
    /// Exactly one value.
    SingleValue(Scalar),
    /// One of several values, in first-seen order.
    FiniteSet(Vec<Scalar>),
    /// Only the type is known.
    TypedUnknown(TypeTag),
}

impl ValueDomain {
    /// Builds a domain from candidate values, removing duplicates.
    ///
    /// More than `cap` distinct values degrade to `TypedUnknown` of their
    /// common type, or `Unresolvable` if they have none.
    #[must_use]
    pub fn from_values(values: Vec<Scalar>, cap: usize) -> Self {
        let mut seen = HashSet::with_capacity(values.len());
        let mut distinct: Vec<Scalar> = Vec::with_capacity(values.len());
        for value in values {
            if seen.insert(value.clone()) {
                distinct.push(value);
            }
        }

        match distinct.len() {
            0 => ValueDomain::Unresolvable,
            1 => distinct
                .pop()
                .map_or(ValueDomain::Unresolvable, ValueDomain::SingleValue),
            n if n > cap => Self::typed_or_unresolvable(common_tag(&distinct)),
            _ => ValueDomain::FiniteSet(distinct),
        }
    }

    fn typed_or_unresolvable(tag: Option<TypeTag>) -> Self {
        match tag {
            Some(TypeTag::Mixed) | None => ValueDomain::Unresolvable,
            Some(tag) => ValueDomain::TypedUnknown(tag),
        }
    }

    /// Returns true unless the domain is `Unresolvable`.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        !matches!(self, ValueDomain::Unresolvable)
    }

    /// Returns true if the concrete values are known.
    #[must_use]
    pub fn is_enumerable(&self) -> bool {
        matches!(self, ValueDomain::SingleValue(_) | ValueDomain::FiniteSet(_))
    }

    /// Returns the known values, in order.
    #[must_use]
    pub fn values(&self) -> Option<&[Scalar]> {
        match self {
            ValueDomain::SingleValue(v) => Some(std::slice::from_ref(v)),
            ValueDomain::FiniteSet(values) => Some(values),
            ValueDomain::Unresolvable | ValueDomain::TypedUnknown(_) => None,
        }
    }

    /// Number of known values (0 when not enumerable).
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.values().map_or(0, <[Scalar]>::len)
    }

    /// Common type of every value in the domain.
    #[must_use]
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            ValueDomain::Unresolvable => None,
            ValueDomain::SingleValue(v) => Some(v.type_tag()),
            ValueDomain::FiniteSet(values) => common_tag(values),
            ValueDomain::TypedUnknown(tag) => Some(*tag),
        }
    }

    /// Domain of an expression that evaluates to either `self` or `other`.
    #[must_use]
    pub fn union(&self, other: &ValueDomain, cap: usize) -> ValueDomain {
        match (self, other) {
            (ValueDomain::Unresolvable, _) | (_, ValueDomain::Unresolvable) => {
                ValueDomain::Unresolvable
            }
            (a, b) if a.is_enumerable() && b.is_enumerable() => {
                let mut values = a.values().unwrap_or_default().to_vec();
                values.extend_from_slice(b.values().unwrap_or_default());
                ValueDomain::from_values(values, cap)
            }
            (a, b) => {
                let tag = a.type_tag().zip(b.type_tag()).map(|(x, y)| x.join(y));
                Self::typed_or_unresolvable(tag)
            }
        }
    }

    /// Domain of the string concatenation `self . other`.
    ///
    /// With `simulate` set, unknown numeric pieces contribute the text `1`.
    #[must_use]
    pub fn concat(&self, other: &ValueDomain, cap: usize, simulate: bool) -> ValueDomain {
        if !self.is_resolvable() || !other.is_resolvable() {
            return ValueDomain::Unresolvable;
        }

        let (Some(left), Some(right)) = (self.texts(simulate), other.texts(simulate)) else {
            return ValueDomain::TypedUnknown(TypeTag::String);
        };

        if left.len().saturating_mul(right.len()) > cap {
            return ValueDomain::TypedUnknown(TypeTag::String);
        }

        let mut values = Vec::with_capacity(left.len() * right.len());
        for l in &left {
            for r in &right {
                values.push(Scalar::String(format!("{l}{r}")));
            }
        }
        ValueDomain::from_values(values, cap)
    }

    fn texts(&self, simulate: bool) -> Option<Vec<String>> {
        match self {
            ValueDomain::SingleValue(_) | ValueDomain::FiniteSet(_) => self
                .values()
                .map(|values| values.iter().map(Scalar::to_text).collect()),
            ValueDomain::TypedUnknown(tag) if simulate && tag.is_numeric() => {
                Some(vec!["1".to_string()])
            }
            _ => None,
        }
    }

    /// The first known value that cannot stand where SQL needs an integer.
    #[must_use]
    pub fn first_non_integer(&self) -> Option<&Scalar> {
        self.values()?.iter().find(|v| !v.is_integer_like())
    }
}

fn common_tag(values: &[Scalar]) -> Option<TypeTag> {
    values
        .iter()
        .map(Scalar::type_tag)
        .reduce(TypeTag::join)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<Scalar> {
        values.iter().map(|v| Scalar::from(*v)).collect()
    }

    #[test]
    fn test_from_values_dedupes_in_order() {
        let domain = ValueDomain::from_values(strings(&["b", "a", "b"]), 10);
        assert_eq!(domain, ValueDomain::FiniteSet(strings(&["b", "a"])));
    }

    #[test]
    fn test_from_values_single_and_empty() {
        assert_eq!(
            ValueDomain::from_values(strings(&["x", "x"]), 10),
            ValueDomain::SingleValue(Scalar::from("x"))
        );
        assert_eq!(ValueDomain::from_values(vec![], 10), ValueDomain::Unresolvable);
    }

    #[test]
    fn test_from_values_over_cap_keeps_type() {
        let values = (0..20).map(Scalar::Int).collect();
        assert_eq!(
            ValueDomain::from_values(values, 5),
            ValueDomain::TypedUnknown(TypeTag::Int)
        );

        let mixed = vec![Scalar::Int(1), Scalar::from("a"), Scalar::Bool(true)];
        assert_eq!(ValueDomain::from_values(mixed, 2), ValueDomain::Unresolvable);
    }

    #[test]
    fn test_concat_cartesian_product() {
        let left = ValueDomain::FiniteSet(strings(&["SELECT a ", "SELECT b "]));
        let right = ValueDomain::FiniteSet(strings(&["FROM t", "FROM u"]));
        let result = left.concat(&right, 100, true);
        assert_eq!(
            result,
            ValueDomain::FiniteSet(strings(&[
                "SELECT a FROM t",
                "SELECT a FROM u",
                "SELECT b FROM t",
                "SELECT b FROM u",
            ]))
        );
    }

    #[test]
    fn test_concat_over_cap() {
        let left = ValueDomain::FiniteSet(strings(&["a", "b", "c"]));
        let right = ValueDomain::FiniteSet(strings(&["x", "y", "z"]));
        assert_eq!(
            left.concat(&right, 8, true),
            ValueDomain::TypedUnknown(TypeTag::String)
        );
    }

    #[test]
    fn test_concat_simulates_numeric_pieces() {
        let left = ValueDomain::SingleValue(Scalar::from("SELECT * FROM t WHERE id = "));
        let right = ValueDomain::TypedUnknown(TypeTag::Int);
        assert_eq!(
            left.concat(&right, 10, true),
            ValueDomain::SingleValue(Scalar::from("SELECT * FROM t WHERE id = 1"))
        );
        assert_eq!(
            left.concat(&right, 10, false),
            ValueDomain::TypedUnknown(TypeTag::String)
        );

        let text = ValueDomain::TypedUnknown(TypeTag::String);
        assert_eq!(
            left.concat(&text, 10, true),
            ValueDomain::TypedUnknown(TypeTag::String)
        );
        assert_eq!(
            left.concat(&ValueDomain::Unresolvable, 10, true),
            ValueDomain::Unresolvable
        );
    }

    #[test]
    fn test_union() {
        let a = ValueDomain::SingleValue(Scalar::from("a"));
        let b = ValueDomain::FiniteSet(strings(&["b", "a"]));
        assert_eq!(a.union(&b, 10), ValueDomain::FiniteSet(strings(&["a", "b"])));

        let typed = ValueDomain::TypedUnknown(TypeTag::Int);
        let float = ValueDomain::SingleValue(Scalar::Float(1.5));
        assert_eq!(typed.union(&float, 10), ValueDomain::TypedUnknown(TypeTag::Float));
        assert_eq!(
            typed.union(&ValueDomain::SingleValue(Scalar::from("x")), 10),
            ValueDomain::Unresolvable
        );
    }

    #[test]
    fn test_from_values_dedups_nan() {
        let domain = ValueDomain::from_values(vec![Scalar::Float(f64::NAN), Scalar::Float(f64::NAN)], 8);
        assert!(matches!(domain, ValueDomain::SingleValue(Scalar::Float(v)) if v.is_nan()));
    }

    #[test]
    fn test_first_non_integer() {
        let domain = ValueDomain::FiniteSet(vec![Scalar::Int(1), Scalar::from("ten")]);
        assert_eq!(domain.first_non_integer(), Some(&Scalar::from("ten")));
        assert_eq!(ValueDomain::TypedUnknown(TypeTag::String).first_non_integer(), None);
    }
}
