//! Scalar and `TypeTag` definitions for dbalint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Dialect;

/// Static type of a host expression, as far as the host can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeTag {
    /// Integer.
    Int,
    /// Floating point number.
    Float,
    /// Boolean.
    Bool,
    /// The null value.
    Null,
    /// Any string.
    String,
    /// A string that parses as a number.
    NumericString,
    /// A string that is known not to be empty.
    NonEmptyString,
    /// Array or map.
    Array,
    /// Object instance.
    Object,
    /// Nothing is known.
    Mixed,
}

impl TypeTag {
    /// Returns the name of the type tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Null => "null",
            TypeTag::String => "string",
            TypeTag::NumericString => "numeric-string",
            TypeTag::NonEmptyString => "non-empty-string",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Mixed => "mixed",
        }
    }

    /// Returns whether this type is numeric (including numeric strings).
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::Float | TypeTag::NumericString)
    }

    /// Returns whether this type is one of the string types.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            TypeTag::String | TypeTag::NumericString | TypeTag::NonEmptyString
        )
    }

    /// Value used in place of an unknown value of this type when a query is
    /// simulated. Returns None for types without a scalar representation.
    #[must_use]
    pub fn simulated_value(&self) -> Option<Scalar> {
        match self {
            TypeTag::Int => Some(Scalar::Int(1)),
            TypeTag::Float => Some(Scalar::Float(1.0)),
            TypeTag::Bool => Some(Scalar::Bool(true)),
            TypeTag::Null => Some(Scalar::Null),
            TypeTag::String | TypeTag::NumericString | TypeTag::NonEmptyString => {
                Some(Scalar::String("1".into()))
            }
            TypeTag::Array | TypeTag::Object | TypeTag::Mixed => None,
        }
    }

    /// Least upper bound of two tags.
    #[must_use]
    pub fn join(self, other: TypeTag) -> TypeTag {
        if self == other {
            return self;
        }
        match (self, other) {
            (TypeTag::Int, TypeTag::Float) | (TypeTag::Float, TypeTag::Int) => TypeTag::Float,
            (a, b) if a.is_string() && b.is_string() => {
                if a == TypeTag::String || b == TypeTag::String {
                    TypeTag::String
                } else {
                    TypeTag::NonEmptyString
                }
            }
            _ => TypeTag::Mixed,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A statically known scalar value.
///
/// Floats compare and hash by bit pattern, so `NaN` equals itself and `0.0`
/// differs from `-0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
}

// Manual Hash implementation because f64 doesn't implement Hash
impl std::hash::Hash for Scalar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Bool(v) => v.hash(state),
            Scalar::Int(v) => v.hash(state),
            Scalar::Float(v) => v.to_bits().hash(state),
            Scalar::String(v) => v.hash(state),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::String(a), Scalar::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Scalar {
    /// Returns the most precise type tag describing this value.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Scalar::Null => TypeTag::Null,
            Scalar::Bool(_) => TypeTag::Bool,
            Scalar::Int(_) => TypeTag::Int,
            Scalar::Float(_) => TypeTag::Float,
            Scalar::String(s) if is_numeric_text(s) => TypeTag::NumericString,
            Scalar::String(s) if !s.is_empty() => TypeTag::NonEmptyString,
            Scalar::String(_) => TypeTag::String,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Converts the value to text the way string concatenation does.
    ///
    /// `true` becomes `"1"`; `false` and null become the empty string.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Null | Scalar::Bool(false) => String::new(),
            Scalar::Bool(true) => "1".into(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }

    /// Renders the value as a SQL literal for the given dialect.
    #[must_use]
    pub fn to_sql_literal(&self, dialect: Dialect) -> String {
        match self {
            Scalar::Null => "NULL".into(),
            Scalar::Bool(b) => (if *b { "1" } else { "0" }).into(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) if f.is_finite() => f.to_string(),
            Scalar::Float(f) => quote_string(&f.to_string(), dialect),
            Scalar::String(s) => quote_string(s, dialect),
        }
    }

    /// Returns true if the value can stand where SQL requires an integer.
    #[must_use]
    pub fn is_integer_like(&self) -> bool {
        match self {
            Scalar::Null | Scalar::Bool(_) | Scalar::Int(_) => true,
            Scalar::Float(f) => f.fract() == 0.0,
            Scalar::String(s) => {
                let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

fn quote_string(s: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' if dialect == Dialect::Mysql => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Returns true for decimal number text: sign, digits, fraction, exponent.
fn is_numeric_text(s: &str) -> bool {
    let s = s.trim_start();
    let s = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }
    if !all_digits(int_part) || !all_digits(frac_part) {
        return false;
    }
    match exponent {
        None => true,
        Some(e) => {
            let e = e.strip_prefix(['-', '+']).unwrap_or(e);
            !e.is_empty() && all_digits(e)
        }
    }
}
