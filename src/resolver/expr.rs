//! Host expression capability interface.
//!
//! The resolver never sees a host AST. Hosts implement [`HostExpr`] for
//! their own expression nodes (bound to the scope they were found in), or
//! build an owned [`Expr`] tree.

use crate::types::{Scalar, TypeTag};

/// Structural view of an expression.
#[derive(Debug)]
pub enum ExprShape<'a, E: ?Sized> {
    /// String concatenation of two operands.
    Concat(&'a E, &'a E),
    /// Expression evaluating to one of two branches.
    Conditional(&'a E, &'a E),
    /// Anything else; answered through type reflection.
    Other,
}

/// Key of an array entry in a parameter bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    /// Integer key.
    Index(i64),
    /// String key.
    Name(String),
}

/// What the resolver needs to know about a host expression.
pub trait HostExpr {
    /// Structure of the expression.
    fn shape(&self) -> ExprShape<'_, Self> {
        ExprShape::Other
    }

    /// Returns true if the static type is a literal or a union of literals.
    fn is_literal_type(&self) -> bool;

    /// Members of the literal type, when `is_literal_type` holds.
    fn literal_values(&self) -> Vec<Scalar>;

    /// Static type at the expression's program point.
    fn static_type(&self) -> TypeTag;

    /// Entries of an array-shaped expression, in source order.
    fn array_entries(&self) -> Option<Vec<(ArrayKey, &Self)>> {
        None
    }

    /// Source line of the expression.
    fn line(&self) -> usize;
}

/// Owned expression tree implementing [`HostExpr`].
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    kind: ExprKind,
    line: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum ExprKind {
    Literal(Scalar),
    Concat(Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>),
    Typed {
        ty: TypeTag,
        literals: Option<Vec<Scalar>>,
    },
    Array(Vec<(ArrayKey, Expr)>),
}

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Self { kind, line: 1 }
    }

    /// A literal value.
    #[must_use]
    pub fn literal(value: impl Into<Scalar>) -> Self {
        Self::new(ExprKind::Literal(value.into()))
    }

    /// `left . right`
    #[must_use]
    pub fn concat(left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Concat(Box::new(left), Box::new(right)))
    }

    /// `cond ? then : otherwise`
    #[must_use]
    pub fn conditional(then: Expr, otherwise: Expr) -> Self {
        Self::new(ExprKind::Conditional(Box::new(then), Box::new(otherwise)))
    }

    /// A variable or call whose static type is a union of literals.
    #[must_use]
    pub fn literal_union<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        let literals: Vec<Scalar> = values.into_iter().map(Into::into).collect();
        let ty = literals
            .iter()
            .map(Scalar::type_tag)
            .reduce(TypeTag::join)
            .unwrap_or(TypeTag::Mixed);
        Self::new(ExprKind::Typed {
            ty,
            literals: Some(literals),
        })
    }

    /// A variable or call of which only the type is known.
    #[must_use]
    pub fn typed(ty: TypeTag) -> Self {
        Self::new(ExprKind::Typed { ty, literals: None })
    }

    /// A value nothing is known about.
    #[must_use]
    pub fn opaque() -> Self {
        Self::typed(TypeTag::Mixed)
    }

    /// A list: integer keys in order.
    #[must_use]
    pub fn list(items: Vec<Expr>) -> Self {
        let entries = (0_i64..).zip(items).map(|(i, e)| (ArrayKey::Index(i), e)).collect();
        Self::new(ExprKind::Array(entries))
    }

    /// A map with string keys.
    #[must_use]
    pub fn map<K: Into<String>>(items: Vec<(K, Expr)>) -> Self {
        let entries = items
            .into_iter()
            .map(|(k, e)| (ArrayKey::Name(k.into()), e))
            .collect();
        Self::new(ExprKind::Array(entries))
    }

    /// An array with explicit keys.
    #[must_use]
    pub fn array(entries: Vec<(ArrayKey, Expr)>) -> Self {
        Self::new(ExprKind::Array(entries))
    }

    /// Sets the source line.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

impl HostExpr for Expr {
    fn shape(&self) -> ExprShape<'_, Self> {
        match &self.kind {
            ExprKind::Concat(l, r) => ExprShape::Concat(l, r),
            ExprKind::Conditional(a, b) => ExprShape::Conditional(a, b),
            _ => ExprShape::Other,
        }
    }

    fn is_literal_type(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) => true,
            ExprKind::Typed { literals, .. } => literals.is_some(),
            _ => false,
        }
    }

    fn literal_values(&self) -> Vec<Scalar> {
        match &self.kind {
            ExprKind::Literal(v) => vec![v.clone()],
            ExprKind::Typed {
                literals: Some(values),
                ..
            } => values.clone(),
            _ => Vec::new(),
        }
    }

    fn static_type(&self) -> TypeTag {
        match &self.kind {
            ExprKind::Literal(v) => v.type_tag(),
            ExprKind::Concat(..) => TypeTag::String,
            ExprKind::Conditional(a, b) => a.static_type().join(b.static_type()),
            ExprKind::Typed { ty, .. } => *ty,
            ExprKind::Array(_) => TypeTag::Array,
        }
    }

    fn array_entries(&self) -> Option<Vec<(ArrayKey, &Self)>> {
        match &self.kind {
            ExprKind::Array(entries) => Some(entries.iter().map(|(k, e)| (k.clone(), e)).collect()),
            _ => None,
        }
    }

    fn line(&self) -> usize {
        self.line
    }
}
