//! dbalint - static validation of dynamically assembled SQL
//!
//! The host program locates query-executing call-sites and describes their
//! arguments through [`HostExpr`]. For every call-site the analyzer:
//!
//! 1. resolves the query text into a [`ValueDomain`]
//! 2. enumerates the concrete candidate queries, substituting known values
//! 3. reports syntax errors of each candidate
//! 4. checks placeholders against the bound values
//!
//! Anything that cannot be resolved is skipped rather than reported.
//!
//! ```
//! use dbalint::{Analyzer, AnalyzerConfig, CallSite, Expr};
//!
//! let analyzer = Analyzer::new(AnalyzerConfig::default())?;
//! let args = [
//!     Expr::literal("SELECT * FROM users WHERE id = ? AND name = ?"),
//!     Expr::list(vec![Expr::literal(42)]),
//! ];
//! let findings = analyzer.analyze(&CallSite::new(&args, 12, 0).with_params_arg(1));
//! assert_eq!(
//!     findings[0].message(),
//!     "Query expects 2 placeholders, but 1 value is given."
//! );
//! # Ok::<(), dbalint::DbaError>(())
//! ```

pub mod analyzer;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod finding;
pub mod parser;
pub mod placeholder;
pub mod resolver;
pub mod types;

pub use analyzer::{Analyzer, CallSite};
pub use config::{AnalyzerConfig, ClassMethod, Dialect, MethodAllowList};
pub use enumerator::{CandidateQuery, Enumerator};
pub use error::{DbaError, Result, UnresolvableQuery};
pub use finding::{Finding, FindingSet};
pub use parser::SyntaxValidator;
pub use placeholder::{PlaceholderKind, PlaceholderToken, PlaceholderValidator};
pub use resolver::{ArrayKey, Expr, ExprShape, HostExpr, ParameterBinding, Resolver};
pub use types::{Scalar, TypeTag, ValueDomain};
