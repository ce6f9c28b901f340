//! Call-site analysis: resolution, enumeration and validation combined.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::{AnalyzerConfig, MethodAllowList};
use crate::enumerator::Enumerator;
use crate::error::{Result, UnresolvableQuery};
use crate::finding::{Finding, FindingSet};
use crate::parser::SyntaxValidator;
use crate::placeholder::PlaceholderValidator;
use crate::resolver::{HostExpr, ParameterBinding, Resolver};
use crate::types::ValueDomain;

/// A query-executing call submitted by the host.
#[derive(Debug)]
pub struct CallSite<'a, E> {
    /// Call arguments, in order.
    pub args: &'a [E],
    /// Source line of the call.
    pub line: usize,
    /// Position of the query text argument.
    pub query_arg: usize,
    /// Position of the parameter bundle, for methods that take one.
    pub params_arg: Option<usize>,
}

impl<E> Clone for CallSite<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for CallSite<'_, E> {}

impl<'a, E> CallSite<'a, E> {
    /// A call whose query is argument `query_arg` and which binds no values.
    #[must_use]
    pub fn new(args: &'a [E], line: usize, query_arg: usize) -> Self {
        Self {
            args,
            line,
            query_arg,
            params_arg: None,
        }
    }

    /// Sets the position of the parameter bundle.
    #[must_use]
    pub fn with_params_arg(mut self, params_arg: usize) -> Self {
        self.params_arg = Some(params_arg);
        self
    }
}

/// Validates call-sites. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct Analyzer {
    allow_list: MethodAllowList,
    resolver: Resolver,
    enumerator: Enumerator,
    syntax: SyntaxValidator,
    placeholders: PlaceholderValidator,
}

impl Analyzer {
    /// Creates an analyzer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` or `InvalidClassMethod` if the configuration
    /// is malformed.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let allow_list = config.validate()?;
        Ok(Self {
            allow_list,
            resolver: Resolver::new(&config),
            enumerator: Enumerator::new(&config),
            syntax: SyntaxValidator::new(config.dialect),
            placeholders: PlaceholderValidator::new(config.dialect),
        })
    }

    /// Methods whose call-sites the host should submit.
    #[must_use]
    pub fn allow_list(&self) -> &MethodAllowList {
        &self.allow_list
    }

    /// Analyzes one call-site.
    ///
    /// Returns nothing for queries that cannot be resolved. Findings are
    /// unique by message, syntax errors first.
    pub fn analyze<E: HostExpr>(&self, site: &CallSite<'_, E>) -> Vec<Finding> {
        let Some(query_expr) = site.args.get(site.query_arg) else {
            trace!(line = site.line, "call-site has no query argument");
            return Vec::new();
        };
        let query = self.resolver.resolve(query_expr);
        if !query.is_enumerable() {
            trace!(line = site.line, "query is not statically resolvable");
            return Vec::new();
        }

        let mut findings = FindingSet::new();
        if let Err(reason) = self.check(site, &query, &mut findings) {
            findings.insert(Finding::unresolvable(&reason, site.line));
        }

        debug!(line = site.line, findings = findings.len(), "call-site analyzed");
        findings.into_vec()
    }

    /// Analyzes call-sites in parallel. Results keep the input order.
    pub fn analyze_all<E: HostExpr + Sync>(&self, sites: &[CallSite<'_, E>]) -> Vec<Vec<Finding>> {
        sites.par_iter().map(|site| self.analyze(site)).collect()
    }

    fn check<E: HostExpr>(
        &self,
        site: &CallSite<'_, E>,
        query: &ValueDomain,
        findings: &mut FindingSet,
    ) -> std::result::Result<(), UnresolvableQuery> {
        let bindings = self.bindings(site);
        let candidates = self.enumerator.enumerate(query, bindings.as_ref(), site.line)?;
        findings.extend(candidates.iter().filter_map(|c| self.syntax.validate(c)));

        if let (Some(bindings), Some(texts)) = (&bindings, query.values()) {
            for text in texts {
                let text = text.to_text();
                findings.extend(self.placeholders.check(&text, bindings, site.line));
            }
        }
        Ok(())
    }

    /// Values bound at the call-site, if the call passes a bundle whose
    /// values are all known.
    fn bindings<E: HostExpr>(&self, site: &CallSite<'_, E>) -> Option<ParameterBinding> {
        let bundle = site.args.get(site.params_arg?)?;
        self.resolver.resolve_parameters(bundle)
    }
}
