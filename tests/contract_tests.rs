//! Contract tests for the call-site analysis API: the guarantees hosts and
//! their snapshot suites rely on.

use dbalint::{Analyzer, AnalyzerConfig, CallSite, Expr, Finding};

fn analyzer() -> Analyzer {
    Analyzer::new(AnalyzerConfig::default()).unwrap()
}

fn analyze(query: Expr, params: Option<Expr>) -> Vec<Finding> {
    let has_params = params.is_some();
    let args: Vec<Expr> = std::iter::once(query).chain(params).collect();
    let mut site = CallSite::new(&args, 1, 0);
    if has_params {
        site = site.with_params_arg(1);
    }
    analyzer().analyze(&site)
}

fn syntax_errors(findings: &[Finding]) -> usize {
    findings
        .iter()
        .filter(|f| matches!(f, Finding::SyntaxError { .. }))
        .count()
}

fn mismatches(findings: &[Finding]) -> usize {
    findings
        .iter()
        .filter(|f| matches!(f, Finding::PlaceholderMismatch { .. }))
        .count()
}

// =============================================================================
// End-to-End Examples
// =============================================================================

mod end_to_end_contracts {
    use super::*;

    #[test]
    fn test_valid_query_with_matching_parameter() {
        let findings = analyze(
            Expr::literal("SELECT * FROM users WHERE id = ?"),
            Some(Expr::list(vec![Expr::literal(42)])),
        );
        assert!(findings.is_empty(), "unexpected findings: {findings:?}");
    }

    #[test]
    fn test_truncated_query_is_one_syntax_error() {
        let findings = analyze(Expr::literal("SELECT * FROM users WHERE id ="), None);
        assert_eq!(findings.len(), 1);
        assert_eq!(syntax_errors(&findings), 1);
        assert_eq!(findings[0].identifier(), "dba.syntaxError");
    }

    #[test]
    fn test_missing_parameter_is_one_arity_mismatch() {
        let findings = analyze(
            Expr::literal("SELECT * FROM users WHERE id = ? AND name = ?"),
            Some(Expr::list(vec![Expr::literal(42)])),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(mismatches(&findings), 1);
        assert_eq!(
            findings[0].message(),
            "Query expects 2 placeholders, but 1 value is given."
        );
    }
}

// =============================================================================
// Silent Skip Contracts
// =============================================================================

mod silent_skip_contracts {
    use super::*;
    use dbalint::TypeTag;

    #[test]
    fn test_opaque_query_has_no_findings() {
        assert!(analyze(Expr::opaque(), None).is_empty());
        assert!(analyze(Expr::typed(TypeTag::String), None).is_empty());
    }

    #[test]
    fn test_partially_opaque_query_has_no_findings() {
        let query = Expr::concat(Expr::literal("SELECT * FROM WHERE "), Expr::opaque());
        let params = Expr::list(vec![Expr::literal(1), Expr::literal(2)]);
        assert!(analyze(query, Some(params)).is_empty());
    }

    #[test]
    fn test_non_array_parameters_skip_placeholder_check() {
        let findings = analyze(
            Expr::literal("SELECT * FROM t WHERE a = ? AND b = ?"),
            Some(Expr::typed(TypeTag::Array)),
        );
        assert!(findings.is_empty());
    }
}

// =============================================================================
// Syntax Validator Contracts
// =============================================================================

mod syntax_contracts {
    use super::*;

    #[test]
    fn test_unterminated_literals_are_exactly_one_error() {
        for query in [
            "SELECT * FROM t WHERE a = 'abc",
            "SELECT * FROM t WHERE a = 'it''s",
            "SELECT \"col FROM t",
            "SELECT 1 /* comment",
        ] {
            let findings = analyze(Expr::literal(query), None);
            assert_eq!(syntax_errors(&findings), 1, "{query:?}: {findings:?}");
        }
    }

    #[test]
    fn test_identical_messages_are_deduplicated() {
        // Both candidates fail with the same message.
        let findings = analyze(
            Expr::literal("SELECT * FROM t WHERE a = ? ORDER"),
            Some(Expr::list(vec![Expr::conditional(
                Expr::literal(1),
                Expr::literal(2),
            )])),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message(),
            "Syntax error: expected BY after 'ORDER', found end of query"
        );
    }

    #[test]
    fn test_values_of_different_length_are_deduplicated() {
        let findings = analyze(
            Expr::literal("SELECT * FROM t WHERE a = ? ORDER a"),
            Some(Expr::list(vec![Expr::literal_union(["x", "yyyy"])])),
        );
        assert_eq!(
            findings.iter().map(Finding::message).collect::<Vec<_>>(),
            vec!["Syntax error: expected BY after 'ORDER', found 'a'"]
        );

        let query = Expr::concat(
            Expr::concat(
                Expr::literal("SELECT * FROM "),
                Expr::conditional(Expr::literal("users"), Expr::literal("admin_accounts")),
            ),
            Expr::literal(" WHERE"),
        );
        let findings = analyze(query, None);
        assert_eq!(syntax_errors(&findings), 1, "{findings:?}");
    }

    #[test]
    fn test_distinct_messages_are_kept_in_order() {
        let query = Expr::conditional(
            Expr::literal("SELECT * FROM"),
            Expr::literal("SELECT a, FROM t"),
        );
        let findings = analyze(query, None);
        let messages: Vec<&str> = findings.iter().map(Finding::message).collect();
        assert_eq!(
            messages,
            vec![
                "Syntax error: expected a table name after 'FROM', found end of query",
                "Syntax error: expected an expression after ',', found 'FROM'",
            ]
        );
    }
}

// =============================================================================
// Placeholder Binding Contracts
// =============================================================================

mod placeholder_contracts {
    use super::*;

    #[test]
    fn test_unknown_named_placeholder() {
        let findings = analyze(
            Expr::literal("SELECT * FROM t WHERE id = :id"),
            Some(Expr::map(vec![("name", Expr::literal("x"))])),
        );
        let messages: Vec<&str> = findings.iter().map(Finding::message).collect();
        assert_eq!(
            messages,
            vec![
                "Query expects placeholder :id, but it is missing from values given.",
                "Value :name is given, but the query does not contain this placeholder.",
            ]
        );
    }

    #[test]
    fn test_unused_named_value_is_distinct_finding() {
        let findings = analyze(
            Expr::literal("SELECT * FROM t"),
            Some(Expr::map(vec![("id", Expr::literal(1))])),
        );
        assert_eq!(mismatches(&findings), 1);
        assert_eq!(
            findings[0].message(),
            "Value :id is given, but the query does not contain this placeholder."
        );
    }

    #[test]
    fn test_mixed_placeholders_are_reported() {
        let findings = analyze(
            Expr::literal("SELECT * FROM t WHERE a = ? AND b = :b"),
            Some(Expr::list(vec![Expr::literal(1)])),
        );
        assert_eq!(
            findings.iter().map(Finding::message).collect::<Vec<_>>(),
            vec!["Query mixes positional and named placeholders."]
        );
    }
}

// =============================================================================
// Property Tests
// =============================================================================

mod property_contracts {
    use super::*;
    use proptest::prelude::*;

    fn positional_query(n: usize) -> String {
        let conditions: Vec<String> = (0..n).map(|i| format!("c{i} = ?")).collect();
        format!("SELECT * FROM t WHERE {}", conditions.join(" AND "))
    }

    fn int_list(m: usize) -> Expr {
        let values = (0..m).map(|i| Expr::literal(i64::try_from(i).unwrap())).collect();
        Expr::list(values)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: unknown query text never produces a finding.
        #[test]
        fn test_unresolvable_query_never_reported(prefix in "[ -~]{0,40}", n in 0usize..4) {
            let query = Expr::concat(Expr::literal(prefix), Expr::opaque());
            prop_assert!(analyze(query, Some(int_list(n))).is_empty());
        }

        /// Property: well-formed selects are accepted.
        #[test]
        fn test_valid_selects_accepted(
            cols in proptest::collection::vec("c_[a-z0-9_]{0,8}", 1..5),
            table in "t_[a-z0-9_]{0,8}",
            value in any::<i32>(),
            desc in any::<bool>(),
        ) {
            let query = format!(
                "SELECT {} FROM {table} WHERE {} = {value} ORDER BY {}{}",
                cols.join(", "),
                cols[0],
                cols[cols.len() - 1],
                if desc { " DESC" } else { "" },
            );
            let findings = analyze(Expr::literal(query.clone()), None);
            prop_assert!(findings.is_empty(), "{query}: {findings:?}");
        }

        /// Property: an unterminated string literal is exactly one error.
        #[test]
        fn test_unterminated_string_one_error(body in "[a-z0-9 ]{0,20}") {
            let query = format!("SELECT * FROM t WHERE a = '{body}");
            let findings = analyze(Expr::literal(query), None);
            prop_assert_eq!(findings.len(), 1);
            prop_assert_eq!(syntax_errors(&findings), 1);
        }

        /// Property: arity mismatch by one is exactly one finding.
        #[test]
        fn test_positional_arity(n in 1usize..8, delta in -1i32..=1) {
            let m = if delta < 0 { n - 1 } else { n + usize::try_from(delta).unwrap() };
            let findings = analyze(Expr::literal(positional_query(n)), Some(int_list(m)));
            if m == n {
                prop_assert!(findings.is_empty(), "{findings:?}");
            } else {
                prop_assert_eq!(findings.len(), 1);
                prop_assert_eq!(mismatches(&findings), 1);
            }
        }

        /// Property: analysis is deterministic.
        #[test]
        fn test_analysis_is_idempotent(n in 0usize..5, m in 0usize..5, tail in "( ORDER| LIMIT 'x'| GROUP BY a)?") {
            let query = format!("{}{tail}", positional_query(n.max(1)));
            let first = analyze(Expr::literal(query.clone()), Some(int_list(m)));
            let second = analyze(Expr::literal(query), Some(int_list(m)));
            prop_assert_eq!(first, second);
        }
    }
}
