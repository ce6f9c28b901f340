//! Unit tests for dbalint's public building blocks.

use dbalint::parser::{tokenize, TokenKind};
use dbalint::placeholder::{scan, ExpectedType};
use dbalint::{
    AnalyzerConfig, ArrayKey, ClassMethod, DbaError, Dialect, Expr, Finding, FindingSet,
    MethodAllowList, ParameterBinding, PlaceholderKind, PlaceholderValidator, Resolver, Scalar,
    SyntaxValidator, TypeTag, UnresolvableQuery, ValueDomain,
};

// =============================================================================
// Error Tests
// =============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = DbaError::SyntaxError {
            line: 2,
            col: 7,
            message: "unexpected ')'".into(),
        };
        assert_eq!(err.to_string(), "Syntax error at line 2, column 7: unexpected ')'");
    }

    #[test]
    fn test_invalid_class_method_display() {
        let err = DbaError::InvalidClassMethod("PDO".into());
        assert!(err.to_string().contains("Invalid classMethod definition"));
        assert!(err.to_string().contains("PDO"));
    }

    #[test]
    fn test_unresolvable_query_messages_and_tips() {
        let reason = UnresolvableQuery::TooDynamic;
        assert!(reason.as_rule_message().starts_with("Unresolvable Query:"));
        assert!(reason.tip().contains("non-mixed type"));

        let reason = UnresolvableQuery::UnsimulatableType(TypeTag::Object);
        assert!(reason.as_rule_message().contains("object"));
        assert_ne!(reason.tip(), UnresolvableQuery::TooDynamic.tip());
    }
}

// =============================================================================
// Value Domain Tests
// =============================================================================

mod domain_tests {
    use super::*;

    #[test]
    fn test_finite_set_invariants() {
        let domain = ValueDomain::from_values(vec![Scalar::from("a"), Scalar::from("b")], 10);
        assert!(domain.is_enumerable());
        assert_eq!(domain.cardinality(), 2);
        assert_eq!(domain.type_tag(), Some(TypeTag::NonEmptyString));
    }

    #[test]
    fn test_degrades_over_cap() {
        let values: Vec<Scalar> = (0..300).map(Scalar::Int).collect();
        let domain = ValueDomain::from_values(values, 256);
        assert_eq!(domain, ValueDomain::TypedUnknown(TypeTag::Int));
        assert!(domain.is_resolvable());
        assert!(!domain.is_enumerable());
    }

    #[test]
    fn test_scalar_display_quotes_strings() {
        assert_eq!(Scalar::from("x").to_string(), "'x'");
        assert_eq!(Scalar::Int(3).to_string(), "3");
        assert_eq!(Scalar::Null.to_string(), "null");
    }

    #[test]
    fn test_type_tag_serde_names() {
        let json = serde_json::to_string(&TypeTag::NonEmptyString).unwrap();
        assert_eq!(json, "\"non-empty-string\"");
        assert_eq!(TypeTag::NumericString.to_string(), "numeric-string");
    }
}

// =============================================================================
// Resolver Tests
// =============================================================================

mod resolver_tests {
    use super::*;

    fn resolver() -> Resolver {
        Resolver::new(&AnalyzerConfig::default())
    }

    #[test]
    fn test_nested_concatenation() {
        let expr = Expr::concat(
            Expr::concat(
                Expr::literal("SELECT * FROM t ORDER BY a "),
                Expr::literal_union(["ASC", "DESC"]),
            ),
            Expr::literal(" LIMIT 10"),
        );
        assert_eq!(
            resolver().resolve(&expr),
            ValueDomain::FiniteSet(vec![
                Scalar::from("SELECT * FROM t ORDER BY a ASC LIMIT 10"),
                Scalar::from("SELECT * FROM t ORDER BY a DESC LIMIT 10"),
            ])
        );
    }

    #[test]
    fn test_bool_and_null_pieces() {
        let expr = Expr::concat(Expr::literal("x"), Expr::typed(TypeTag::Bool));
        assert_eq!(
            resolver().resolve(&expr),
            ValueDomain::FiniteSet(vec![Scalar::from("x1"), Scalar::from("x")])
        );
        let expr = Expr::concat(Expr::literal("x"), Expr::typed(TypeTag::Null));
        assert_eq!(resolver().resolve(&expr), ValueDomain::SingleValue(Scalar::from("x")));
    }

    #[test]
    fn test_product_over_cap_keeps_type() {
        let config = AnalyzerConfig::default().with_max_domain_values(3);
        let expr = Expr::concat(
            Expr::literal_union(["a", "b"]),
            Expr::literal_union(["c", "d"]),
        );
        assert_eq!(
            Resolver::new(&config).resolve(&expr),
            ValueDomain::TypedUnknown(TypeTag::String)
        );
    }

    #[test]
    fn test_parameter_bundle_shapes() {
        let positional = Expr::array(vec![
            (ArrayKey::Index(1), Expr::literal("b")),
            (ArrayKey::Index(0), Expr::literal("a")),
        ]);
        // Call-site order, not key order.
        assert_eq!(
            resolver().resolve_parameters(&positional),
            Some(ParameterBinding::Positional(vec![
                ValueDomain::SingleValue(Scalar::from("b")),
                ValueDomain::SingleValue(Scalar::from("a")),
            ]))
        );

        let named = Expr::map(vec![("@a", Expr::literal(1)), ("$b", Expr::literal(2))]);
        let binding = resolver().resolve_parameters(&named).unwrap();
        assert!(binding.named("a").is_some());
        assert!(binding.named("b").is_some());
        assert_eq!(binding.positional(0), None);
    }

    #[test]
    fn test_empty_bundle_is_empty_positional() {
        assert_eq!(
            resolver().resolve_parameters(&Expr::list(vec![])),
            Some(ParameterBinding::Positional(vec![]))
        );
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.dialect, Dialect::Standard);
        assert_eq!(config.max_domain_values, 256);
        assert_eq!(config.max_candidates, 256);
        assert!(config.simulate_typed_values);
        assert!(config.class_methods.is_empty());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: AnalyzerConfig = serde_json::from_str(
            r#"{"dialect": "postgres", "class_methods": ["PDO::query"]}"#,
        )
        .unwrap();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(config.max_candidates, 256);
        assert_eq!(config.validate().unwrap().entries().len(), 1);
    }

    #[test]
    fn test_class_method_parsing() {
        let method = ClassMethod::parse("Doctrine\\DBAL\\Connection::executeQuery").unwrap();
        assert_eq!(method.class, "Doctrine\\DBAL\\Connection");
        assert_eq!(method.method, "executeQuery");
        assert!(ClassMethod::parse("Connection::").is_err());
    }

    #[test]
    fn test_allow_list() {
        let list = MethodAllowList::parse(&["PDO::query", "PDO::prepare"]).unwrap();
        assert!(!list.is_empty());
        assert!(list.matches("PDO", "query", |_| false));
        assert!(list.matches("App\\Db", "prepare", |parent| parent == "PDO"));
        assert!(!list.matches("App\\Db", "exec", |_| true));
    }
}

// =============================================================================
// Tokenizer and Syntax Validator Tests
// =============================================================================

mod syntax_tests {
    use super::*;

    #[test]
    fn test_tokenize_positions() {
        let tokens = tokenize("SELECT a\n  FROM t", Dialect::Standard).unwrap();
        let from = &tokens[2];
        assert_eq!(from.kind, TokenKind::Word);
        assert_eq!((from.line, from.col), (2, 3));
    }

    #[test]
    fn test_sqlite_bracket_identifiers() {
        let validator = SyntaxValidator::new(Dialect::Sqlite);
        assert!(validator.check("SELECT [my col] FROM [my table]").is_ok());
    }

    #[test]
    fn test_postgres_dollar_quoted_body() {
        let validator = SyntaxValidator::new(Dialect::Postgres);
        assert!(validator.check("SELECT $$ it's ( unbalanced $$").is_ok());
        assert!(validator.check("SELECT $$ open").is_err());
    }

    #[test]
    fn test_statements_are_checked_independently() {
        let validator = SyntaxValidator::new(Dialect::Mysql);
        let err = validator.check("SELECT 1; SELECT * FROM").unwrap_err();
        assert_eq!(
            err,
            DbaError::SyntaxError {
                line: 1,
                col: 24,
                message: "expected a table name after 'FROM', found end of query".into(),
            }
        );
    }
}

// =============================================================================
// Placeholder Tests
// =============================================================================

mod placeholder_tests {
    use super::*;

    #[test]
    fn test_scan_sqlite_forms() {
        let found = scan("SELECT ?1, :a, @b, $c", Dialect::Sqlite).unwrap();
        let kinds: Vec<PlaceholderKind> = found.into_iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PlaceholderKind::Numbered(1),
                PlaceholderKind::Named("a".into()),
                PlaceholderKind::Named("b".into()),
                PlaceholderKind::Named("c".into()),
            ]
        );
    }

    #[test]
    fn test_scan_offset_context() {
        let found = scan("SELECT * FROM t LIMIT 10 OFFSET :skip", Dialect::Standard).unwrap();
        assert_eq!(found[0].expected, ExpectedType::Integer);
    }

    #[test]
    fn test_sigil_on_binding_names_is_ignored() {
        let validator = PlaceholderValidator::new(Dialect::Sqlite);
        let binding = ParameterBinding::Named(vec![(
            "id".into(),
            ValueDomain::SingleValue(Scalar::Int(1)),
        )]);
        assert!(validator.check("SELECT * FROM t WHERE id = @id", &binding, 1).is_empty());
    }
}

// =============================================================================
// Finding Tests
// =============================================================================

mod finding_tests {
    use super::*;

    #[test]
    fn test_finding_set_first_seen_order() {
        let set: FindingSet = vec![
            Finding::syntax_error("b", 1),
            Finding::placeholder_mismatch("a", 1),
            Finding::syntax_error("b", 2),
        ]
        .into_iter()
        .collect();
        let messages: Vec<&str> = set.iter().map(Finding::message).collect();
        assert_eq!(messages, vec!["b", "a"]);
        assert_eq!(set.into_vec()[0].line(), 1);
    }

    #[test]
    fn test_tip_only_on_unresolvable() {
        assert_eq!(Finding::syntax_error("x", 1).tip(), None);
        let finding = Finding::unresolvable(&UnresolvableQuery::TooDynamic, 1);
        assert_eq!(finding.tip(), Some(UnresolvableQuery::TooDynamic.tip()));
    }
}
