//! Validation benchmarks.
//!
//! Measures:
//! - tokenizing and checking single queries per dialect
//! - enumerating and validating many candidate queries for one call-site
//! - batch analysis of many call-sites

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dbalint::parser::tokenize;
use dbalint::{Analyzer, AnalyzerConfig, CallSite, Dialect, Expr, SyntaxValidator};

const JOIN_QUERY: &str = "SELECT u.id, u.name, COUNT(o.id) AS orders \
    FROM users u LEFT JOIN orders o ON o.user_id = u.id \
    WHERE u.active = 1 AND u.created > '2024-01-01' \
    GROUP BY u.id, u.name HAVING COUNT(o.id) > 3 ORDER BY orders DESC LIMIT 20";

/// Benchmark tokenizing a join query
fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_join_query", |b| {
        b.iter(|| tokenize(black_box(JOIN_QUERY), Dialect::Mysql).unwrap());
    });
}

/// Benchmark syntax checks per dialect
fn bench_syntax_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("syntax_check");

    for dialect in [Dialect::Standard, Dialect::Mysql, Dialect::Postgres, Dialect::Sqlite] {
        let validator = SyntaxValidator::new(dialect);
        group.bench_with_input(
            BenchmarkId::new("join_query", format!("{dialect:?}")),
            JOIN_QUERY,
            |b, q| {
                b.iter(|| validator.check(black_box(q)).unwrap());
            },
        );
    }

    let insert = format!(
        "INSERT INTO t (a, b, c) VALUES {}",
        (0..100).map(|i| format!("({i}, 'v{i}', NULL)")).collect::<Vec<_>>().join(", ")
    );
    let validator = SyntaxValidator::new(Dialect::Mysql);
    group.bench_with_input(BenchmarkId::new("insert", "100_rows"), &insert, |b, q| {
        b.iter(|| validator.check(black_box(q)).unwrap());
    });

    group.finish();
}

/// Benchmark one call-site whose parameters expand into many candidates
fn bench_candidate_expansion(c: &mut Criterion) {
    let analyzer = Analyzer::new(AnalyzerConfig::default()).unwrap();
    let args = [
        Expr::concat(
            Expr::literal("SELECT * FROM t WHERE a = ? AND b = ? ORDER BY a "),
            Expr::literal_union(["ASC", "DESC"]),
        ),
        Expr::list(vec![
            Expr::literal_union(0..8),
            Expr::literal_union(["x", "y", "z", "w"]),
        ]),
    ];
    let site = CallSite::new(&args, 1, 0).with_params_arg(1);

    c.bench_function("analyze_64_candidates", |b| {
        b.iter(|| analyzer.analyze(black_box(&site)));
    });
}

/// Benchmark batch analysis of many call-sites
fn bench_analyze_batch(c: &mut Criterion) {
    let analyzer = Analyzer::new(AnalyzerConfig::default().with_dialect(Dialect::Postgres)).unwrap();
    let calls: Vec<[Expr; 2]> = (0_i64..500)
        .map(|i| {
            [
                Expr::literal(format!("SELECT * FROM t{i} WHERE id = $1 AND v > $2")),
                Expr::list(vec![Expr::literal(i), Expr::typed(dbalint::TypeTag::Float)]),
            ]
        })
        .collect();
    let sites: Vec<CallSite<'_, Expr>> = calls
        .iter()
        .map(|args| CallSite::new(&args[..], 1, 0).with_params_arg(1))
        .collect();

    let mut group = c.benchmark_group("analyze_batch_500");
    group.bench_function("sequential", |b| {
        b.iter(|| {
            for site in &sites {
                black_box(analyzer.analyze(site));
            }
        });
    });
    group.bench_function("parallel", |b| {
        b.iter(|| black_box(analyzer.analyze_all(&sites)));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_syntax_check,
    bench_candidate_expansion,
    bench_analyze_batch
);
criterion_main!(benches);
