//! Criterion benchmarks for JSON parsing and RemesPath evaluation.
//!
//! Queries are compiled once outside the timed loop, so the evaluation
//! groups measure only `Query::evaluate`.
//!
//! Run:
//!   cargo bench
//!   cargo bench -- json_parse      # one group
//!   cargo bench -- regex_filter    # one group

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use remespath::{parse, JNode, ParserOptions, Query};

// ── Data builders ─────────────────────────────────────────────────────────────

/// `n` rows of `{a, b, c, z}` with a mix of matching and non-matching `z`.
fn rows_text(n: usize) -> String {
    let rows: Vec<String> = (0..n)
        .map(|i| {
            let z = if i % 3 == 0 { "abc" } else { "Hello world" };
            format!(
                r#"{{"a": {}, "b": {:.2}, "c": [{}, "x{}"], "z": "{} {}"}}"#,
                i,
                i as f64 * 0.5,
                i % 7,
                i,
                z,
                i
            )
        })
        .collect();
    format!("[{}]", rows.join(", "))
}

fn rows(n: usize) -> JNode {
    // the generated text is always valid JSON
    parse(&rows_text(n), ParserOptions::default()).unwrap()
}

// ── Bench groups ──────────────────────────────────────────────────────────────

fn bench_json_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_parse");
    for n in [100_usize, 1000] {
        let text = rows_text(n);
        group.bench_with_input(BenchmarkId::new("rows", n), &text, |b, text| {
            b.iter(|| black_box(parse(black_box(text), ParserOptions::default()).unwrap()))
        });
    }
    group.finish();
}

fn bench_regex_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex_filter");
    let query = Query::compile("@[@[:].z =~ `(?i)[a-z]{5}`]").unwrap();
    for n in [100_usize, 1000, 10000] {
        let data = rows(n);
        group.bench_with_input(BenchmarkId::new("rows", n), &data, |b, data| {
            b.iter(|| black_box(query.evaluate(black_box(data)).unwrap()))
        });
    }
    group.finish();
}

fn bench_vectorized(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorized");
    let data = rows(1000);
    let cases = [
        ("arithmetic", "@[:].a * 2 + @[:].b"),
        ("s_upper", "s_upper(@[:].z)"),
        ("filter_project", "@[@[:].a > 500]{a: @.a, n: len(@.c)}"),
        ("aggregate", "mean(@[:].b)"),
        ("sort_by", "sort_by(@, 'b', true)[:10].a"),
    ];
    for (name, text) in cases {
        let query = Query::compile(text).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| black_box(query.evaluate(black_box(&data)).unwrap()))
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.bench_function("regex_filter", |b| {
        b.iter(|| black_box(Query::compile(black_box("@[@[:].z =~ `(?i)[a-z]{5}`]")).unwrap()))
    });
    group.bench_function("constant_fold", |b| {
        b.iter(|| black_box(Query::compile(black_box("sum(irange(100)) * 2 ** 3")).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_json_parse,
    bench_regex_filter,
    bench_vectorized,
    bench_compile
);
criterion_main!(benches);
