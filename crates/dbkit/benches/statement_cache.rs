//! Benchmark statement compilation with and without the structural cache.
//!
//! A cache hit hashes the request and clones an `Arc`; a miss runs the
//! resolver and the statement builder.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dbkit::request::{BatchQueryRequest, KeyedRequest, QueryRequest};
use dbkit::{
    Compiler, CompilerConfig, DbField, Field, OrderField, QueryField, QueryGroup, Request,
    SqlServerStatementBuilder, StatementBuilder,
};

/// A query over `n` columns filtered on every one of them:
/// SELECT [C0], [C1], ... FROM [T] WHERE ([C0] = @C0 AND [C1] = @C1 ...)
fn filtered_query(n: usize) -> Request {
    let names: Vec<String> = (0..n).map(|i| format!("C{i}")).collect();
    let filter = QueryGroup::from_fields(names.iter().map(|name| QueryField::eq(name.as_str(), 1)));
    QueryRequest::new("T", Field::from_names(names.iter().map(String::as_str)))
        .filter(filter)
        .into()
}

fn merge_all(batch_size: usize) -> Request {
    KeyedRequest::new("T", Field::from_names(["Id", "Name", "Email", "Phone"]))
        .primary(DbField::primary_identity("Id"))
        .merge_all(batch_size)
        .into()
}

fn bench_compile_uncached(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_cache/compile_uncached");

    for n in [1, 5, 10, 50] {
        let request = filtered_query(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &request, |b, request| {
            b.iter(|| black_box(SqlServerStatementBuilder.create(request).unwrap()));
        });
    }

    group.finish();
}

fn bench_compile_cached(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_cache/compile_cached");

    for n in [1, 5, 10, 50] {
        let compiler = Compiler::sql_server();
        let request = filtered_query(n);
        compiler.compile(&request).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &request, |b, request| {
            b.iter(|| black_box(compiler.compile(request).unwrap()));
        });
    }

    group.finish();
}

fn bench_merge_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_cache/merge_all");

    for batch_size in [1, 10, 100] {
        let cached = Compiler::sql_server();
        let uncached = Compiler::with_config(SqlServerStatementBuilder, CompilerConfig::new().no_cache());
        let request = merge_all(batch_size);

        group.bench_with_input(BenchmarkId::new("cached", batch_size), &request, |b, request| {
            b.iter(|| black_box(cached.compile(request).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("uncached", batch_size), &request, |b, request| {
            b.iter(|| black_box(uncached.compile(request).unwrap()));
        });
    }

    group.finish();
}

fn bench_batch_query_pages(c: &mut Criterion) {
    let compiler = Compiler::sql_server();
    let fields = Field::from_names(["Id", "Name", "Email"]);

    c.bench_function("statement_cache/batch_query_pages", |b| {
        let mut page = 0usize;
        b.iter(|| {
            page = (page + 1) % 64;
            let request: Request = BatchQueryRequest::new(
                "T",
                fields.clone(),
                vec![OrderField::asc("Id")],
                page,
                25,
            )
            .into();
            black_box(compiler.compile(&request).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_compile_uncached,
    bench_compile_cached,
    bench_merge_all,
    bench_batch_query_pages
);
criterion_main!(benches);
