//! Benchmarks for graph statement compilation and execution
//!
//! Run with: `cargo bench -p sqlgraph-core`
//!
//! These benchmarks measure:
//! - Raw statement building (multi-row INSERT, UPDATE with predicates)
//! - Executor overhead per node against a querier that does no I/O
//! - Batched vs sequential bulk create
//! - End-to-end creates against an embedded libsql database

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sqlgraph_core::db::{DatabaseError, ExecQuerier, ExecResult, LibsqlDriver, Rows};
use sqlgraph_core::models::{predicate, Column, EdgeMutation, EdgeSpec, FieldType, NodeSpec, Rel};
use sqlgraph_core::services::{ExecutorConfig, GraphExecutor, InsertBuilder, UpdateBuilder};
use sqlgraph_core::{Dialect, Value};
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Querier that accepts every statement without touching a database
struct NullQuerier;

#[async_trait]
impl ExecQuerier for NullQuerier {
    async fn exec(&self, _sql: &str, _args: &[Value]) -> Result<ExecResult, DatabaseError> {
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: Some(1),
        })
    }

    async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Rows, DatabaseError> {
        Ok(Rows::default())
    }
}

fn id() -> Column {
    Column::new("id", FieldType::Int)
}

fn name() -> Column {
    Column::new("name", FieldType::String)
}

fn age() -> Column {
    Column::nullable("age", FieldType::Int)
}

fn user_spec(i: i64) -> NodeSpec<'static> {
    NodeSpec::builder("users", id())
        .id(i)
        .set(name(), format!("user-{}", i))
        .set(age(), i % 90)
        .build()
}

/// Benchmark statement builders in isolation
fn bench_builders(c: &mut Criterion) {
    let mut group = c.benchmark_group("builders");

    group.bench_function("insert_100_rows", |b| {
        b.iter(|| {
            let mut insert = InsertBuilder::new(Dialect::Postgres, "users");
            insert.columns(["id", "name", "age"]);
            for i in 0..100i64 {
                insert.values(vec![
                    Value::Int(i),
                    Value::Text(format!("user-{}", i)),
                    Value::Int(i % 90),
                ]);
            }
            insert.returning(vec!["id".into()]);
            black_box(insert.build())
        });
    });

    group.bench_function("update_with_predicates", |b| {
        b.iter(|| {
            let mut update = UpdateBuilder::new(Dialect::Postgres, "users");
            update
                .set("name", Value::from("a8m"))
                .add("age", Value::Int(1))
                .set_null("nickname");
            predicate::gte("age", 18).apply(update.selector_mut());
            predicate::has_prefix("name", "a").apply(update.selector_mut());
            predicate::in_values("id", [1, 2, 3, 4, 5]).apply(update.selector_mut());
            black_box(update.build())
        });
    });

    group.finish();
}

/// Benchmark executor overhead for one node with edges
fn bench_executor_overhead(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let executor = GraphExecutor::new(ExecutorConfig::default());
    let groups = EdgeSpec::join_table("groups", "user_groups", "user_id", "group_id").bidi();
    let owner = EdgeSpec::owned_here("owner", Rel::M2O, "owner_id");

    c.bench_function("create_with_edges", |b| {
        b.iter(|| {
            rt.block_on(async {
                let spec = NodeSpec::builder("users", id())
                    .id(1)
                    .set(name(), "a8m")
                    .edge(EdgeMutation::new(groups.clone()).add_ids([1, 2, 3]))
                    .edge(EdgeMutation::new(owner.clone()).add_ids([7]))
                    .build();
                black_box(executor.create(&NullQuerier, spec).await.unwrap())
            })
        });
    });
}

/// Benchmark batched vs sequential bulk create
///
/// Batching folds N creates into one multi-row INSERT; the difference is
/// mostly statement count, which this querier makes free.
fn bench_bulk_create(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("bulk_create");
    group.sample_size(20);

    for (label, batch_insert) in [("100_nodes_batch", true), ("100_nodes_sequential", false)] {
        let executor =
            GraphExecutor::new(ExecutorConfig::default().with_batch_insert(batch_insert));
        group.bench_function(label, |b| {
            b.iter(|| {
                rt.block_on(async {
                    let specs = (1..=100).map(user_spec).collect();
                    black_box(executor.create_many(&NullQuerier, specs).await.unwrap())
                })
            });
        });
    }

    group.finish();
}

/// Benchmark creates against a real embedded database
fn bench_libsql_create(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let executor = GraphExecutor::new(ExecutorConfig::default());

    let mut group = c.benchmark_group("libsql_create");
    group.sample_size(10); // Fewer samples for disk-backed operations

    group.bench_function("100_nodes_batch", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let mut total = std::time::Duration::ZERO;

                for _ in 0..iters {
                    let temp_dir = TempDir::new().unwrap();
                    let db = LibsqlDriver::open(temp_dir.path().join("bench.db"))
                        .await
                        .unwrap();
                    db.exec(
                        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)",
                        &[],
                    )
                    .await
                    .unwrap();

                    let specs = (1..=100).map(user_spec).collect();
                    let start = std::time::Instant::now();
                    executor.create_many(&db, specs).await.unwrap();
                    total += start.elapsed();
                }

                total
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_builders,
    bench_executor_overhead,
    bench_bulk_create,
    bench_libsql_create
);
criterion_main!(benches);
