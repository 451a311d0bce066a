//! Benchmarks for row building and fill-order resolution.

use std::collections::BTreeSet;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use dataforge_core::error::Result;
use dataforge_core::generate::pipeline::{RowPlan, ValueGenerationPipeline};
use dataforge_core::generate::pool::ReferentialValuePool;
use dataforge_core::generate::rules::RuleSet;
use dataforge_core::graph::cycle::resolve_fill_order;
use dataforge_core::graph::dag::{Relations, TableSelection};
use dataforge_core::schema::catalog::TableSnapshot;
use dataforge_core::schema::types::*;

/// One table with `num_columns` nullable columns of mixed types, no keys.
fn wide_table(num_columns: usize) -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(DatabaseType::PostgreSQL, "bench".to_string());
    let mut table = Table::new("items".to_string());

    let types = [
        ("email", DataType::VarChar),
        ("first_name", DataType::VarChar),
        ("last_name", DataType::VarChar),
        ("price", DataType::Numeric),
        ("created_at", DataType::Timestamp),
        ("is_active", DataType::Boolean),
        ("description", DataType::Text),
        ("status", DataType::VarChar),
        ("quantity", DataType::Integer),
        ("website", DataType::VarChar),
    ];

    for i in 0..num_columns {
        let (name, dt) = &types[i % types.len()];
        let col_name = if i < types.len() {
            name.to_string()
        } else {
            format!("{}_{}", name, i / types.len())
        };
        table.add_column(Column::new(col_name, dt.clone(), dt.to_string()));
    }

    schema.add_table(table);
    schema
}

/// `n` tables in a chain, each referencing the previous one; the last one
/// also references the first, closing a cycle through all of them.
fn ring_schema(n: usize) -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(DatabaseType::PostgreSQL, "ring".to_string());
    for i in 0..n {
        let mut table = Table::new(format!("t{}", i));
        table.add_column(Column::new("id".to_string(), DataType::Serial, "serial".to_string()));
        table.add_column(Column::new("prev_id".to_string(), DataType::Integer, "integer".to_string()));
        let prev = if i == 0 { n - 1 } else { i - 1 };
        table
            .foreign_keys
            .push(ForeignKey::single("prev_id", &format!("t{}", prev), "id"));
        schema.add_table(table);
    }
    schema
}

fn bench_build_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/build_row");
    let rules = RuleSet::builtin();
    let plan = RowPlan::default();

    for col_count in [5, 10, 20] {
        let schema = wide_table(col_count);
        let snapshot = TableSnapshot::read(&schema, "items").unwrap();

        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(BenchmarkId::new("cols", col_count), &col_count, |b, _| {
            b.iter(|| {
                let mut pipeline = ValueGenerationPipeline::new(&rules, 42);
                let mut pool = ReferentialValuePool::new();
                for _ in 0..1000 {
                    pipeline.build_row(&snapshot, &mut pool, &plan).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_fill_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/fill_order");

    for table_count in [10, 100, 500] {
        let schema = ring_schema(table_count);
        let relations = Relations::build(&schema, &TableSelection::all()).unwrap();

        group.bench_with_input(
            BenchmarkId::new("ring", table_count),
            &table_count,
            |b, _| {
                b.iter(|| {
                    let mut by_name =
                        |c: &BTreeSet<String>| -> Result<Vec<String>> { Ok(c.iter().cloned().collect()) };
                    resolve_fill_order(&relations, &mut by_name, None).unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build_row, bench_fill_order);
criterion_main!(benches);
