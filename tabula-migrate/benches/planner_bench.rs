//! Benchmarks for migration planning and rendering.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tabula_migrate::{Dialect, MigrationPlanner, StatementRenderer};
use tabula_schema::{
    ColumnSchema, ColumnType, DefaultValue, ForeignKeySchema, IndexSchema, PrimaryKeySchema,
    Schema, TableSchema,
};

/// A chain of tables where each references the previous one.
fn wide_schema(tables: usize, columns: usize) -> Schema {
    let mut schema = Schema::new();
    for t in 0..tables {
        let name = format!("table_{t}");
        let mut builder = TableSchema::builder(name.as_str())
            .column(ColumnSchema::new("id", ColumnType::BigInt).auto_increment())
            .primary_key(PrimaryKeySchema::new(["id"]));
        for c in 0..columns {
            builder = builder.column(
                ColumnSchema::new(format!("col_{c}"), ColumnType::Varchar(Some(64)))
                    .default_value(DefaultValue::string("")),
            );
        }
        builder = builder.index(IndexSchema::on(["col_0"]));
        if t > 0 {
            builder = builder
                .column(ColumnSchema::new("parent_id", ColumnType::BigInt).nullable())
                .foreign_key(ForeignKeySchema::new("parent_id", format!("table_{}", t - 1), "id"));
        }
        if let Ok(table) = builder.build() {
            schema.insert_table(table);
        }
    }
    schema
}

/// Same tables with every other column missing and no indexes.
fn drifted(schema: &Schema) -> Schema {
    let mut actual = Schema::new();
    for table in schema.tables() {
        let mut bare = table.clone();
        bare.indexes.clear();
        bare.foreign_keys.clear();
        let columns = table
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 2 == 0)
            .map(|(_, c)| c.clone())
            .collect();
        if let Ok(table) = bare.with_columns(columns) {
            actual.insert_table(table);
        }
    }
    actual
}

fn bench_plan_new_schema(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_new_schema");
    let planner = MigrationPlanner::for_dialect(Dialect::Postgres);

    for tables in [10, 50, 200] {
        let desired = wide_schema(tables, 20);
        let actual = Schema::new();
        group.throughput(Throughput::Elements(tables as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tables), &tables, |b, _| {
            b.iter(|| black_box(planner.plan(&desired, &actual)))
        });
    }

    group.finish();
}

fn bench_plan_drift(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_drift");

    for dialect in [Dialect::H2, Dialect::Postgres, Dialect::MySql] {
        let planner = MigrationPlanner::for_dialect(dialect);
        let desired = wide_schema(50, 20);
        let actual = drifted(&desired);
        group.bench_function(dialect.as_str(), |b| {
            b.iter(|| black_box(planner.plan(&desired, &actual)))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let desired = wide_schema(50, 20);
    let actual = drifted(&desired);

    for dialect in [Dialect::H2, Dialect::Postgres, Dialect::MySql] {
        let Ok(plan) = MigrationPlanner::for_dialect(dialect).plan(&desired, &actual) else {
            continue;
        };
        let renderer = dialect.renderer();
        group.bench_function(dialect.as_str(), |b| {
            b.iter(|| black_box(renderer.render_plan(&plan)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan_new_schema, bench_plan_drift, bench_render);
criterion_main!(benches);
