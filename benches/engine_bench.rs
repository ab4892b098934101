//! Benchmarks for the terralog query and transform engines
//!
//! Run with: cargo bench

use chrono::{DateTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use terralog::engine::QueryEngine;
use terralog::model::{Dataset, Record, TimeWindow, ValueType};
use terralog::store::{CatalogStore, MemoryStore, RecordStore};
use terralog::transform::Expression;

fn t(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn populated_store(records: usize) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert_value_type(&ValueType::new(1, "level", "m"))
        .unwrap();
    store
        .insert_dataset(
            &Dataset::new(1, "bench", 7, 1, "bench")
                .timespan(t(0), t(records as i64 * 60))
                .calibration(0.2, 1.5),
        )
        .unwrap();
    for i in 0..records {
        let value = (i as f64 * 0.1).sin() * 10.0;
        store
            .insert_record(Record::new(i as i64 + 1, 1, t(i as i64 * 60), Some(value)))
            .unwrap();
    }
    store
}

fn bench_find_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_value");

    for size in [1_000, 10_000] {
        let store = populated_store(size);
        let dataset = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);
        let midpoint = t(size as i64 * 30 + 17);

        group.bench_function(format!("interpolate_{size}"), |b| {
            b.iter(|| engine.find_value(black_box(&dataset), black_box(midpoint)).unwrap())
        });
    }

    group.finish();
}

fn bench_statistics(c: &mut Criterion) {
    let store = populated_store(10_000);
    let dataset = store.get_dataset(1).unwrap().unwrap();
    let engine = QueryEngine::new(&store);

    let mut group = c.benchmark_group("statistics");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("pushdown_10000", |b| {
        b.iter(|| engine.statistics(black_box(&dataset)).unwrap())
    });
    group.bench_function("materialized_10000", |b| {
        b.iter(|| {
            engine
                .timeseries_series(black_box(&dataset), TimeWindow::all(), false)
                .unwrap()
                .sample_stddev()
        })
    });
    group.finish();
}

fn bench_expression(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression");

    group.bench_function("parse", |b| {
        b.iter(|| Expression::parse(black_box("0.5 * sqrt(abs(x)) + x^2 / 100 - min(x, 3)")).unwrap())
    });

    let expression = Expression::parse("0.5 * sqrt(abs(x)) + x^2 / 100 - min(x, 3)").unwrap();
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("eval_10000", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..10_000 {
                acc += expression.apply(black_box(i as f64 * 0.01));
            }
            acc
        })
    });

    group.finish();
}

criterion_group!(benches, bench_find_value, bench_statistics, bench_expression);
criterion_main!(benches);
