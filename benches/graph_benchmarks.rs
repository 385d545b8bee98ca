use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use livegraph::graph::{GraphConfig, GraphStore};
use livegraph::{synchronize, Graph, NullSink, Source};
use std::sync::Arc;

fn populated(size: usize, config: GraphConfig) -> GraphStore {
    let mut store = GraphStore::with_config("bench", config);
    for i in 0..size {
        store.add_node(&format!("n{}", i)).unwrap();
    }
    for i in 0..size {
        for j in [1, 7, 31] {
            store
                .add_edge_between(&format!("n{}", i), &format!("n{}", (i + j) % size), i % 3 != 0)
                .unwrap();
        }
    }
    store.take_events();
    store
}

/// Benchmark node insertion throughput
fn bench_node_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_insertion");

    for size in [100, 1000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut store = GraphStore::new("bench");
                store.set_event_recording(false);
                for i in 0..size {
                    let id = format!("n{}", i);
                    store.add_node(&id).unwrap();
                    store.set_node_attribute(&id, "weight", (i % 100) as i64).unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark edge insertion for both neighbor index kinds
fn bench_edge_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_insertion");

    for (name, config) in [("single", GraphConfig::single()), ("multi", GraphConfig::multi())] {
        group.bench_with_input(BenchmarkId::new(name, 1000), &config, |b, config| {
            b.iter(|| populated(1000, config.clone()));
        });
    }
    group.finish();
}

/// Benchmark neighbor lookups
fn bench_edge_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_lookup");

    for (name, config) in [("single", GraphConfig::single()), ("multi", GraphConfig::multi())] {
        let store = populated(1000, config);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut found = 0;
                for i in 0..1000 {
                    let from = format!("n{}", i);
                    let to = format!("n{}", (i + 7) % 1000);
                    if store.edge_between(&from, &to).is_some() {
                        found += 1;
                    }
                }
                criterion::black_box(found)
            });
        });
    }
    group.finish();
}

/// Benchmark node removal, which detaches every incident edge
fn bench_node_removal(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_removal");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || populated(size, GraphConfig::default()),
                |mut store| {
                    for i in (0..size).step_by(2) {
                        store.remove_node(&format!("n{}", i)).unwrap();
                    }
                    store
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

/// Benchmark event propagation through synchronized graphs
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for width in [2usize, 4].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, &width| {
            b.iter(|| {
                let graphs: Vec<Graph> = (0..width).map(|i| Graph::new(format!("g{}", i))).collect();
                synchronize(&graphs);
                graphs[0].add_sink(Arc::new(NullSink));
                for i in 0..200 {
                    graphs[i % width].add_node(&format!("n{}", i)).unwrap();
                }
                for g in &graphs {
                    g.clear_sinks();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_node_insertion,
    bench_edge_insertion,
    bench_edge_lookup,
    bench_node_removal,
    bench_pipeline
);
criterion_main!(benches);
