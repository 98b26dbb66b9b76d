//! Indexed min-heap benchmarks.
//!
//! Measures the Dijkstra access pattern: many relaxations (mostly decrease-key)
//! interleaved with pops, as the subnetwork expansion issues them.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crossquery::IndexedMinHeap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn relax_keys(n: usize, per_node: usize, seed: u64) -> Vec<(usize, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n * per_node)
        .map(|_| (rng.gen_range(0..n), rng.gen::<f64>() * 100.0))
        .collect()
}

fn bench_relax_then_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_relax_drain");

    for &n in &[100, 1_000, 10_000] {
        let keys = relax_keys(n, 4, 42);
        group.throughput(Throughput::Elements(keys.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, &n| {
            bench.iter(|| {
                let mut heap = IndexedMinHeap::new(n);
                for &(node, key) in &keys {
                    heap.relax(node, key);
                }
                let mut popped = 0;
                while let Some(node) = heap.pop_min() {
                    popped += node & 1;
                }
                black_box(popped)
            })
        });
    }

    group.finish();
}

fn bench_interleaved(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_interleaved");

    for &n in &[1_000, 10_000] {
        let keys = relax_keys(n, 8, 7);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, &n| {
            bench.iter(|| {
                let mut heap = IndexedMinHeap::with_source(n, 0);
                let mut floor = 0.0;
                for (step, &(node, key)) in keys.iter().enumerate() {
                    heap.relax(node, floor + key);
                    if step % 8 == 7 {
                        if let Some(u) = heap.pop_min() {
                            floor = heap.distance(u);
                        }
                    }
                }
                black_box(heap.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_relax_then_drain, bench_interleaved);
criterion_main!(benches);
