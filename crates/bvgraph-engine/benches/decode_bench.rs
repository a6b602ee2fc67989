//! Decoding throughput: full sequential scans and random lookups.
#![allow(missing_docs)]

use std::hint::black_box;

use bvgraph_common::types::AccessMode;
use bvgraph_core::testing::{GraphEncoder, web_like_lists};
use bvgraph_engine::GraphView;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};

const NODES: u64 = 50_000;
const SAMPLE_SIZE: usize = 20;

fn graph(encoder: &GraphEncoder, mode: AccessMode) -> GraphView {
    let encoded = encoder.encode(&web_like_lists(NODES, 0x5eed));
    GraphView::from_bytes(encoded.properties, encoded.graph, mode).expect("fixture graph")
}

fn bench_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode/sequential");
    group.sample_size(SAMPLE_SIZE);
    group.throughput(Throughput::Elements(NODES));

    for (name, encoder) in [
        ("references", GraphEncoder::new()),
        ("gaps_only", GraphEncoder::gaps_only()),
    ] {
        let graph = graph(&encoder, AccessMode::SequentialStream);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut arcs = 0u64;
                for list in graph.open_sequential_cursor().expect("cursor") {
                    arcs += list.expect("decode").degree();
                }
                black_box(arcs)
            });
        });
    }
    group.finish();
}

fn bench_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode/random");
    group.sample_size(SAMPLE_SIZE);
    let lookups: Vec<u64> = (0..10_000u64).map(|i| (i * 7919) % NODES).collect();
    group.throughput(Throughput::Elements(lookups.len() as u64));

    let graph = graph(&GraphEncoder::new(), AccessMode::RandomAccess);
    group.bench_function("successors", |b| {
        b.iter(|| {
            let mut cursor = graph.open_random_cursor().expect("cursor");
            for &node in &lookups {
                black_box(cursor.successors(node).expect("decode"));
            }
        });
    });
    group.bench_function("outdegree", |b| {
        b.iter(|| {
            let mut cursor = graph.open_random_cursor().expect("cursor");
            for &node in &lookups {
                black_box(cursor.outdegree(node).expect("decode"));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_sequential, bench_random);
criterion_main!(benches);
