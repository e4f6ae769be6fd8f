use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msgbox_kernel_chain::process_batch_tree;
use msgbox_kernel_core::Watermark;
use msgbox_kernel_testkit::{valid_run, TestFixture};

fn bench_process_batch(c: &mut Criterion) {
    let fixture = TestFixture::with_seed([0x42; 32]);
    let builder = fixture.builder();
    let resolver = fixture.resolver();
    let messages = valid_run(256);

    let mut group = c.benchmark_group("process_batch");
    group.throughput(Throughput::Elements(messages.len() as u64));
    for chunk_size in [1usize, 8, 64, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    builder
                        .process_batch(Watermark::GENESIS, &messages, chunk_size, &resolver)
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

fn bench_tree_vs_sequential(c: &mut Criterion) {
    let fixture = TestFixture::with_seed([0x42; 32]);
    let builder = Arc::new(fixture.builder());
    let resolver = Arc::new(fixture.resolver());
    let messages = valid_run(256);
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("tree_vs_sequential");
    group.bench_function("sequential", |b| {
        b.iter(|| {
            builder
                .process_batch(Watermark::GENESIS, &messages, 16, resolver.as_ref())
                .unwrap()
        })
    });
    group.bench_function("tree", |b| {
        b.iter(|| {
            runtime
                .block_on(process_batch_tree(
                    Arc::clone(&builder),
                    Arc::clone(&resolver),
                    Watermark::GENESIS,
                    messages.clone(),
                    16,
                ))
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_process_batch, bench_tree_vs_sequential);
criterion_main!(benches);
