//! Device read/write benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scull_bench::{device, filled_device, random_data};
use scull_core::AccessMode;

/// Benchmark single write calls that fill exactly one quantum.
fn bench_quantum_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantum_write");

    for quantum in [64, 400, 4096].iter() {
        group.throughput(Throughput::Bytes(*quantum as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(quantum),
            quantum,
            |b, &quantum| {
                let device = device(quantum, 100);
                let handle = device.open(AccessMode::ReadWrite).unwrap();
                let data = random_data(quantum);

                b.iter(|| {
                    let n = handle.write(&mut 0, black_box(&data)).unwrap();
                    black_box(n);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark appending a multi-quantum payload with `write_all`.
fn bench_write_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_all");
    group.sample_size(50);

    for size in [4 * 1024, 64 * 1024, 1024 * 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let device = device(400, 100);
            let data = random_data(size);

            b.iter(|| {
                // Write-only open truncates, so every iteration allocates afresh.
                let handle = device.open(AccessMode::WriteOnly).unwrap();
                handle.write_all(&mut 0, black_box(&data)).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark single read calls of one quantum.
fn bench_quantum_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantum_read");

    for quantum in [64, 400, 4096].iter() {
        group.throughput(Throughput::Bytes(*quantum as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(quantum),
            quantum,
            |b, &quantum| {
                let device = filled_device(quantum, 100, quantum * 8);
                let handle = device.open(AccessMode::ReadOnly).unwrap();
                let mut buf = vec![0u8; quantum];
                let offset = (quantum * 7) as u64;

                b.iter(|| {
                    let n = handle.read(&mut black_box(offset), &mut buf).unwrap();
                    black_box(n);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark reading a whole device back with `read_to_end`.
fn bench_read_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_to_end");
    group.sample_size(50);

    for size in [4 * 1024, 64 * 1024, 1024 * 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let device = filled_device(400, 100, size);
            let handle = device.open(AccessMode::ReadOnly).unwrap();

            b.iter(|| {
                let mut out = Vec::with_capacity(size);
                let n = handle.read_to_end(&mut 0, &mut out).unwrap();
                black_box(n);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_quantum_write,
    bench_write_all,
    bench_quantum_read,
    bench_read_to_end
);
criterion_main!(benches);
