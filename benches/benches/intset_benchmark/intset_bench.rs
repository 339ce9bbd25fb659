use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use kvprim::IntSet;
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn create_set(
    base: i64,
    size: i64,
) -> IntSet {
    let mut set = IntSet::new();
    for i in 0..size {
        set.add(base + i).expect("fresh value");
    }
    set
}

fn bench_add_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_sequential");

    for (name, base) in [
        ("i16", 0i64),
        ("i32", i16::MAX as i64 + 1),
        ("i64", i32::MAX as i64 + 1),
    ] {
        let input: Vec<i64> = (0..1_000).map(|i| base + i).collect();
        group.throughput(Throughput::Elements(input.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut set = IntSet::new();
                for &v in &input {
                    let _ = set.add(black_box(v));
                }
                black_box(set);
            });
        });
    }

    group.finish();
}

/// Вставка в случайном порядке: каждый раз сдвигается хвост буфера.
fn bench_add_random(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);
    let input: Vec<i64> = (0..1_000).map(|_| rng.gen_range(-30_000..30_000)).collect();

    c.bench_function("add_random_1000", |b| {
        b.iter(|| {
            let mut set = IntSet::new();
            for &v in &input {
                let _ = set.add(black_box(v));
            }
            black_box(set);
        });
    });
}

fn bench_upgrade(c: &mut Criterion) {
    let mut group = c.benchmark_group("upgrade");

    for size in [100i64, 1_000, 10_000] {
        let set = create_set(0, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &set, |b, set| {
            b.iter_batched(
                || set.clone(),
                |mut s| {
                    s.add(black_box(i64::MAX)).expect("wider value");
                    s
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");
    let set = create_set(0, 10_000);

    group.bench_function("hit", |b| b.iter(|| black_box(set.find(black_box(5_000)))));
    group.bench_function("miss", |b| b.iter(|| black_box(set.find(black_box(20_000)))));
    group.bench_function("wider_than_encoding", |b| {
        b.iter(|| black_box(set.find(black_box(i64::MAX))))
    });

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let set = create_set(0, 1_000);

    c.bench_function("remove_middle", |b| {
        b.iter_batched(
            || set.clone(),
            |mut s| {
                s.remove(black_box(500)).expect("member");
                s
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_iter_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter_full_scan");

    for size in [100i64, 1_000, 10_000, 100_000] {
        let set = create_set(0, size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &set, |b, set| {
            b.iter(|| {
                let sum: i64 = set.iter().sum();
                black_box(sum);
            });
        });
    }

    group.finish();
}

fn bench_iter_range_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter_range_scan");
    let set = create_set(0, 10_000);

    for range_size in [10i64, 100, 1_000, 5_000] {
        group.throughput(Throughput::Elements(range_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(range_size),
            &range_size,
            |b, &size| {
                b.iter(|| {
                    let sum: i64 = set.iter_range(0, size).sum();
                    black_box(sum);
                });
            },
        );
    }

    group.finish();
}

fn bench_blob(c: &mut Criterion) {
    let mut group = c.benchmark_group("blob");
    let set = create_set(i16::MAX as i64, 10_000);
    let blob = set.to_blob().expect("encode");

    group.throughput(Throughput::Bytes(blob.len() as u64));
    group.bench_function("encode", |b| b.iter(|| black_box(set.to_blob())));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(IntSet::from_blob(black_box(&blob))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_add_sequential,
    bench_add_random,
    bench_upgrade,
    bench_find,
    bench_remove,
    bench_iter_full_scan,
    bench_iter_range_scan,
    bench_blob,
);
criterion_main!(benches);
