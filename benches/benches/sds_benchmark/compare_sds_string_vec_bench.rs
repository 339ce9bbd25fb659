use std::{hint::black_box, time::Duration};

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use kvprim::{
    database::sds::{split_args, split_len},
    Sds,
};

fn make_ascii(size: usize) -> String {
    "a".repeat(size)
}

/// Дописывать фрагмент, пока длина не достигнет `target_len`.
fn append_to_target_string(
    s: &mut String,
    chunk: &str,
    target_len: usize,
) {
    while s.len() < target_len {
        s.push_str(chunk);
    }
}

fn append_to_target_vec(
    v: &mut Vec<u8>,
    chunk: &[u8],
    target_len: usize,
) {
    while v.len() < target_len {
        v.extend_from_slice(chunk);
    }
}

fn append_to_target_sds(
    s: &mut Sds,
    chunk: &[u8],
    target_len: usize,
) {
    while s.len() < target_len {
        s.cat_len(chunk).expect("append");
    }
}

pub fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("sds_vs_string_vec_append");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    let chunk = "0123456789abcdef";
    for target in [64usize, 1024, 64 * 1024, 2 * 1024 * 1024] {
        group.throughput(Throughput::Bytes(target as u64));
        let id = format!("{target}B");

        group.bench_with_input(BenchmarkId::new("String", &id), &target, |b, &t| {
            b.iter(|| {
                let mut s = String::new();
                append_to_target_string(&mut s, chunk, t);
                black_box(s);
            })
        });

        group.bench_with_input(BenchmarkId::new("Vec<u8>", &id), &target, |b, &t| {
            b.iter(|| {
                let mut v = Vec::new();
                append_to_target_vec(&mut v, chunk.as_bytes(), t);
                black_box(v);
            })
        });

        group.bench_with_input(BenchmarkId::new("Sds", &id), &target, |b, &t| {
            b.iter(|| {
                let mut s = Sds::empty();
                append_to_target_sds(&mut s, chunk.as_bytes(), t);
                black_box(s);
            })
        });
    }

    group.finish();
}

/// `trim` и `range` переиспользуют буфер, копируется только остаток.
pub fn bench_in_place_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("sds_in_place");
    let padded = format!("   {}   ", make_ascii(4096));
    let base = Sds::new(&padded);

    group.bench_function("trim", |b| {
        b.iter_batched(
            || base.dup(),
            |mut s| {
                s.trim(b" ");
                s
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("range_tail", |b| {
        b.iter_batched(
            || base.dup(),
            |mut s| {
                s.range(black_box(-100), black_box(-1));
                s
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("cpy_reuse", |b| {
        let mut s = base.dup();
        b.iter(|| {
            s.cpy_len(black_box(b"replacement")).expect("copy");
        })
    });

    group.finish();
}

pub fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("sds_split");

    let csv = (0..1_000)
        .map(|i| format!("field{i}"))
        .collect::<Vec<_>>()
        .join("::");
    group.throughput(Throughput::Bytes(csv.len() as u64));
    group.bench_function("split_len", |b| {
        b.iter(|| black_box(split_len(black_box(csv.as_bytes()), b"::")))
    });

    let line = r#"SET "user:1000 profile" '{"name": "x"}' EX 3600 "\x00\xff\n""#;
    group.bench_function("split_args", |b| {
        b.iter(|| black_box(split_args(black_box(line.as_bytes()))))
    });

    group.finish();
}

criterion_group!(benches, bench_append, bench_in_place_edits, bench_split);
criterion_main!(benches);
