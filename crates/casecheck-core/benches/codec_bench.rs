//! Case record encode/decode benchmarks.

use casecheck_core::{TestCase, decode_case, encode_case};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn case_with_stdout(size: usize) -> TestCase {
    TestCase::new(0, "cat --number -", "x".repeat(size), "warn\n", "y".repeat(size / 4))
}

fn bench_encode(c: &mut Criterion) {
    let sizes: &[usize] = &[0, 256, 4096, 65536, 1 << 20];
    let mut group = c.benchmark_group("encode_case");

    for &size in sizes {
        let case = case_with_stdout(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &case, |b, case| {
            b.iter(|| black_box(encode_case(case)));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let sizes: &[usize] = &[0, 256, 4096, 65536, 1 << 20];
    let mut group = c.benchmark_group("decode_case");

    for &size in sizes {
        let Ok(bytes) = encode_case(&case_with_stdout(size)) else {
            continue;
        };
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| black_box(decode_case(bytes)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
