use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shardscan::{search, sequential_search, SearchConfig, SourceBytes};
use std::{fs::File, io::Write};
use tempfile::tempdir;

fn create_haystack(lines: usize) -> Vec<u8> {
    let mut haystack = Vec::new();
    for j in 0..lines {
        writeln!(
            haystack,
            "Line {} TODO: fix bug {} FIXME: optimize line {} NOTE: important task {}",
            j, j, j, j
        )
        .unwrap();
    }
    haystack
}

fn bench_worker_scaling(c: &mut Criterion) {
    let haystack = create_haystack(20_000);

    let mut group = c.benchmark_group("Worker Scaling");
    group.throughput(Throughput::Bytes(haystack.len() as u64));
    group.bench_function("sequential", |b| {
        b.iter(|| black_box(sequential_search(&haystack, b"TODO", 0).unwrap()));
    });
    for workers in [1, 2, 4, 8] {
        let config = SearchConfig::with_workers(workers).unwrap();
        group.bench_with_input(BenchmarkId::new("workers", workers), &config, |b, config| {
            b.iter(|| black_box(search(config, &haystack, b"TODO").unwrap()));
        });
    }
    group.finish();
}

fn bench_pattern_length(c: &mut Criterion) {
    let haystack = create_haystack(5_000);
    let config = SearchConfig::with_workers(4).unwrap();
    let patterns: [&[u8]; 4] = [
        b"T",
        b"TODO",
        b"FIXME: optimize",
        b"NOTE: important task 4999",
    ];

    let mut group = c.benchmark_group("Pattern Length");
    for pattern in patterns {
        group.bench_with_input(
            BenchmarkId::from_parameter(pattern.len()),
            &pattern,
            |b, pattern| {
                b.iter(|| black_box(search(&config, &haystack, pattern).unwrap()));
            },
        );
    }
    group.finish();
}

fn bench_mapped_file(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("haystack.txt");
    File::create(&path)
        .and_then(|mut file| file.write_all(&create_haystack(50_000)))
        .unwrap();

    let config = SearchConfig::with_workers(4).unwrap();
    let mut group = c.benchmark_group("Mapped File");
    group.bench_function("open_and_search", |b| {
        b.iter(|| {
            let source = SourceBytes::open(&path).unwrap();
            black_box(search(&config, &source, b"FIXME").unwrap());
        });
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_worker_scaling, bench_pattern_length, bench_mapped_file
}

criterion_main!(benches);
