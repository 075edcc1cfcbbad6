use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gzshard_core::{Compressor, Decompressor, PipelineConfig};

const INPUT_LEN: usize = 8 * 1024 * 1024;

fn sample_input() -> Vec<u8> {
    let words = b"lorem ipsum dolor sit amet consectetur adipiscing elit ";
    (0..INPUT_LEN)
        .map(|i| words[i % words.len()].wrapping_add((i / 4099) as u8))
        .collect()
}

fn bench_compress(c: &mut Criterion) {
    let input = sample_input();
    let mut group = c.benchmark_group("compress");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.sample_size(10);

    for workers in [1usize, 2, 4] {
        let config = PipelineConfig::default()
            .with_workers(workers)
            .with_block_size(256 * 1024);
        let compressor = Compressor::new(config);
        group.bench_with_input(BenchmarkId::new("workers", workers), &input, |b, input| {
            b.iter(|| {
                compressor
                    .compress_reader(black_box(&input[..]), Vec::with_capacity(input.len()))
                    .map(|outcome| outcome.writer.len())
            })
        });
    }
    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let input = sample_input();
    let container = match Compressor::new(PipelineConfig::default().with_workers(4))
        .compress_reader(&input[..], Vec::new())
    {
        Ok(outcome) => outcome.writer,
        Err(error) => panic!("bench setup failed: {error}"),
    };

    let mut group = c.benchmark_group("decompress");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.sample_size(10);
    group.bench_function("8mb", |b| {
        b.iter(|| {
            let mut restored = Vec::with_capacity(INPUT_LEN);
            Decompressor::new()
                .decompress_reader(Cursor::new(black_box(&container[..])), &mut restored)
                .map(|stats| stats.output_bytes)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
