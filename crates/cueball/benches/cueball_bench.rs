use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use cueball::{CueballOptions, CueballReader, CueballWriter};
use tempfile::tempdir;

const N_KEYS: u64 = 10_000;

fn options() -> CueballOptions {
    // 8-byte hashes, 16-byte values, 256 buckets.
    CueballOptions::new(8, 16, 8)
}

fn hash(i: u64) -> [u8; 8] {
    // Spread keys over buckets while keeping them strictly increasing.
    (i << 48).to_be_bytes()
}

fn write_file(path: &std::path::Path) {
    let mut w = CueballWriter::create(path, options()).unwrap();
    for i in 0..N_KEYS {
        w.write(&hash(i), &[0xabu8; 16]).unwrap();
    }
    w.close().unwrap();
}

fn cueball_write_benchmark(c: &mut Criterion) {
    c.bench_function("cueball_write_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let path = dir.path().join("bench.cueball");
                (dir, path)
            },
            |(_dir, path)| {
                write_file(&path);
            },
            BatchSize::SmallInput,
        );
    });
}

fn cueball_get_hit_benchmark(c: &mut Criterion) {
    c.bench_function("cueball_get_hit_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let path = dir.path().join("bench.cueball");
                write_file(&path);
                let reader = CueballReader::open(&path, options()).unwrap();
                (dir, reader)
            },
            |(_dir, reader)| {
                for i in 0..N_KEYS {
                    let g = reader.get(&hash(i)).unwrap();
                    assert!(g.found());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, cueball_write_benchmark, cueball_get_hit_benchmark);
criterion_main!(benches);
