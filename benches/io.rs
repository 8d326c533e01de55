use criterion::{black_box, criterion_group, criterion_main, Criterion};

use trs::{Trace, TraceSetReader, TraceSetWriter};

// Helper to create test data of different sizes
fn create_test_traces(trace_count: usize, sample_count: usize) -> Vec<Trace> {
    (0..trace_count)
        .map(|i| {
            let samples: Vec<f32> = (0..sample_count)
                .map(|j| ((i * 31 + j) % 509) as f32 * 0.25)
                .collect();
            Trace::from_samples(format!("trace {i:06}"), samples)
        })
        .collect()
}

fn bench_io(c: &mut Criterion) {
    let mut group = c.benchmark_group("io");
    let num_traces = 10_000;
    let num_samples = 1_000;
    let traces = create_test_traces(num_traces, num_samples);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.trs");

    // benchmark full-set writing
    group.bench_function("write", |b| {
        b.iter(|| {
            let mut writer = TraceSetWriter::create(&path).unwrap();
            for trace in &traces {
                writer.add(trace).unwrap();
            }
            writer.close().unwrap();
        });
    });

    // benchmark sequential decoding through the sliding window
    group.bench_function("sequential_read", |b| {
        trs::save(&path, &traces).unwrap();
        b.iter(|| {
            let mut reader = TraceSetReader::open(&path).unwrap();
            let mut total = 0.0f64;
            for result in reader.iter() {
                let trace = result.unwrap();
                total += trace.samples()[0] as f64;
            }
            assert_eq!(reader.len(), num_traces);
            black_box(total)
        });
    });

    // benchmark strided random access on one open reader
    group.bench_function("random_access", |b| {
        trs::save(&path, &traces).unwrap();
        let mut reader = TraceSetReader::open(&path).unwrap();
        let mut index = 0usize;
        b.iter(|| {
            index = (index * 7 + 13) % num_traces;
            black_box(reader.get(index).unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_io);
criterion_main!(benches);
