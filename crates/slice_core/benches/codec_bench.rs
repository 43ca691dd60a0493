//! Criterion benchmarks for encoding, decoding and verifying slices.
//!
//! Run with: cargo bench -p slice_core

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use slice_core::{
    encode_batch, verify_batch, verify_slice, BatchView, ByteSlice, DoubleSlice, Slice,
    SliceKind, SliceView, StringSlice, VerifierOptions,
};

fn bench_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_slice");
    group.throughput(Throughput::Elements(1));

    let double = DoubleSlice::new(7, 0.5);
    group.bench_function("encode_double", |b| {
        b.iter(|| black_box(&double).encode().unwrap());
    });

    let bytes = double.encode().unwrap();
    group.bench_function("decode_double", |b| {
        b.iter(|| DoubleSlice::decode(black_box(&bytes)).unwrap());
    });

    let text = StringSlice::new(1, "the quick brown fox".to_string());
    let text_bytes = text.encode().unwrap();
    group.bench_function("encode_string", |b| {
        b.iter(|| black_box(&text).encode().unwrap());
    });
    group.bench_function("verify_string", |b| {
        let options = VerifierOptions::default();
        b.iter(|| verify_slice(SliceKind::StringSlice, black_box(&text_bytes), &options).unwrap());
    });

    // zero-copy access against the owned copy
    let blob = ByteSlice::new(3, vec![0xab; 4096]).encode().unwrap();
    group.bench_function("view_bytes", |b| {
        b.iter(|| {
            let view = SliceView::<slice_core::record::Bytes>::root(black_box(&blob)).unwrap();
            black_box(view.value_bytes().unwrap().len())
        });
    });
    group.bench_function("copy_bytes", |b| {
        b.iter(|| black_box(ByteSlice::decode(black_box(&blob)).unwrap().value.len()));
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");

    for batch_size in [10, 100, 1000].iter() {
        let slices = (0..*batch_size)
            .map(|i| match i % 3 {
                0 => DoubleSlice::new(i, i as f64).into(),
                1 => StringSlice::new(i, format!("slice {}", i)).into(),
                _ => ByteSlice::new(i, vec![i as u8; 16]).into(),
            })
            .collect::<Vec<Slice>>();
        let bytes = encode_batch(&slices).unwrap();

        group.throughput(Throughput::Elements(*batch_size));
        group.bench_function(format!("encode_{}", batch_size), |b| {
            b.iter(|| encode_batch(black_box(&slices)).unwrap());
        });
        group.bench_function(format!("decode_{}", batch_size), |b| {
            b.iter(|| BatchView::root(black_box(&bytes)).unwrap().to_vec().unwrap());
        });
        group.bench_function(format!("verify_{}", batch_size), |b| {
            let options = VerifierOptions::default();
            b.iter(|| verify_batch(black_box(&bytes), &options).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single, bench_batch);
criterion_main!(benches);
