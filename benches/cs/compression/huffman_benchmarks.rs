use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use huffcodec::compression::huffman::{
    build_frequency_table, build_huffman_tree, huffman_decode, huffman_encode, PackedPayload,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_text(len: usize) -> String {
    let mut rng = StdRng::seed_from_u64(42);
    (0..len)
        .map(|_| {
            // Skewed towards lowercase letters so code lengths vary.
            let x: f64 = rng.gen();
            (b' ' + (x * x * 95.0) as u8) as char
        })
        .collect()
}

fn bench_tree_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("huffman_tree");
    for size in [1_000, 100_000] {
        let text = generate_text(size);
        let freq = build_frequency_table(&text).unwrap();
        group.bench_with_input(BenchmarkId::new("frequency_table", size), &text, |b, t| {
            b.iter(|| build_frequency_table(black_box(t)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("build_tree", size), &freq, |b, f| {
            b.iter(|| build_huffman_tree(black_box(f)).unwrap())
        });
    }
    group.finish();
}

fn bench_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("huffman_codec");
    for size in [1_000, 100_000] {
        let text = generate_text(size);
        let (bits, tree) = huffman_encode(&text).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &text, |b, t| {
            b.iter(|| huffman_encode(black_box(t)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &bits, |b, bits| {
            b.iter(|| huffman_decode(black_box(bits), &tree).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("pack", size), &bits, |b, bits| {
            b.iter(|| {
                PackedPayload::pack(black_box(bits), tree.clone())
                    .unwrap()
                    .to_bytes()
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tree_construction, bench_encode_decode);
criterion_main!(benches);
