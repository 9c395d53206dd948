use criterion::{black_box, criterion_group, criterion_main, Criterion};

use seedmm_rust::index::{sa, IndexSide, ReferenceIndex, SearchIndex};
use seedmm_rust::search::{
    AlignerFactory, CollectSink, Cost, MatchResolver, Mate, Range, RangeCaches, Read, SeedConfig,
    Strand,
    UnpairedAlignerFactory,
};
use seedmm_rust::util::dna;

fn make_reference(len: usize) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut x: u32 = 42;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    seq
}

fn build_index(seq: &[u8]) -> ReferenceIndex {
    ReferenceIndex::build(&[("bench".to_string(), seq.to_vec())], 64, 16).expect("index")
}

/// 在给定偏移处替换为另一个碱基
fn mutate(read: &[u8], offsets: &[usize]) -> Vec<u8> {
    let mut out = read.to_vec();
    for &i in offsets {
        out[i] = match out[i] {
            b'A' => b'C',
            b'C' => b'G',
            b'G' => b'T',
            _ => b'A',
        };
    }
    out
}

fn bench_search(c: &mut Criterion, name: &str, seed_mms: u8, edits: &[usize]) {
    let reference = make_reference(20_000);
    let index = build_index(&reference);
    let cfg = SeedConfig { seed_mms, ..SeedConfig::default() };
    let factory = UnpairedAlignerFactory::new(&index, cfg).expect("factory");
    let mut aligner = factory.create();
    let read = Read::with_uniform_quality("bench", &mutate(&reference[5_000..5_036], edits), b'I');
    let mut sink = CollectSink::new();

    c.bench_function(name, |b| {
        b.iter(|| {
            sink.clear();
            black_box(aligner.align(black_box(&read), &mut sink).expect("align"));
        })
    });
}

fn bench_exact_36bp(c: &mut Criterion) {
    bench_search(c, "search_0mm_36bp", 0, &[]);
}

fn bench_one_mismatch_36bp(c: &mut Criterion) {
    bench_search(c, "search_1mm_36bp", 1, &[3]);
}

fn bench_two_mismatches_36bp(c: &mut Criterion) {
    bench_search(c, "search_2mm_36bp", 2, &[2, 20]);
}

fn bench_cached_resolution(c: &mut Criterion) {
    let reference = make_reference(20_000);
    let index = build_index(&reference);
    let codes = dna::encode(&reference[1_000..1_008]);
    let (mut top, mut bot) = index.full_range(IndexSide::Forward);
    for &code in codes.iter().rev() {
        (top, bot) = index.backward_step(IndexSide::Forward, code, top, bot);
    }
    let range = Range {
        top,
        bot,
        side: IndexSide::Forward,
        strand: Strand::Forward,
        mate: Mate::One,
        len: codes.len(),
        edits: Vec::new(),
        cost: Cost::default(),
        penalty: 0,
    };
    let mut resolver = MatchResolver::new(RangeCaches::new(64), false);

    c.bench_function("locate_8bp_cached", |b| {
        b.iter(|| {
            black_box(resolver.locate(&index, black_box(&range)).expect("locate"));
        })
    });
}

fn bench_build_sa(c: &mut Criterion) {
    let reference = make_reference(10_000);
    let text: Vec<u8> = dna::encode(&reference).into_iter().chain(std::iter::once(0u8)).collect();

    c.bench_function("build_sa_10k", |b| {
        b.iter(|| {
            black_box(sa::build_sa(black_box(&text)));
        })
    });
}

criterion_group!(
    benches,
    bench_exact_36bp,
    bench_one_mismatch_36bp,
    bench_two_mismatches_36bp,
    bench_cached_resolution,
    bench_build_sa
);
criterion_main!(benches);
