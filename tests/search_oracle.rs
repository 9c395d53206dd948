use std::collections::BTreeSet;

use seedmm_rust::index::ReferenceIndex;
use seedmm_rust::search::arena::Arenas;
use seedmm_rust::search::budget::BacktrackBudget;
use seedmm_rust::search::driver::RangeSourceDriver;
use seedmm_rust::search::pin::{PinEdge, PinPolicy};
use seedmm_rust::search::read::{PreparedRead, ReadSet};
use seedmm_rust::search::source::{Anchor, ElementarySearch, SourceParams};
use seedmm_rust::search::strategy::Strategy;
use seedmm_rust::search::{
    AlignerFactory, CollectSink, MatchResolver, Mate, RangeCaches, Read, ResolvedMatch,
    SearchDriver, SearchEnv, SeedConfig, Strand, UnpairedAlignerFactory,
};
use seedmm_rust::util::dna;

fn random_seq(len: usize, seed: u32) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut x = seed;
    (0..len)
        .map(|_| {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            bases[(x >> 16) as usize % 4]
        })
        .collect()
}

fn substitute(read: &mut [u8], offsets: &[usize]) {
    for &i in offsets {
        read[i] = match read[i] {
            b'A' => b'G',
            b'C' => b'T',
            b'G' => b'A',
            _ => b'C',
        };
    }
}

/// 穷举所有起点与两条链，按与搜索相同的规则判定
fn oracle(reference: &[u8], read: &Read, cfg: &SeedConfig) -> BTreeSet<(u32, Strand)> {
    let pr = PreparedRead::new(read, cfg.maq_penalty);
    let refc = dna::encode(reference);
    let l = pr.len();
    let mut out = BTreeSet::new();
    for strand in Strand::BOTH {
        if (strand == Strand::Forward && !cfg.do_fw) || (strand == Strand::Reverse && !cfg.do_rc) {
            continue;
        }
        let pat = pr.pattern(strand);
        let pens = pr.penalties(strand);
        let seed = pr.seed_span(strand, cfg.seed_len);
        for off in 0..=refc.len() - l {
            let mut seed_mms = 0;
            let mut penalty = 0;
            let mut ok = true;
            for i in 0..l {
                if !dna::is_base(refc[off + i]) {
                    ok = false;
                } else if pat[i] != refc[off + i] {
                    penalty += pens[i];
                    if seed.contains(&i) {
                        seed_mms += 1;
                    }
                }
            }
            if ok && seed_mms <= cfg.seed_mms && penalty <= cfg.qual_cutoff {
                out.insert((off as u32, strand));
            }
        }
    }
    out
}

fn search(index: &ReferenceIndex, cfg: SeedConfig, read: &Read) -> Vec<ResolvedMatch> {
    let factory = UnpairedAlignerFactory::new(index, cfg).expect("factory");
    let mut aligner = factory.create();
    let mut sink = CollectSink::new();
    aligner.align(read, &mut sink).expect("align");
    sink.hits
}

fn assert_matches_oracle(reference: &[u8], cfg: SeedConfig, read: &Read) {
    let index = ReferenceIndex::build(&[("chr".to_string(), reference.to_vec())], 8, 4)
        .expect("index");
    let hits = search(&index, cfg.clone(), read);
    let found: BTreeSet<(u32, Strand)> = hits.iter().map(|h| (h.offset, h.strand)).collect();
    assert_eq!(found.len(), hits.len(), "duplicate hit reported for {}", read.name);
    assert_eq!(found, oracle(reference, read, &cfg), "read {}", read.name);
}

fn complete_cfg(seed_mms: u8) -> SeedConfig {
    SeedConfig { seed_mms, seed_len: 12, max_bts: 1_000_000, ..SeedConfig::default() }
}

#[test]
fn exact_scenario() {
    let index = ReferenceIndex::build(&[("ref".to_string(), b"ACGTACGTAA".to_vec())], 4, 2)
        .expect("index");
    let cfg = SeedConfig { seed_mms: 0, ..SeedConfig::default() };
    let hits = search(&index, cfg, &Read::with_uniform_quality("r", b"ACGTACGTAA", b'I'));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].offset, 0);
    assert!(hits[0].edits.is_empty());
}

#[test]
fn one_substitution_scenario() {
    let index = ReferenceIndex::build(&[("ref".to_string(), b"ACGTACGTAA".to_vec())], 4, 2)
        .expect("index");
    let cfg = SeedConfig { seed_mms: 1, ..SeedConfig::default() };
    let hits = search(&index, cfg.clone(), &Read::with_uniform_quality("r", b"ACGTACCTAA", b'I'));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].offset, 0);
    assert_eq!(hits[0].edits.len(), 1);
    assert_eq!(hits[0].edits[0].pos, 6);
    assert_eq!(hits[0].edits[0].ref_code, dna::to_alphabet(b'G'));

    let two = search(&index, cfg, &Read::with_uniform_quality("r", b"ACTTACCTAA", b'I'));
    assert!(two.is_empty());
}

#[test]
fn zero_mismatch_matches_oracle() {
    let reference = random_seq(400, 7);
    for start in [0usize, 57, 211, 380] {
        let mut seq = reference[start..start + 20].to_vec();
        let exact = Read::with_uniform_quality("exact", &seq, b'I');
        assert_matches_oracle(&reference, complete_cfg(0), &exact);
        substitute(&mut seq, &[15]);
        let tail = Read::with_uniform_quality("tail", &seq, b'I');
        assert_matches_oracle(&reference, complete_cfg(0), &tail);
    }
}

#[test]
fn one_mismatch_in_either_half_matches_oracle() {
    let reference = random_seq(500, 11);
    let cases = [(10usize, vec![1usize]), (100, vec![8]), (250, vec![5]), (400, vec![11, 17])];
    for (start, offsets) in cases {
        let mut seq = reference[start..start + 24].to_vec();
        substitute(&mut seq, &offsets);
        let read = Read::with_uniform_quality(format!("fw{}", start), &seq, b'5');
        assert_matches_oracle(&reference, complete_cfg(1), &read);
        let rc = Read::with_uniform_quality(format!("rc{}", start), &dna::revcomp(&seq), b'5');
        assert_matches_oracle(&reference, complete_cfg(1), &rc);
    }
}

#[test]
fn two_and_three_mismatches_match_oracle() {
    let reference = random_seq(600, 23);
    let cases: [(u8, usize, &[usize]); 6] = [
        (2, 30, &[0, 1]),
        (2, 120, &[2, 9]),
        (2, 333, &[7, 10]),
        (3, 50, &[0, 3, 5]),
        (3, 222, &[1, 7, 11]),
        (3, 444, &[6, 8, 10]),
    ];
    for (mms, start, offsets) in cases {
        let mut seq = reference[start..start + 24].to_vec();
        substitute(&mut seq, offsets);
        let read = Read::with_uniform_quality(format!("m{}_{}", mms, start), &seq, b'5');
        assert_matches_oracle(&reference, complete_cfg(mms), &read);
        let rc_seq = dna::revcomp(&seq);
        let rc = Read::with_uniform_quality(format!("m{}_{}_rc", mms, start), &rc_seq, b'5');
        assert_matches_oracle(&reference, complete_cfg(mms), &rc);
    }
}

#[test]
fn origin_is_always_reported_for_injected_substitutions() {
    let reference = random_seq(800, 5);
    let index = ReferenceIndex::build(&[("chr".to_string(), reference.clone())], 16, 8)
        .expect("index");
    for mms in 0..=3u8 {
        for k in 0..8usize {
            let start = 37 + k * 90;
            let mut seq = reference[start..start + 30].to_vec();
            let offsets: Vec<usize> = (0..mms as usize).map(|j| (k * 3 + j * 4) % 12).collect();
            substitute(&mut seq, &offsets);
            let read = Read::with_uniform_quality("r", &seq, b'5');
            let hits = search(&index, complete_cfg(mms), &read);
            assert!(
                hits.iter().any(|h| h.offset == start as u32 && h.strand == Strand::Forward),
                "{} mismatch(es) at {:?} not found from {}",
                mms,
                offsets,
                start
            );
        }
    }
}

#[test]
fn hits_come_out_in_cost_order() {
    // 同一 12-mer 出现三次，其中两处带一个种子错配
    let unit = b"ACGTTGCAGGCA";
    let mut reference = random_seq(60, 3);
    reference.extend_from_slice(unit);
    reference.extend(random_seq(40, 4));
    let mut one = unit.to_vec();
    substitute(&mut one, &[2]);
    reference.extend_from_slice(&one);
    reference.extend(random_seq(40, 9));
    let mut other = unit.to_vec();
    substitute(&mut other, &[9]);
    reference.extend_from_slice(&other);
    let index = ReferenceIndex::build(&[("chr".to_string(), reference)], 8, 4).expect("index");
    let hits = search(&index, complete_cfg(1), &Read::with_uniform_quality("r", unit, b'5'));
    let mms: Vec<usize> = hits.iter().map(|h| h.edits.len()).collect();
    assert!(mms.len() >= 3);
    assert!(mms.windows(2).all(|w| w[0] <= w[1]), "{:?}", mms);
    assert_eq!(mms[0], 0);
}

#[test]
fn exact_driver_never_allocates_edits() {
    let reference = random_seq(300, 17);
    let index = ReferenceIndex::build(&[("chr".to_string(), reference.clone())], 8, 4)
        .expect("index");
    let strategy = Strategy::for_mismatches(0).expect("table");
    assert_eq!(strategy.cells.len(), 1);

    // 读段与种子等长，种子外不存在可替换的位置
    let mut reads = ReadSet::default();
    let read = Read::with_uniform_quality("r", &reference[100..120], b'I');
    reads.set(Mate::One, PreparedRead::new(&read, true));
    let mut arenas = Arenas::new(1 << 12);
    let cfg = SeedConfig { seed_mms: 0, seed_len: 20, ..SeedConfig::default() };
    let budget = BacktrackBudget::new(cfg.max_bts);
    let mut driver = strategy.assemble(&cfg, Mate::One, Strand::Forward, &budget);
    let mut env =
        SearchEnv { index: &index, reads: &reads, arenas: &mut arenas, seed_len: cfg.seed_len };
    driver.start(&mut env);
    let mut ranges = 0;
    while let Some(r) = driver.next_range(&mut env) {
        assert!(r.edits.is_empty());
        ranges += 1;
    }
    assert_eq!(ranges, 1);
    assert!(arenas.edits.is_empty());
}

#[test]
fn budget_is_monotone_and_stops_the_search() {
    // 零罚分读段：质量上限不起作用，回溯点只受预算约束
    let reference = random_seq(400, 13);
    let index = ReferenceIndex::build(&[("chr".to_string(), reference.clone())], 8, 4)
        .expect("index");
    let mut reads = ReadSet::default();
    let read = Read::with_uniform_quality("r", &reference[200..220], b'!');
    reads.set(Mate::One, PreparedRead::new(&read, true));
    let mut arenas = Arenas::new(1 << 16);

    let budget = BacktrackBudget::new(20);
    let params = SourceParams {
        strand: Strand::Forward,
        mate: Mate::One,
        anchor: Anchor::SeedEnd,
        report_exacts: true,
        half_and_half: false,
        qual_cutoff: 1_000,
        qual_order: true,
    };
    let src = ElementarySearch::new(params, Some(budget.share()));
    let pins = PinPolicy::new(
        PinEdge::Beginning,
        PinEdge::Beginning,
        PinEdge::Beginning,
        PinEdge::SeedEdge,
    );
    let mut driver = RangeSourceDriver::new(src, pins, true);
    let mut env = SearchEnv { index: &index, reads: &reads, arenas: &mut arenas, seed_len: 12 };
    driver.start(&mut env);

    let mut last = budget.remaining();
    let mut steps = 0;
    while !driver.is_done() {
        driver.advance(&mut env);
        let now = budget.remaining();
        assert!(now <= last);
        last = now;
        steps += 1;
        assert!(steps < 100_000);
    }
    assert_eq!(budget.remaining(), 0);
    assert!(driver.advance(&mut env).is_none());
}

#[test]
fn truncated_search_reports_a_subset() {
    let reference = random_seq(600, 41);
    let read = Read::with_uniform_quality("r", &reference[100..120], b'5');
    let index = ReferenceIndex::build(&[("chr".to_string(), reference.clone())], 8, 4)
        .expect("index");
    let cfg = SeedConfig { seed_mms: 2, seed_len: 12, max_bts: 4, ..SeedConfig::default() };
    let factory = UnpairedAlignerFactory::new(&index, cfg.clone()).expect("factory");
    let mut aligner = factory.create();
    let mut sink = CollectSink::new();
    let outcome = aligner.align(&read, &mut sink).expect("align");
    assert!(outcome.budget_exhausted);
    let expected = oracle(&reference, &read, &cfg);
    assert!(sink.hits.iter().all(|h| expected.contains(&(h.offset, h.strand))));
}

#[test]
fn resolving_twice_is_idempotent_and_walk_free() {
    let reference = random_seq(300, 29);
    let index = ReferenceIndex::build(&[("chr".to_string(), reference.clone())], 8, 16)
        .expect("index");
    let mut reads = ReadSet::default();
    let read = Read::with_uniform_quality("r", &reference[40..56], b'I');
    reads.set(Mate::One, PreparedRead::new(&read, true));
    let mut arenas = Arenas::new(1 << 12);
    let cfg = SeedConfig { seed_mms: 0, seed_len: 16, ..SeedConfig::default() };
    let budget = BacktrackBudget::new(cfg.max_bts);
    let table = Strategy::for_mismatches(0).expect("table");
    let mut driver = table.assemble(&cfg, Mate::One, Strand::Forward, &budget);
    let mut env =
        SearchEnv { index: &index, reads: &reads, arenas: &mut arenas, seed_len: cfg.seed_len };
    driver.start(&mut env);
    let range = driver.next_range(&mut env).expect("range");

    let mut resolver = MatchResolver::new(RangeCaches::new(8), false);
    let first = resolver.locate(&index, &range).expect("first");
    let walks = resolver.walks();
    let second = resolver.locate(&index, &range).expect("second");
    assert_eq!(first, second);
    assert_eq!(resolver.walks(), walks);
    assert_eq!(first[0].offset, 40);
}

#[test]
fn tiny_arena_truncates_without_failing() {
    let reference = random_seq(2_000, 31);
    let index = ReferenceIndex::build(&[("chr".to_string(), reference.clone())], 8, 4)
        .expect("index");
    let cfg = SeedConfig {
        seed_mms: 3,
        seed_len: 16,
        max_bts: 1_000_000,
        pool_capacity: 8,
        ..SeedConfig::default()
    };
    let factory = UnpairedAlignerFactory::new(&index, cfg).expect("factory");
    let mut aligner = factory.create();
    let mut sink = CollectSink::new();
    let mut seq = reference[500..530].to_vec();
    substitute(&mut seq, &[1, 4, 9]);
    let outcome = aligner.align(&Read::with_uniform_quality("r", &seq, b'5'), &mut sink)
        .expect("align");
    assert!(outcome.arena_exhausted);
}
