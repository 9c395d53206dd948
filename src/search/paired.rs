//! 双端比对：四个 (mate × 链) 搜索图加协调步骤。
//!
//! 协调规则：
//! - 两个 mate 各自保存最多 `sym_ceil` 个命中，每来一个新命中就与另一 mate
//!   已保存的命中逐个配对；
//! - 某 mate 的命中数超过 `mixed_thresh`（且另一 mate 不是重复的）时，它被标为重复：
//!   它自己的搜索图继续运行，每个命中（包括此前保存的）都作为锚点在参考窗口里
//!   直接扫描另一 mate；另一 mate 的索引搜索暂停；
//! - 每对读段最多扫描 `mixed_attempt_lim` 次，用完后另一 mate 恢复索引搜索；
//! - `dont_reconcile` 时两个 mate 互不相干，各自报告。

use std::collections::HashSet;

use super::arena::Arenas;
use super::budget::BacktrackBudget;
use super::config::PairedConfig;
use super::cost_aware::CostAwareSearchDriver;
use super::driver::{SearchDriver, SearchEnv};
use super::error::{ConfigError, SearchError};
use super::range::{Cost, ResolvedMatch};
use super::read::{Mate, PreparedRead, Read, ReadSet, Strand};
use super::refaligner::{RefAligner, Window};
use super::resolve::{MatchResolver, RangeCaches};
use super::sink::HitSink;
use super::strategy::Strategy;
use super::unpaired::{PairOutcome, ReadOutcome};
use super::AlignerFactory;
use crate::index::{ReferenceBases, SearchIndex};

const MATES: [Mate; 2] = [Mate::One, Mate::Two];

/// 配对几何：方向、上下游与片段长度窗口
#[derive(Debug, Clone, Copy)]
pub struct PairGeometry {
    mate_fw: [bool; 2],
    pe_inner: u32,
    pe_outer: u32,
}

impl PairGeometry {
    pub fn new(cfg: &PairedConfig) -> Self {
        Self {
            mate_fw: [cfg.mate1_fw, cfg.mate2_fw],
            pe_inner: cfg.pe_inner,
            pe_outer: cfg.pe_outer,
        }
    }

    /// 片段来自正链时该 mate 的方向
    fn fw_strand(&self, mate: Mate) -> Strand {
        Strand::from_fw(self.mate_fw[mate.index()])
    }

    /// 命中所在片段是否为正链片段（此时 mate1 在上游）
    fn forward_fragment(&self, mate: Mate, strand: Strand) -> bool {
        strand == self.fw_strand(mate)
    }

    /// 两个命中能否构成协调的一对
    pub fn concordant(&self, m1: &ResolvedMatch, m2: &ResolvedMatch) -> bool {
        if m1.contig != m2.contig {
            return false;
        }
        let fwd = self.forward_fragment(Mate::One, m1.strand);
        if fwd != self.forward_fragment(Mate::Two, m2.strand) {
            return false;
        }
        let (up, down) = if fwd { (m1, m2) } else { (m2, m1) };
        if up.offset > down.offset {
            return false;
        }
        let frag = up.end().max(down.end()) - up.offset;
        (self.pe_inner..=self.pe_outer).contains(&frag)
    }

    /// 以 `anchor` 为锚点时另一 mate 的链与可能的参考窗口
    pub fn partner_window(
        &self,
        anchor: &ResolvedMatch,
        mate: Mate,
        partner_len: u32,
    ) -> (Strand, Window) {
        let fwd = self.forward_fragment(mate, anchor.strand);
        let other = mate.other();
        let strand = if fwd { self.fw_strand(other) } else { self.fw_strand(other).flip() };
        let anchor_upstream = (mate == Mate::One) == fwd;
        let win = if anchor_upstream {
            Window {
                contig: anchor.contig,
                begin: anchor.offset,
                end: anchor.offset.saturating_add(self.pe_outer),
            }
        } else {
            Window {
                contig: anchor.contig,
                begin: anchor.end().saturating_sub(self.pe_outer),
                end: anchor.offset.saturating_add(partner_len),
            }
        };
        (strand, win)
    }
}

pub struct PairedAlignerFactory<'a, I>
where
    I: SearchIndex + ReferenceBases,
{
    index: &'a I,
    cfg: PairedConfig,
    strategy: Strategy,
    caches: Option<RangeCaches>,
}

impl<'a, I> PairedAlignerFactory<'a, I>
where
    I: SearchIndex + ReferenceBases,
{
    pub fn new(index: &'a I, cfg: PairedConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        if !index.is_ready() {
            return Err(ConfigError::IndexNotReady);
        }
        let strategy = Strategy::for_mismatches(cfg.seed.seed_mms)?;
        let on = cfg.mate_strands();
        log::info!(
            "paired search: {} seed mismatch(es), graphs m1=[{}, {}] m2=[{}, {}], window {}..={}",
            cfg.seed.seed_mms,
            on[0][0],
            on[0][1],
            on[1][0],
            on[1][1],
            cfg.pe_inner,
            cfg.pe_outer
        );
        Ok(Self { index, cfg, strategy, caches: None })
    }

    pub fn with_shared_caches(mut self, caches: RangeCaches) -> Self {
        self.caches = Some(caches);
        self
    }

    pub fn config(&self) -> &PairedConfig {
        &self.cfg
    }
}

impl<'a, I> AlignerFactory for PairedAlignerFactory<'a, I>
where
    I: SearchIndex + ReferenceBases,
{
    type Aligner = PairedAligner<'a, I>;

    fn create(&self) -> Self::Aligner {
        let seed = &self.cfg.seed;
        let budget = BacktrackBudget::new(seed.max_bts);
        let on = self.cfg.mate_strands();
        let graphs = MATES.map(|m| {
            Strand::BOTH.map(|s| {
                on[m.index()][s.index()].then(|| self.strategy.assemble(seed, m, s, &budget))
            })
        });
        let caches = self.caches.clone().unwrap_or_else(|| RangeCaches::new(seed.cache_limit));
        PairedAligner {
            index: self.index,
            cfg: self.cfg.clone(),
            geometry: PairGeometry::new(&self.cfg),
            uses_budget: self.strategy.uses_budget,
            graphs,
            resolver: MatchResolver::new(caches, true),
            arenas: Arenas::new(seed.pool_capacity),
            budget,
            reads: ReadSet::default(),
            ref_aligner: RefAligner::new(seed),
        }
    }
}

/// 一对读段的协调状态
#[derive(Default)]
struct PairState {
    hits: [Vec<ResolvedMatch>; 2],
    counts: [u32; 2],
    repetitive: [bool; 2],
    stopped: [bool; 2],
    scans: u32,
    pairs: HashSet<(usize, u32, Strand, usize, u32, Strand)>,
    paired: bool,
    halted: bool,
}

pub struct PairedAligner<'a, I>
where
    I: SearchIndex + ReferenceBases,
{
    index: &'a I,
    cfg: PairedConfig,
    geometry: PairGeometry,
    uses_budget: bool,
    graphs: [[Option<CostAwareSearchDriver>; 2]; 2],
    resolver: MatchResolver,
    arenas: Arenas,
    budget: BacktrackBudget,
    reads: ReadSet,
    ref_aligner: RefAligner,
}

impl<I> PairedAligner<'_, I>
where
    I: SearchIndex + ReferenceBases,
{
    pub fn align<S: HitSink + ?Sized>(
        &mut self,
        mate1: &Read,
        mate2: &Read,
        sink: &mut S,
    ) -> Result<ReadOutcome, SearchError> {
        self.arenas.reset();
        self.budget.reset();
        self.resolver.reset();
        self.reads.clear();
        let maq = self.cfg.seed.maq_penalty;
        self.reads.set(Mate::One, PreparedRead::new(mate1, maq));
        self.reads.set(Mate::Two, PreparedRead::new(mate2, maq));
        sink.begin_read();

        {
            let mut env = SearchEnv {
                index: self.index,
                reads: &self.reads,
                arenas: &mut self.arenas,
                seed_len: self.cfg.seed.seed_len,
            };
            for g in self.graphs.iter_mut().flatten().flatten() {
                g.start(&mut env);
            }
        }

        let mut outcome = ReadOutcome::default();
        let mut st = PairState::default();
        while let Some((m, s)) = self.pick(&st) {
            let range = {
                let mut env = SearchEnv {
                    index: self.index,
                    reads: &self.reads,
                    arenas: &mut self.arenas,
                    seed_len: self.cfg.seed.seed_len,
                };
                self.graphs[m.index()][s.index()].as_mut().and_then(|g| g.advance(&mut env))
            };
            let Some(range) = range else { continue };
            outcome.ranges += 1;
            for row in range.top..range.bot {
                let Some(hit) = self.resolver.resolve_row(self.index, &range, row)? else {
                    continue;
                };
                for g in self.graphs[m.index()].iter_mut().flatten() {
                    g.note_reported(hit.strand);
                }
                self.on_hit(m, hit, &mut st, &mut outcome, sink);
                if st.halted {
                    break;
                }
            }
            if st.halted {
                break;
            }
        }

        if self.cfg.dont_reconcile {
            outcome.pair = PairOutcome::Independent;
        } else if st.paired {
            outcome.pair = PairOutcome::Concordant;
        } else {
            outcome.pair = PairOutcome::NoPair;
            if self.cfg.fallback_unpaired && !st.halted {
                for m in MATES {
                    if let Some(h) = st.hits[m.index()].first() {
                        outcome.reported += 1;
                        outcome.pair = PairOutcome::Fallback;
                        if !sink.report(h) {
                            break;
                        }
                    }
                }
            }
        }
        outcome.scans = st.scans as usize;
        outcome.budget_exhausted = self.uses_budget && self.budget.exhausted();
        outcome.arena_exhausted = self.arenas.exhausted();
        log::debug!(
            "pair {}/{}: {:?}, hits m1={} m2={}",
            mate1.name,
            mate2.name,
            outcome.pair,
            st.counts[0],
            st.counts[1]
        );
        Ok(outcome)
    }

    /// 代价下界最小且仍在搜索的图；同代价按 mate1 正、mate1 反、mate2 正、mate2 反
    fn pick(&self, st: &PairState) -> Option<(Mate, Strand)> {
        let mut best: Option<(Cost, Mate, Strand)> = None;
        for m in MATES {
            if st.stopped[m.index()] {
                continue;
            }
            for s in Strand::BOTH {
                let Some(g) = &self.graphs[m.index()][s.index()] else { continue };
                if let Some(c) = g.min_cost() {
                    if best.map_or(true, |(b, ..)| c < b) {
                        best = Some((c, m, s));
                    }
                }
            }
        }
        best.map(|(_, m, s)| (m, s))
    }

    fn on_hit<S: HitSink + ?Sized>(
        &mut self,
        mate: Mate,
        hit: ResolvedMatch,
        st: &mut PairState,
        outcome: &mut ReadOutcome,
        sink: &mut S,
    ) {
        if self.cfg.dont_reconcile {
            outcome.reported += 1;
            st.halted = !sink.report(&hit);
            return;
        }

        let mi = mate.index();
        st.counts[mi] += 1;
        self.pair_with_stored(mate, &hit, st, outcome, sink);
        if st.halted {
            return;
        }
        let stored = st.hits[mi].len() < self.cfg.sym_ceil as usize;
        if stored {
            st.hits[mi].push(hit.clone());
        }

        if st.repetitive[mi] {
            self.scan_partners(mate, &hit, st, outcome, sink);
        } else if st.counts[mi] > self.cfg.mixed_thresh && !st.repetitive[1 - mi] {
            st.repetitive[mi] = true;
            st.stopped[1 - mi] = true;
            log::debug!(
                "{:?} is repetitive ({} hits), scanning for its partner",
                mate,
                st.counts[mi]
            );
            let mut anchors = st.hits[mi].clone();
            if !stored {
                anchors.push(hit);
            }
            for anchor in &anchors {
                self.scan_partners(mate, anchor, st, outcome, sink);
                if st.halted || st.scans >= self.cfg.mixed_attempt_lim {
                    break;
                }
            }
        }
    }

    /// 与另一 mate 已保存的命中逐个配对
    fn pair_with_stored<S: HitSink + ?Sized>(
        &self,
        mate: Mate,
        hit: &ResolvedMatch,
        st: &mut PairState,
        outcome: &mut ReadOutcome,
        sink: &mut S,
    ) {
        let partners: Vec<ResolvedMatch> = st.hits[1 - mate.index()]
            .iter()
            .filter(|o| self.concordant_as(mate, hit, o))
            .cloned()
            .collect();
        for other in &partners {
            self.report_pair(mate, hit, other, st, outcome, sink);
            if st.halted {
                return;
            }
        }
    }

    fn concordant_as(&self, mate: Mate, hit: &ResolvedMatch, other: &ResolvedMatch) -> bool {
        match mate {
            Mate::One => self.geometry.concordant(hit, other),
            Mate::Two => self.geometry.concordant(other, hit),
        }
    }

    fn report_pair<S: HitSink + ?Sized>(
        &self,
        mate: Mate,
        hit: &ResolvedMatch,
        other: &ResolvedMatch,
        st: &mut PairState,
        outcome: &mut ReadOutcome,
        sink: &mut S,
    ) {
        let (m1, m2) = match mate {
            Mate::One => (hit, other),
            Mate::Two => (other, hit),
        };
        if !st.pairs.insert((m1.contig, m1.offset, m1.strand, m2.contig, m2.offset, m2.strand)) {
            return;
        }
        st.paired = true;
        outcome.reported += 2;
        st.halted = !sink.report_pair(m1, m2);
    }

    /// 以 `anchor` 为锚点在窗口内扫描另一 mate。
    ///
    /// 扫描到的新命中与索引命中同等对待：与本 mate 已保存的命中逐个配对并保存。
    /// 扫描次数用完时恢复另一 mate 的索引搜索。
    fn scan_partners<S: HitSink + ?Sized>(
        &mut self,
        mate: Mate,
        anchor: &ResolvedMatch,
        st: &mut PairState,
        outcome: &mut ReadOutcome,
        sink: &mut S,
    ) {
        let other = mate.other();
        let oi = other.index();
        if st.scans >= self.cfg.mixed_attempt_lim {
            self.resume(other, st);
            return;
        }
        let Some(partner) = self.reads.get(other) else { return };
        let (strand, win) = self.geometry.partner_window(anchor, mate, partner.len() as u32);
        if !self.cfg.mate_strands()[oi][strand.index()] {
            return;
        }
        st.scans += 1;
        let found = self.ref_aligner.scan(self.index, partner, strand, Some(other), win);
        for hit in &found {
            if !self.concordant_as(mate, anchor, hit) {
                continue;
            }
            self.report_pair(mate, anchor, hit, st, outcome, sink);
            if st.halted {
                return;
            }
            if !self.resolver.claim(hit, other) {
                continue;
            }
            self.pair_with_stored(other, hit, st, outcome, sink);
            if st.halted {
                return;
            }
            if st.hits[oi].len() < self.cfg.sym_ceil as usize {
                st.hits[oi].push(hit.clone());
            }
        }
        if st.scans >= self.cfg.mixed_attempt_lim {
            self.resume(other, st);
        }
    }

    fn resume(&self, mate: Mate, st: &mut PairState) {
        if st.stopped[mate.index()] {
            st.stopped[mate.index()] = false;
            log::debug!(
                "window scan limit {} reached, resuming {:?}",
                self.cfg.mixed_attempt_lim,
                mate
            );
        }
    }
}
