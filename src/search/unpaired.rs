//! 单端比对：每条启用的链一个合并 driver，两条链再合并为一个顶层 driver。

use super::arena::Arenas;
use super::budget::BacktrackBudget;
use super::config::SeedConfig;
use super::cost_aware::CostAwareSearchDriver;
use super::driver::{SearchDriver, SearchEnv};
use super::error::{ConfigError, SearchError};
use super::resolve::{MatchResolver, RangeCaches};
use super::sink::HitSink;
use super::strategy::Strategy;
use super::read::{Mate, PreparedRead, Read, ReadSet, Strand};
use super::AlignerFactory;
use crate::index::SearchIndex;

/// 配对结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairOutcome {
    /// 单端读段
    #[default]
    NotPaired,
    /// 报告了至少一对协调的 mate
    Concordant,
    /// 配对失败，退回为各自报告
    Fallback,
    /// 不做协调，两个 mate 独立报告
    Independent,
    /// 配对失败且未报告
    NoPair,
}

/// 一条读段（或一对读段）的搜索统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    /// 从 driver 取出的区间数
    pub ranges: usize,
    /// 交给 sink 的命中数（一对算两个）
    pub reported: usize,
    pub budget_exhausted: bool,
    pub arena_exhausted: bool,
    /// 窗口扫描次数
    pub scans: usize,
    pub pair: PairOutcome,
}

impl ReadOutcome {
    /// 搜索是否因资源上限提前结束
    pub fn truncated(&self) -> bool {
        self.budget_exhausted || self.arena_exhausted
    }
}

pub struct UnpairedAlignerFactory<'a, I: SearchIndex> {
    index: &'a I,
    cfg: SeedConfig,
    strategy: Strategy,
    caches: Option<RangeCaches>,
}

impl<'a, I: SearchIndex> UnpairedAlignerFactory<'a, I> {
    pub fn new(index: &'a I, cfg: SeedConfig) -> Result<Self, ConfigError> {
        cfg.validate_unpaired()?;
        if !index.is_ready() {
            return Err(ConfigError::IndexNotReady);
        }
        let strategy = Strategy::for_mismatches(cfg.seed_mms)?;
        log::info!(
            "unpaired search: {} seed mismatch(es), {} driver(s) per strand, fw={} rc={}",
            cfg.seed_mms,
            strategy.cells.len(),
            cfg.do_fw,
            cfg.do_rc
        );
        Ok(Self { index, cfg, strategy, caches: None })
    }

    /// 所有 aligner 共享同一对区间缓存
    pub fn with_shared_caches(mut self, caches: RangeCaches) -> Self {
        self.caches = Some(caches);
        self
    }

    pub fn config(&self) -> &SeedConfig {
        &self.cfg
    }
}

impl<'a, I: SearchIndex> AlignerFactory for UnpairedAlignerFactory<'a, I> {
    type Aligner = UnpairedAligner<'a, I>;

    fn create(&self) -> Self::Aligner {
        let budget = BacktrackBudget::new(self.cfg.max_bts);
        let mut root = CostAwareSearchDriver::new(self.cfg.strand_fix);
        for strand in Strand::BOTH {
            let on = match strand {
                Strand::Forward => self.cfg.do_fw,
                Strand::Reverse => self.cfg.do_rc,
            };
            if on {
                let d = self.strategy.assemble(&self.cfg, Mate::One, strand, &budget);
                root.push_driver(Box::new(d));
            }
        }
        let caches = self.caches.clone().unwrap_or_else(|| RangeCaches::new(self.cfg.cache_limit));
        UnpairedAligner {
            index: self.index,
            cfg: self.cfg.clone(),
            uses_budget: self.strategy.uses_budget,
            root,
            resolver: MatchResolver::new(caches, false),
            arenas: Arenas::new(self.cfg.pool_capacity),
            budget,
            reads: ReadSet::default(),
        }
    }
}

pub struct UnpairedAligner<'a, I: SearchIndex> {
    index: &'a I,
    cfg: SeedConfig,
    uses_budget: bool,
    root: CostAwareSearchDriver,
    resolver: MatchResolver,
    arenas: Arenas,
    budget: BacktrackBudget,
    reads: ReadSet,
}

impl<I: SearchIndex> UnpairedAligner<'_, I> {
    /// 搜索一条读段，命中按代价非降序交给 sink，直到搜索结束或 sink 叫停
    pub fn align<S: HitSink + ?Sized>(
        &mut self,
        read: &Read,
        sink: &mut S,
    ) -> Result<ReadOutcome, SearchError> {
        self.arenas.reset();
        self.budget.reset();
        self.resolver.reset();
        self.reads.clear();
        self.reads.set(Mate::One, PreparedRead::new(read, self.cfg.maq_penalty));
        sink.begin_read();

        let mut outcome = ReadOutcome::default();
        let mut env = SearchEnv {
            index: self.index,
            reads: &self.reads,
            arenas: &mut self.arenas,
            seed_len: self.cfg.seed_len,
        };
        self.root.start(&mut env);
        'search: while let Some(range) = self.root.next_range(&mut env) {
            outcome.ranges += 1;
            for row in range.top..range.bot {
                let Some(hit) = self.resolver.resolve_row(self.index, &range, row)? else {
                    continue;
                };
                outcome.reported += 1;
                self.root.note_reported(hit.strand);
                if !sink.report(&hit) {
                    break 'search;
                }
            }
        }

        outcome.budget_exhausted = self.uses_budget && self.budget.exhausted();
        outcome.arena_exhausted = self.arenas.exhausted();
        if outcome.truncated() {
            log::debug!("read {} search truncated: {:?}", read.name, outcome);
        }
        Ok(outcome)
    }

    pub fn resolver(&self) -> &MatchResolver {
        &self.resolver
    }
}
