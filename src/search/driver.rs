//! 搜索 driver：对外只暴露“下一个代价下界”和“推进一步”，组合方式由上层决定。

use super::arena::Arenas;
use super::budget::BacktrackBudget;
use super::pin::PinPolicy;
use super::range::{Cost, Range};
use super::read::{ReadSet, Strand};
use super::source::{Anchor, ElementarySearch, SeedStart, SourceParams};
use crate::index::SearchIndex;

/// 一条读段搜索期间所有 driver 共用的上下文
pub struct SearchEnv<'a> {
    pub index: &'a dyn SearchIndex,
    pub reads: &'a ReadSet,
    pub arenas: &'a mut Arenas,
    pub seed_len: usize,
}

impl SearchEnv<'_> {
    /// 当前 mate 的有效种子长度
    pub fn effective_seed_len(&self, read_len: usize) -> usize {
        self.seed_len.min(read_len)
    }
}

/// 一个可增量推进的区间产生者。
///
/// `min_cost` 是之后产出的任何区间代价的下界，`None` 表示已结束；
/// `advance` 每次只做一个单位的工作，可能不产出区间。
pub trait SearchDriver {
    /// 为当前读段复位
    fn start(&mut self, env: &mut SearchEnv<'_>);

    fn min_cost(&self) -> Option<Cost>;

    fn advance(&mut self, env: &mut SearchEnv<'_>) -> Option<Range>;

    /// 该 driver 只搜索一条链时返回该链
    fn strand(&self) -> Option<Strand>;

    /// 上层报告了一个命中（用于链偏好）
    fn note_reported(&mut self, _strand: Strand) {}

    fn is_done(&self) -> bool {
        self.min_cost().is_none()
    }

    /// 一直推进到产出区间或结束
    fn next_range(&mut self, env: &mut SearchEnv<'_>) -> Option<Range> {
        while !self.is_done() {
            if let Some(r) = self.advance(env) {
                return Some(r);
            }
        }
        None
    }
}

/// 把一个基本搜索包成 driver：钉住策略在每条读段开始时按种子长度解析
#[derive(Debug)]
pub struct RangeSourceDriver {
    source: ElementarySearch,
    pins: PinPolicy,
    nudge_left: bool,
}

impl RangeSourceDriver {
    pub fn new(source: ElementarySearch, pins: PinPolicy, nudge_left: bool) -> Self {
        Self { source, pins, nudge_left }
    }

    pub fn source(&self) -> &ElementarySearch {
        &self.source
    }
}

impl SearchDriver for RangeSourceDriver {
    fn start(&mut self, env: &mut SearchEnv<'_>) {
        let read_len = env.reads.get(self.source.params().mate).map_or(0, |r| r.len());
        let limits = self.pins.resolve(env.effective_seed_len(read_len), self.nudge_left);
        self.source.start(env, limits);
    }

    fn min_cost(&self) -> Option<Cost> {
        self.source.min_cost()
    }

    fn advance(&mut self, env: &mut SearchEnv<'_>) -> Option<Range> {
        self.source.advance(env)
    }

    fn strand(&self) -> Option<Strand> {
        Some(self.source.params().strand)
    }
}

/// 由种子候选构造验证 driver：种子整段锁定，从读段 5' 端走完全长
#[derive(Debug)]
pub struct VerifierFactory {
    params: SourceParams,
    budget: Option<BacktrackBudget>,
}

impl VerifierFactory {
    pub fn new(params: SourceParams, budget: Option<BacktrackBudget>) -> Self {
        let params = SourceParams {
            anchor: Anchor::SeedEnd,
            report_exacts: true,
            half_and_half: false,
            ..params
        };
        Self { params, budget }
    }

    pub fn create(&self, seed: &Range, env: &SearchEnv<'_>) -> Option<RangeSourceDriver> {
        let read = env.reads.get(self.params.mate)?;
        let mut pattern = read.pattern(self.params.strand).to_vec();
        for e in &seed.edits {
            pattern[e.pos as usize] = e.ref_code;
        }
        let start = SeedStart { pattern, edits: seed.edits.clone(), penalty: seed.penalty };
        let budget = self.budget.as_ref().map(BacktrackBudget::share);
        let source = ElementarySearch::with_seed(self.params, budget, start);
        Some(RangeSourceDriver::new(source, PinPolicy::seed_locked(), true))
    }
}
