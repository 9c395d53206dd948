//! 多个 driver 的代价感知合并。
//!
//! 每一步推进当前代价下界最小的子 driver；已产出但尚未交出的区间先暂存，
//! 直到没有任何子 driver 还可能产出更便宜的区间时才交出，因此输出按代价非降序。

use super::driver::{SearchDriver, SearchEnv};
use super::range::{Cost, Range};
use super::read::Strand;

pub struct CostAwareSearchDriver {
    drivers: Vec<Box<dyn SearchDriver>>,
    pending: Vec<Range>,
    strand_fix: bool,
    preferred: Option<Strand>,
}

impl CostAwareSearchDriver {
    pub fn new(strand_fix: bool) -> Self {
        Self { drivers: Vec::new(), pending: Vec::new(), strand_fix, preferred: None }
    }

    pub fn with_drivers(strand_fix: bool, drivers: Vec<Box<dyn SearchDriver>>) -> Self {
        Self { drivers, ..Self::new(strand_fix) }
    }

    /// 追加一个 driver 并立即为当前读段启动它
    pub fn add_driver(&mut self, mut driver: Box<dyn SearchDriver>, env: &mut SearchEnv<'_>) {
        driver.start(env);
        self.drivers.push(driver);
    }

    /// 只登记，不启动（由随后的 `start` 统一启动）
    pub fn push_driver(&mut self, driver: Box<dyn SearchDriver>) {
        self.drivers.push(driver);
    }

    pub fn clear(&mut self) {
        self.drivers.clear();
        self.pending.clear();
        self.preferred = None;
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    fn strand_rank(&self, strand: Option<Strand>) -> u8 {
        match (self.strand_fix, self.preferred, strand) {
            (true, Some(p), Some(s)) if p == s => 0,
            (true, Some(_), _) => 1,
            _ => 0,
        }
    }

    /// 代价下界最小的子 driver；同代价按链偏好，再按加入顺序
    fn pick(&self) -> Option<(usize, Cost)> {
        self.drivers
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.min_cost().map(|c| (c, self.strand_rank(d.strand()), i)))
            .min()
            .map(|(c, _, i)| (i, c))
    }

    /// 暂存区中代价最小的区间（同代价取最早产出）
    fn best_pending(&self) -> Option<(usize, Cost)> {
        self.pending
            .iter()
            .enumerate()
            .min_by_key(|(i, r)| (r.cost, self.strand_rank(Some(r.strand)), *i))
            .map(|(i, r)| (i, r.cost))
    }
}

impl SearchDriver for CostAwareSearchDriver {
    fn start(&mut self, env: &mut SearchEnv<'_>) {
        self.pending.clear();
        self.preferred = None;
        for d in &mut self.drivers {
            d.start(env);
        }
    }

    fn min_cost(&self) -> Option<Cost> {
        let drivers = self.pick().map(|(_, c)| c);
        let pending = self.best_pending().map(|(_, c)| c);
        match (drivers, pending) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn advance(&mut self, env: &mut SearchEnv<'_>) -> Option<Range> {
        let best = self.pick();
        if let Some((i, cost)) = self.best_pending() {
            if best.map_or(true, |(_, c)| cost <= c) {
                return Some(self.pending.swap_remove(i));
            }
        }
        let (i, _) = best?;
        if let Some(r) = self.drivers[i].advance(env) {
            self.pending.push(r);
        }
        None
    }

    fn strand(&self) -> Option<Strand> {
        let mut strands = self.drivers.iter().map(|d| d.strand());
        let first = strands.next()??;
        strands.all(|s| s == Some(first)).then_some(first)
    }

    fn note_reported(&mut self, strand: Strand) {
        if self.preferred.is_none() {
            self.preferred = Some(strand);
        }
        for d in &mut self.drivers {
            d.note_reported(strand);
        }
    }
}
