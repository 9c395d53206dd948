//! 按种子错配数查表组装 driver。
//!
//! 表中每一行是一种子搜索及其钉住边界（由内到外）。对 k 个错配，几种子搜索各自负责互不相交的
//! 错配分布：高半区无错配 / 低半区无错配 / 两半区都有错配。

use super::budget::BacktrackBudget;
use super::config::SeedConfig;
use super::cost_aware::CostAwareSearchDriver;
use super::driver::{RangeSourceDriver, SearchDriver, VerifierFactory};
use super::error::ConfigError;
use super::pin::{PinEdge, PinPolicy};
use super::read::{Mate, Strand};
use super::seeded::SeededSearchDriver;
use super::source::{Anchor, ElementarySearch, SourceParams};

use PinEdge::{Beginning as Begin, HiHalfEdge as Hi, SeedEdge as Seed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// 从 5' 端出发，高半区精确
    ExactFirst,
    /// 从种子内侧边界生成带错配的种子，再从 5' 端验证
    Seeded,
    /// 种子两个半区各至少一个错配
    HalfAndHalf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyCell {
    pub kind: DriverKind,
    pub pins: PinPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub seed_mms: u8,
    pub cells: Vec<StrategyCell>,
    /// 是否受每读段回溯上限约束
    pub uses_budget: bool,
}

const fn cell(
    kind: DriverKind,
    e0: PinEdge,
    e1: PinEdge,
    e2: PinEdge,
    e3: PinEdge,
) -> StrategyCell {
    StrategyCell { kind, pins: PinPolicy::new(e0, e1, e2, e3) }
}

impl Strategy {
    pub fn for_mismatches(seed_mms: u8) -> Result<Self, ConfigError> {
        use DriverKind::*;
        let cells = match seed_mms {
            0 => vec![cell(ExactFirst, Seed, Seed, Seed, Seed)],
            1 => vec![cell(ExactFirst, Hi, Seed, Seed, Seed), cell(Seeded, Hi, Seed, Seed, Seed)],
            2 | 3 => {
                let two = seed_mms == 2;
                let third = if two { Seed } else { Hi };
                vec![
                    cell(ExactFirst, Hi, Hi, third, Seed),
                    cell(Seeded, Hi, Hi, third, Seed),
                    cell(HalfAndHalf, Begin, if two { Hi } else { Begin }, third, Seed),
                ]
            }
            n => return Err(ConfigError::UnsupportedSeedMismatches(n)),
        };
        Ok(Self { seed_mms, cells, uses_budget: seed_mms >= 2 })
    }

    /// 为一个 (mate, 链) 组装全部子搜索，合并为一个按代价排序的 driver
    pub fn assemble(
        &self,
        cfg: &SeedConfig,
        mate: Mate,
        strand: Strand,
        budget: &BacktrackBudget,
    ) -> CostAwareSearchDriver {
        let share = || self.uses_budget.then(|| budget.share());
        let params = |anchor, report_exacts, half_and_half| SourceParams {
            strand,
            mate,
            anchor,
            report_exacts,
            half_and_half,
            qual_cutoff: cfg.qual_cutoff,
            qual_order: cfg.qual_order,
        };

        let mut merged = CostAwareSearchDriver::new(cfg.strand_fix);
        for c in &self.cells {
            let driver: Box<dyn SearchDriver> = match c.kind {
                DriverKind::ExactFirst => {
                    let src = ElementarySearch::new(params(Anchor::SeedEnd, true, false), share());
                    Box::new(RangeSourceDriver::new(src, c.pins, true))
                }
                DriverKind::HalfAndHalf => {
                    let src = ElementarySearch::new(params(Anchor::SeedEnd, false, true), share());
                    Box::new(RangeSourceDriver::new(src, c.pins, true))
                }
                DriverKind::Seeded => {
                    let generator =
                        ElementarySearch::new(params(Anchor::SeedInnerEdge, false, false), share());
                    let seeds = RangeSourceDriver::new(generator, c.pins, false);
                    let verify =
                        VerifierFactory::new(params(Anchor::SeedEnd, true, false), share());
                    Box::new(SeededSearchDriver::new(seeds, verify))
                }
            };
            merged.push_driver(driver);
        }
        merged
    }
}
