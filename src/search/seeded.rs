//! 两阶段搜索：先从种子内侧边界生成带错配的种子候选，再为每个候选从 5' 端验证全长。

use super::cost_aware::CostAwareSearchDriver;
use super::driver::{RangeSourceDriver, SearchDriver, SearchEnv, VerifierFactory};
use super::range::{Cost, Range};
use super::read::Strand;

pub struct SeededSearchDriver {
    generator: RangeSourceDriver,
    factory: VerifierFactory,
    verifiers: CostAwareSearchDriver,
    strand: Strand,
    seeds: usize,
}

impl SeededSearchDriver {
    pub fn new(generator: RangeSourceDriver, factory: VerifierFactory) -> Self {
        let strand = generator.source().params().strand;
        Self { generator, factory, verifiers: CostAwareSearchDriver::new(false), strand, seeds: 0 }
    }

    /// 当前读段已生成的种子候选数
    pub fn seeds(&self) -> usize {
        self.seeds
    }
}

impl SearchDriver for SeededSearchDriver {
    fn start(&mut self, env: &mut SearchEnv<'_>) {
        self.verifiers.clear();
        self.seeds = 0;
        self.generator.start(env);
    }

    fn min_cost(&self) -> Option<Cost> {
        match (self.generator.min_cost(), self.verifiers.min_cost()) {
            (Some(g), Some(v)) => Some(g.min(v)),
            (g, v) => g.or(v),
        }
    }

    /// 生成器的下界不高于验证器时推进生成器，否则推进验证器
    fn advance(&mut self, env: &mut SearchEnv<'_>) -> Option<Range> {
        let verify = self.verifiers.min_cost();
        match self.generator.min_cost() {
            Some(g) if verify.map_or(true, |v| g <= v) => {
                let seed = self.generator.advance(env)?;
                let verifier = self.factory.create(&seed, env)?;
                self.seeds += 1;
                log::trace!(
                    "seed #{} on {:?}: {} edit(s)",
                    self.seeds,
                    self.strand,
                    seed.edits.len()
                );
                self.verifiers.add_driver(Box::new(verifier), env);
                None
            }
            _ if verify.is_some() => self.verifiers.advance(env),
            _ => None,
        }
    }

    fn strand(&self) -> Option<Strand> {
        Some(self.strand)
    }
}
