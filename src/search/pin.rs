//! 钉住边界：决定一次子搜索在读段的哪些深度上还能引入替换。
//!
//! 深度从子搜索的起始端量起。四条边界由内到外排列，第 k 条边界之前累计错配不得超过 k，
//! 越过最外侧边界后不再限制个数（只受质量罚分上限约束）。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinEdge {
    /// 深度 0：不钉住任何位置
    Beginning,
    /// 种子高/低半区分界
    HiHalfEdge,
    /// 种子末端
    SeedEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinPolicy {
    pub edges: [PinEdge; 4],
}

impl PinPolicy {
    pub const fn new(e0: PinEdge, e1: PinEdge, e2: PinEdge, e3: PinEdge) -> Self {
        Self { edges: [e0, e1, e2, e3] }
    }

    /// 整个种子不可再修改
    pub const fn seed_locked() -> Self {
        Self::new(PinEdge::SeedEdge, PinEdge::SeedEdge, PinEdge::SeedEdge, PinEdge::SeedEdge)
    }

    /// 按有效种子长度 `s` 解析为具体深度。
    /// `s` 为奇数时，`nudge_left` 决定分界点取 floor(s/2) 还是 ceil(s/2)；
    /// 从种子两端出发的一对子搜索各取一种，使两边看到的是同一个分界。
    pub fn resolve(&self, seed_len: usize, nudge_left: bool) -> DepthLimits {
        let s = seed_len as u32;
        let hi = hi_half_depth(s, nudge_left);
        let at = |e: PinEdge| match e {
            PinEdge::Beginning => 0,
            PinEdge::HiHalfEdge => hi,
            PinEdge::SeedEdge => s,
        };
        DepthLimits {
            depths: [at(self.edges[0]), at(self.edges[1]), at(self.edges[2]), at(self.edges[3])],
            hi_edge: hi,
            seed_edge: s,
        }
    }
}

#[inline]
pub fn hi_half_depth(seed_len: u32, nudge_left: bool) -> u32 {
    if nudge_left { seed_len / 2 } else { (seed_len + 1) / 2 }
}

/// 解析后的深度限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthLimits {
    pub depths: [u32; 4],
    pub hi_edge: u32,
    pub seed_edge: u32,
}

impl DepthLimits {
    /// 在 `depth` 处引入替换后，累计错配允许的最大值
    #[inline]
    pub fn max_mms_at(&self, depth: u32) -> u8 {
        for (k, &d) in self.depths.iter().enumerate() {
            if depth < d {
                return k as u8;
            }
        }
        u8::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PinEdge::*;

    #[test]
    fn one_mismatch_exact_first_limits() {
        let lim = PinPolicy::new(HiHalfEdge, SeedEdge, SeedEdge, SeedEdge).resolve(10, true);
        assert_eq!(lim.depths, [5, 10, 10, 10]);
        assert_eq!(lim.max_mms_at(0), 0);
        assert_eq!(lim.max_mms_at(4), 0);
        assert_eq!(lim.max_mms_at(5), 1);
        assert_eq!(lim.max_mms_at(9), 1);
        assert_eq!(lim.max_mms_at(10), u8::MAX);
    }

    #[test]
    fn odd_seed_split_agrees_from_both_ends() {
        // 从 5' 端看高半区是 [0, 2)，从种子内侧边界看低半区要占 3 个深度
        assert_eq!(hi_half_depth(5, true), 2);
        assert_eq!(hi_half_depth(5, false), 3);
        assert_eq!(hi_half_depth(5, true) + hi_half_depth(5, false), 5);
    }

    #[test]
    fn half_and_half_three_mismatches() {
        let lim = PinPolicy::new(Beginning, Beginning, HiHalfEdge, SeedEdge).resolve(8, true);
        assert_eq!(lim.max_mms_at(0), 2);
        assert_eq!(lim.max_mms_at(4), 3);
        assert_eq!(lim.max_mms_at(8), u8::MAX);
    }

    #[test]
    fn locked_seed_forbids_everything_inside() {
        let lim = PinPolicy::seed_locked().resolve(6, true);
        assert!((0..6).all(|d| lim.max_mms_at(d) == 0));
    }
}
