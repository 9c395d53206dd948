//! 基本回溯搜索：沿一个方向、在一个索引上、针对一条链扩展读段。
//!
//! 搜索状态是一个按代价排序的优先队列，元素为 Branch 池中的句柄：
//! - 前沿分支：下一步按读段碱基精确扩展；
//! - 回溯点：某深度上尚未尝试的替换集合（RangeState），每次弹出只取一个替换，
//!   剩余替换以同样代价重新入队。
//!
//! 代价相同时优先更深的分支，从而尽快走完一条路径。得到的第一个完整匹配罚分较低，
//! 但并不保证全局最优。

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::arena::{Branch, BranchId, RangeState};
use super::budget::BacktrackBudget;
use super::driver::SearchEnv;
use super::pin::DepthLimits;
use super::range::{Cost, Edit, Range};
use super::read::{Mate, Strand};
use crate::index::IndexSide;
use crate::util::dna;

/// 子搜索的起始端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// 从读段 5' 端（种子外端）出发，走完整条读段
    SeedEnd,
    /// 从种子内侧边界出发朝种子外端走，只覆盖种子，产出种子候选
    SeedInnerEdge,
}

impl Anchor {
    /// 起始端决定使用哪一个方向的索引
    pub fn side(self, strand: Strand) -> IndexSide {
        match (strand, self) {
            (Strand::Forward, Anchor::SeedEnd) | (Strand::Reverse, Anchor::SeedInnerEdge) => {
                IndexSide::Mirror
            }
            (Strand::Reverse, Anchor::SeedEnd) | (Strand::Forward, Anchor::SeedInnerEdge) => {
                IndexSide::Forward
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SourceParams {
    pub strand: Strand,
    pub mate: Mate,
    pub anchor: Anchor,
    /// 是否报告零编辑的结果
    pub report_exacts: bool,
    /// 要求种子两个半区各至少一个错配
    pub half_and_half: bool,
    pub qual_cutoff: u32,
    pub qual_order: bool,
}

/// 由种子候选派生的验证搜索的起点：种子编辑已写入读段副本
#[derive(Debug, Clone)]
pub struct SeedStart {
    pub pattern: Vec<u8>,
    pub edits: Vec<Edit>,
    pub penalty: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    key: Cost,
    deeper: Reverse<u32>,
    seq: u64,
    branch: BranchId,
}

#[derive(Debug)]
pub struct ElementarySearch {
    params: SourceParams,
    side: IndexSide,
    budget: Option<BacktrackBudget>,
    seeded: Option<SeedStart>,
    limits: DepthLimits,
    start: usize,
    ascending: bool,
    target: u32,
    heap: BinaryHeap<Reverse<Pending>>,
    seq: u64,
    done: bool,
}

impl ElementarySearch {
    pub fn new(params: SourceParams, budget: Option<BacktrackBudget>) -> Self {
        Self {
            side: params.anchor.side(params.strand),
            params,
            budget,
            seeded: None,
            limits: DepthLimits { depths: [0; 4], hi_edge: 0, seed_edge: 0 },
            start: 0,
            ascending: true,
            target: 0,
            heap: BinaryHeap::new(),
            seq: 0,
            done: true,
        }
    }

    /// 验证搜索：种子区按 `seed` 改写后的碱基精确匹配
    pub fn with_seed(
        params: SourceParams,
        budget: Option<BacktrackBudget>,
        seed: SeedStart,
    ) -> Self {
        let mut s = Self::new(params, budget);
        s.seeded = Some(seed);
        s
    }

    pub fn params(&self) -> &SourceParams {
        &self.params
    }

    pub fn side(&self) -> IndexSide {
        self.side
    }

    /// 为当前读段复位；`limits.seed_edge` 即有效种子长度
    pub fn start(&mut self, env: &mut SearchEnv<'_>, limits: DepthLimits) {
        self.heap.clear();
        self.seq = 0;
        self.done = true;
        self.limits = limits;

        let Some(read) = env.reads.get(self.params.mate) else { return };
        let l = read.len();
        let s = limits.seed_edge as usize;
        if l == 0 || s == 0 {
            return;
        }
        match (self.params.anchor, self.params.strand) {
            (Anchor::SeedEnd, Strand::Forward) => {
                self.start = 0;
                self.ascending = true;
                self.target = l as u32;
            }
            (Anchor::SeedEnd, Strand::Reverse) => {
                self.start = l - 1;
                self.ascending = false;
                self.target = l as u32;
            }
            (Anchor::SeedInnerEdge, Strand::Forward) => {
                self.start = s - 1;
                self.ascending = false;
                self.target = s as u32;
            }
            (Anchor::SeedInnerEdge, Strand::Reverse) => {
                self.start = l - s;
                self.ascending = true;
                self.target = s as u32;
            }
        }

        let (top, bot) = env.index.full_range(self.side);
        let (mut edits, mut mms, mut penalty) = (None, 0u8, 0u32);
        if let Some(seed) = &self.seeded {
            for &e in &seed.edits {
                edits = match env.arenas.push_edit(edits, e) {
                    Some(id) => Some(id),
                    None => {
                        env.arenas.mark_exhausted();
                        return;
                    }
                };
            }
            mms = seed.edits.len() as u8;
            penalty = seed.penalty;
        }
        let root = Branch { top, bot, depth: 0, mms, hi_mms: 0, penalty, edits, alts: None };
        let key = Cost::new(mms, penalty, self.params.qual_order);
        match env.arenas.branches.alloc(root) {
            Some(id) => {
                self.done = false;
                self.push(id, key, 0);
            }
            None => env.arenas.mark_exhausted(),
        }
    }

    /// 之后可能产出的任何区间的代价下界；已结束时为 None
    pub fn min_cost(&self) -> Option<Cost> {
        if self.done || self.budget.as_ref().is_some_and(BacktrackBudget::exhausted) {
            return None;
        }
        self.heap.peek().map(|p| p.0.key)
    }

    pub fn is_done(&self) -> bool {
        self.min_cost().is_none()
    }

    /// 处理一个队列元素，恰好走完一条路径时返回对应区间
    pub fn advance(&mut self, env: &mut SearchEnv<'_>) -> Option<Range> {
        if self.is_done() {
            self.finish();
            return None;
        }
        let Reverse(item) = self.heap.pop()?;
        let branch = env.arenas.branches.get(item.branch).clone();
        match branch.alts {
            Some(_) => {
                self.backtrack(env, item, &branch);
                None
            }
            None => self.extend(env, item.branch, &branch),
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.heap.clear();
    }

    fn exhausted(&mut self, env: &mut SearchEnv<'_>) {
        env.arenas.mark_exhausted();
        self.finish();
    }

    #[inline]
    fn push(&mut self, branch: BranchId, key: Cost, depth: u32) {
        self.seq += 1;
        self.heap.push(Reverse(Pending { key, deeper: Reverse(depth), seq: self.seq, branch }));
    }

    #[inline]
    fn position(&self, depth: u32) -> usize {
        if self.ascending {
            self.start + depth as usize
        } else {
            self.start - depth as usize
        }
    }

    /// 从回溯点取出下一个替换，生成子分支
    fn backtrack(&mut self, env: &mut SearchEnv<'_>, item: Pending, branch: &Branch) {
        let Some(sid) = branch.alts else { return };
        let (next, more, pos, read_code, pen) = {
            let st = env.arenas.states.get_mut(sid);
            let next = st.take_next();
            (next, st.open != 0, st.pos, st.read_code, st.penalty)
        };
        let Some((code, top, bot)) = next else { return };

        if let Some(budget) = &self.budget {
            if !budget.try_consume() {
                log::debug!(
                    "backtrack budget exhausted ({:?} {:?}, depth {})",
                    self.params.strand,
                    self.side,
                    branch.depth
                );
                self.finish();
                return;
            }
        }
        if more {
            self.push(item.branch, item.key, branch.depth);
        }

        let edit = Edit { pos: pos as u32, ref_code: code, read_code };
        let Some(edits) = env.arenas.push_edit(branch.edits, edit) else {
            self.exhausted(env);
            return;
        };
        let child = Branch {
            top,
            bot,
            depth: branch.depth + 1,
            mms: branch.mms + 1,
            hi_mms: branch.hi_mms + u8::from(branch.depth < self.limits.hi_edge),
            penalty: branch.penalty + pen,
            edits: Some(edits),
            alts: None,
        };
        let key = Cost::new(child.mms, child.penalty, self.params.qual_order);
        let depth = child.depth;
        match env.arenas.branches.alloc(child) {
            Some(id) => self.push(id, key, depth),
            None => self.exhausted(env),
        }
    }

    /// 前沿分支：检查约束、登记替换回溯点、精确扩展一步
    fn extend(&mut self, env: &mut SearchEnv<'_>, id: BranchId, branch: &Branch) -> Option<Range> {
        let lim = self.limits;
        if self.params.half_and_half {
            if branch.depth == lim.hi_edge && branch.mms == 0 {
                return None;
            }
            if branch.depth == lim.seed_edge && branch.mms == branch.hi_mms {
                return None;
            }
        }
        if branch.depth == self.target {
            if branch.mms == 0 && !self.params.report_exacts {
                return None;
            }
            let range = self.make_range(env, branch);
            log::trace!(
                "range [{}, {}) {:?} {:?} mms={} pen={}",
                range.top,
                range.bot,
                range.strand,
                range.side,
                range.cost.mms,
                range.penalty
            );
            return Some(range);
        }

        let p = self.position(branch.depth);
        let read = env.reads.get(self.params.mate)?;
        let pen = read.penalties(self.params.strand)[p];
        let rc = match &self.seeded {
            Some(seed) => seed.pattern[p],
            None => read.pattern(self.params.strand)[p],
        };

        let mut tops = [0usize; 4];
        let mut bots = [0usize; 4];
        for (i, c) in dna::BASES.enumerate() {
            let (t, b) = env.index.backward_step(self.side, c, branch.top, branch.bot);
            tops[i] = t;
            bots[i] = b;
        }

        // 替换：登记回溯点，具体替换碱基等弹出时再逐个展开
        let new_penalty = branch.penalty + pen;
        if branch.mms < lim.max_mms_at(branch.depth) && new_penalty <= self.params.qual_cutoff {
            let mut open = 0u8;
            for i in 0..4 {
                if i as u8 + 1 != rc && bots[i] > tops[i] {
                    open |= 1 << i;
                }
            }
            if open != 0 {
                let state =
                    RangeState { tops, bots, open, pos: p as u32, read_code: rc, penalty: pen };
                let Some(sid) = env.arenas.states.alloc(state) else {
                    self.exhausted(env);
                    return None;
                };
                let point = Branch { alts: Some(sid), ..branch.clone() };
                let Some(pid) = env.arenas.branches.alloc(point) else {
                    self.exhausted(env);
                    return None;
                };
                let key = Cost::new(branch.mms + 1, new_penalty, self.params.qual_order);
                self.push(pid, key, branch.depth);
            }
        }

        // 精确扩展：原地推进该分支
        if dna::is_base(rc) {
            let i = (rc - 1) as usize;
            if bots[i] > tops[i] {
                let b = env.arenas.branches.get_mut(id);
                b.top = tops[i];
                b.bot = bots[i];
                b.depth += 1;
                let key = Cost::new(b.mms, b.penalty, self.params.qual_order);
                let depth = b.depth;
                self.push(id, key, depth);
            }
        }
        None
    }

    fn make_range(&self, env: &SearchEnv<'_>, branch: &Branch) -> Range {
        Range {
            top: branch.top,
            bot: branch.bot,
            side: self.side,
            strand: self.params.strand,
            mate: self.params.mate,
            len: self.target as usize,
            edits: env.arenas.collect_edits(branch.edits),
            cost: Cost::new(branch.mms, branch.penalty, self.params.qual_order),
            penalty: branch.penalty,
        }
    }
}
