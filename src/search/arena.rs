//! 每条读段复用的 bump 分配池。
//!
//! 池内元素按值存放，外部只持有槽位句柄（下标 + 代号）。`reset` 截断整个池并推进代号，
//! 之前发出的所有句柄随之失效；debug 构建下访问过期句柄会直接触发断言。

use std::marker::PhantomData;

use super::range::{Edit, EditNode};

/// 池内槽位句柄
#[derive(Debug)]
pub struct Slot<T> {
    idx: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx && self.generation == other.generation
    }
}

impl<T> Eq for Slot<T> {}

impl<T> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Slot<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.generation, self.idx).cmp(&(other.generation, other.idx))
    }
}

/// 定容分配池，只分配不单独释放
#[derive(Debug)]
pub struct Pool<T> {
    items: Vec<T>,
    capacity: usize,
    generation: u32,
    name: &'static str,
}

impl<T> Pool<T> {
    pub fn new(capacity: usize, name: &'static str) -> Self {
        Self { items: Vec::new(), capacity, generation: 0, name }
    }

    /// 池满时返回 None，调用方据此终止当前读段的搜索
    pub fn alloc(&mut self, item: T) -> Option<Slot<T>> {
        if self.items.len() >= self.capacity {
            log::debug!("{} pool exhausted at {} entries", self.name, self.capacity);
            return None;
        }
        let idx = self.items.len() as u32;
        self.items.push(item);
        Some(Slot { idx, generation: self.generation, _marker: PhantomData })
    }

    #[inline]
    pub fn get(&self, slot: Slot<T>) -> &T {
        debug_assert_eq!(slot.generation, self.generation, "stale {} slot", self.name);
        &self.items[slot.idx as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, slot: Slot<T>) -> &mut T {
        debug_assert_eq!(slot.generation, self.generation, "stale {} slot", self.name);
        &mut self.items[slot.idx as usize]
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// 回溯分支：一个选择点
#[derive(Debug, Clone)]
pub struct Branch {
    pub top: usize,
    pub bot: usize,
    /// 已消耗的读段位置数
    pub depth: u32,
    pub mms: u8,
    /// 种子高半区内的错配数（half-and-half 约束用）
    pub hi_mms: u8,
    /// 实际罚分之和
    pub penalty: u32,
    /// 最近一次替换，沿 prev 链可取回全部编辑
    pub edits: Option<EditId>,
    /// 若为回溯点：该深度上尚未尝试的替换
    pub alts: Option<StateId>,
}

/// 某深度上各替换碱基对应的区间及尚未尝试的集合
#[derive(Debug, Clone)]
pub struct RangeState {
    pub tops: [usize; 4],
    pub bots: [usize; 4],
    /// bit i 表示碱基编码 i+1 仍可尝试
    pub open: u8,
    pub pos: u32,
    pub read_code: u8,
    pub penalty: u32,
}

impl RangeState {
    /// 取出编码最小的未尝试替换
    pub fn take_next(&mut self) -> Option<(u8, usize, usize)> {
        if self.open == 0 {
            return None;
        }
        let i = self.open.trailing_zeros() as usize;
        self.open &= !(1u8 << i);
        Some((i as u8 + 1, self.tops[i], self.bots[i]))
    }
}

pub type BranchId = Slot<Branch>;
pub type EditId = Slot<EditNode>;
pub type StateId = Slot<RangeState>;

/// 一个 worker 的全部分配池，在读段之间整体重置
#[derive(Debug)]
pub struct Arenas {
    pub branches: Pool<Branch>,
    pub edits: Pool<EditNode>,
    pub states: Pool<RangeState>,
    exhausted: bool,
}

impl Arenas {
    pub fn new(capacity: usize) -> Self {
        Self {
            branches: Pool::new(capacity, "branch"),
            edits: Pool::new(capacity, "edit"),
            states: Pool::new(capacity, "range-state"),
            exhausted: false,
        }
    }

    pub fn reset(&mut self) {
        self.branches.reset();
        self.edits.reset();
        self.states.reset();
        self.exhausted = false;
    }

    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// 在编辑链头部追加一条替换
    pub fn push_edit(&mut self, prev: Option<EditId>, edit: Edit) -> Option<EditId> {
        self.edits.alloc(EditNode { edit, prev })
    }

    /// 取回编辑链，按读段坐标升序
    pub fn collect_edits(&self, head: Option<EditId>) -> Vec<Edit> {
        let mut out = Vec::new();
        let mut cur = head;
        while let Some(id) = cur {
            let node = self.edits.get(id);
            out.push(node.edit);
            cur = node.prev;
        }
        out.sort_by_key(|e| e.pos);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_respects_capacity_and_reset() {
        let mut pool: Pool<u32> = Pool::new(2, "test");
        let a = pool.alloc(7).expect("a");
        let _b = pool.alloc(8).expect("b");
        assert!(pool.alloc(9).is_none());
        assert_eq!(*pool.get(a), 7);
        let g = pool.generation();
        pool.reset();
        assert!(pool.is_empty());
        assert_eq!(pool.generation(), g + 1);
        let c = pool.alloc(10).expect("c");
        assert_ne!(a, c);
    }

    #[test]
    fn edit_chain_shares_prefix() {
        let mut arenas = Arenas::new(16);
        let e1 = arenas.push_edit(None, Edit { pos: 5, ref_code: 1, read_code: 2 });
        let left = arenas.push_edit(e1, Edit { pos: 2, ref_code: 3, read_code: 4 });
        let right = arenas.push_edit(e1, Edit { pos: 9, ref_code: 4, read_code: 1 });
        let l: Vec<u32> = arenas.collect_edits(left).iter().map(|e| e.pos).collect();
        let r: Vec<u32> = arenas.collect_edits(right).iter().map(|e| e.pos).collect();
        assert_eq!(l, vec![2, 5]);
        assert_eq!(r, vec![5, 9]);
        assert_eq!(arenas.edits.len(), 3);
    }

    #[test]
    fn range_state_yields_lowest_code_first() {
        let mut st = RangeState {
            tops: [0, 10, 20, 30],
            bots: [0, 12, 20, 31],
            open: 0b1010,
            pos: 0,
            read_code: 1,
            penalty: 30,
        };
        assert_eq!(st.take_next(), Some((2, 10, 12)));
        assert_eq!(st.take_next(), Some((4, 30, 31)));
        assert_eq!(st.take_next(), None);
    }
}
